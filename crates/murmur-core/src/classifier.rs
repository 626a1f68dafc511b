// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tweet classification.
//!
//! Maps an inbound message to its [`Category`] and parent/root linkage using
//! only the reference annotations the platform attached to it. Every function
//! here is pure.

use crate::error::MurmurError;
use crate::types::{Category, ConversationRef, InboundMessage, ReferenceKind};

/// Determines the category of an inbound message.
///
/// Precedence: a reply inside a known conversation, then quote, then retweet,
/// otherwise a plain mention. A reply without a conversation id is treated as
/// a mention.
pub fn classify(message: &InboundMessage) -> Category {
    let has = |kind: ReferenceKind| message.referenced_messages.iter().any(|r| r.kind == kind);

    if has(ReferenceKind::RepliedTo) && message.has_conversation_id() {
        Category::Conversation
    } else if has(ReferenceKind::Quoted) {
        Category::Quote
    } else if has(ReferenceKind::Retweeted) {
        Category::Retweet
    } else {
        Category::Mention
    }
}

/// Derives the parent/root linkage for a message.
pub fn conversation_ref(message: &InboundMessage) -> ConversationRef {
    let conversation_id = message.resolved_conversation_id();
    match message.replied_to() {
        None => ConversationRef {
            is_root: true,
            parent_id: None,
            root_id: message.id.clone(),
            conversation_id,
        },
        Some(parent) => ConversationRef {
            is_root: false,
            parent_id: Some(parent.to_string()),
            root_id: conversation_id.clone(),
            conversation_id,
        },
    }
}

/// Rejects messages the store cannot key or attribute.
pub fn validate(message: &InboundMessage) -> Result<(), MurmurError> {
    if message.id.trim().is_empty() {
        return Err(MurmurError::Validation {
            message: "message id is empty".into(),
        });
    }
    if message.author_id.trim().is_empty() {
        return Err(MurmurError::Validation {
            message: format!("message {} has no author id", message.id),
        });
    }
    if let Some(r) = message.referenced_messages.iter().find(|r| r.id.trim().is_empty()) {
        return Err(MurmurError::Validation {
            message: format!(
                "message {} has a {} reference without an id",
                message.id, r.kind
            ),
        });
    }
    Ok(())
}
