// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for inbound messages and mention pages.

use chrono::{DateTime, Duration, TimeZone, Utc};
use murmur_core::{InboundMessage, MentionsPage, ReferenceKind, ReferencedMessage, UserProfile};

/// Fixed base instant so stored timestamps are deterministic.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// `base_time()` plus `seconds`.
pub fn at(seconds: i64) -> DateTime<Utc> {
    base_time() + Duration::seconds(seconds)
}

/// A thread-root mention.
pub fn mention(id: &str, author_id: &str, text: &str, created_at: DateTime<Utc>) -> InboundMessage {
    InboundMessage {
        id: id.to_string(),
        text: text.to_string(),
        author_id: author_id.to_string(),
        conversation_id: Some(id.to_string()),
        created_at,
        language: Some("en".to_string()),
        in_reply_to_user_id: None,
        referenced_messages: Vec::new(),
    }
}

/// A reply to `parent_id` inside `conversation_id`.
pub fn reply(
    id: &str,
    author_id: &str,
    text: &str,
    conversation_id: &str,
    parent_id: &str,
    created_at: DateTime<Utc>,
) -> InboundMessage {
    InboundMessage {
        conversation_id: Some(conversation_id.to_string()),
        referenced_messages: vec![ReferencedMessage {
            kind: ReferenceKind::RepliedTo,
            id: parent_id.to_string(),
        }],
        ..mention(id, author_id, text, created_at)
    }
}

/// A profile whose name and handle derive from `id`.
pub fn user(id: &str) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        name: format!("User {id}"),
        username: format!("user_{id}"),
    }
}

/// A single page carrying `messages`, profiles for their authors, and no
/// continuation.
pub fn page(messages: Vec<InboundMessage>) -> MentionsPage {
    let mut users: Vec<UserProfile> = Vec::new();
    for m in &messages {
        if !users.iter().any(|u| u.id == m.author_id) {
            users.push(user(&m.author_id));
        }
    }
    MentionsPage {
        messages,
        users,
        newest_id: None,
        next_cursor: None,
    }
}
