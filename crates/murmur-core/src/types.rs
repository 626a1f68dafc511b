// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the store, the engine, and the adapters.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the role an adapter plays.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Transport,
    Generator,
    Storage,
}

/// Classification assigned to a message once, at ingestion.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Mention,
    Reply,
    Quote,
    Retweet,
    Conversation,
    Dm,
}

/// Kind of link from one message to another.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    RepliedTo,
    Quoted,
    Retweeted,
}

/// A typed reference to another message, in platform order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencedMessage {
    #[serde(rename = "type")]
    pub kind: ReferenceKind,
    pub id: String,
}

/// A message as delivered by the transport, before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub id: String,
    pub text: String,
    pub author_id: String,
    /// Empty or absent for thread roots on some platform responses.
    pub conversation_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub language: Option<String>,
    pub in_reply_to_user_id: Option<String>,
    pub referenced_messages: Vec<ReferencedMessage>,
}

impl InboundMessage {
    /// Returns the id of the message this one replies to, if any.
    pub fn replied_to(&self) -> Option<&str> {
        self.referenced_messages
            .iter()
            .find(|r| r.kind == ReferenceKind::RepliedTo)
            .map(|r| r.id.as_str())
    }

    /// Returns true if the platform supplied a non-empty conversation id.
    pub fn has_conversation_id(&self) -> bool {
        self.conversation_id.as_deref().is_some_and(|c| !c.is_empty())
    }

    /// Conversation id with the thread-root fallback applied.
    pub fn resolved_conversation_id(&self) -> String {
        match self.conversation_id.as_deref() {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => self.id.clone(),
        }
    }
}

/// Display information for a message author, side-loaded with mention pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub username: String,
}

/// One page of mentions returned by the transport.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MentionsPage {
    pub messages: Vec<InboundMessage>,
    pub users: Vec<UserProfile>,
    /// Highest message id in the page, used as the next `since_id`.
    pub newest_id: Option<String>,
    /// Pagination token for older results within the same query.
    pub next_cursor: Option<String>,
}

impl MentionsPage {
    /// Looks up the side-loaded profile for an author.
    pub fn author(&self, author_id: &str) -> Option<&UserProfile> {
        self.users.iter().find(|u| u.id == author_id)
    }
}

/// Parent and root linkage derived for a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRef {
    pub is_root: bool,
    pub parent_id: Option<String>,
    pub root_id: String,
    pub conversation_id: String,
}

/// Reply lifecycle of a stored message, derived from its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ReplyStatus {
    /// Needs a reply and has never been answered.
    Unanswered,
    /// Answered once, then re-opened by a new reply beneath it.
    AwaitingDispatch,
    /// Closed: answered, consolidated, or authored by the agent.
    Answered,
}

/// A message row as persisted by the conversation store.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub text: String,
    pub author_id: String,
    pub author_name: Option<String>,
    pub author_username: Option<String>,
    pub language: Option<String>,
    pub created_at: DateTime<Utc>,
    pub conversation_id: String,
    pub category: Category,
    pub referenced_messages: Vec<ReferencedMessage>,
    pub in_reply_to_user_id: Option<String>,
    pub needs_reply: bool,
    pub replied_to: bool,
    pub is_participating: bool,
    pub unread_replies: i64,
    pub last_reply_id: Option<String>,
    pub last_reply_time: Option<DateTime<Utc>>,
    pub process_count: i64,
    pub processed_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub conversation_ref: Option<ConversationRef>,
}

impl Message {
    pub fn status(&self) -> ReplyStatus {
        match (self.needs_reply, self.replied_to) {
            (false, _) => ReplyStatus::Answered,
            (true, false) => ReplyStatus::Unanswered,
            (true, true) => ReplyStatus::AwaitingDispatch,
        }
    }

    /// Handle used in reply context lines, falling back to the author id.
    pub fn display_handle(&self) -> &str {
        self.author_username.as_deref().unwrap_or(&self.author_id)
    }

    /// Display name used in reply context lines, falling back to the handle.
    pub fn display_name(&self) -> &str {
        self.author_name
            .as_deref()
            .unwrap_or_else(|| self.display_handle())
    }
}

/// The identity the agent posts under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentIdentity {
    pub account_id: String,
    pub name: String,
    pub username: String,
}

/// A reply to publish through the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostReplyRequest {
    pub text: String,
    pub reply_to_id: String,
    /// When absent the transport recovers it from the parent message.
    pub conversation_id: Option<String>,
}

/// A reply accepted by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedReply {
    pub id: String,
    pub conversation_id: Option<String>,
}

/// A text generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_length: usize,
    pub temperature: f32,
}

/// Orders platform ids numerically. Ids are unpadded decimal strings, so a
/// shorter id is always the smaller one.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
