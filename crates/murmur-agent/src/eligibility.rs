// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Eligibility engine: which conversations need a reply right now.
//!
//! The store supplies an indexed candidate list; each candidate's full
//! conversation is then loaded and reduced to at most one target, the newest
//! message that satisfies [`is_actionable`].

use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use murmur_core::{Category, Message, MurmurError, ReplyStatus, compare_ids};
use murmur_storage::ConversationStore;
use tracing::debug;

/// Conversation-level facts the predicate needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThreadView {
    /// The agent has posted in this conversation.
    pub participating: bool,
    /// When the agent last replied in this conversation.
    pub last_reply_time: Option<DateTime<Utc>>,
}

impl ThreadView {
    pub fn from_messages(messages: &[Message]) -> Self {
        Self {
            participating: messages.iter().any(|m| m.is_participating),
            last_reply_time: messages.iter().filter_map(|m| m.last_reply_time).max(),
        }
    }

    fn is_after_last_reply(&self, ts: DateTime<Utc>) -> bool {
        self.last_reply_time.is_none_or(|last| ts > last)
    }
}

/// Whether `message` warrants a reply from `agent_id` given its conversation.
pub fn is_actionable(message: &Message, view: &ThreadView, agent_id: &str) -> bool {
    if message.author_id == agent_id {
        return false;
    }
    match (message.status(), message.category) {
        (ReplyStatus::Answered, _) => false,
        (ReplyStatus::Unanswered, Category::Mention | Category::Conversation) => true,
        (ReplyStatus::Unanswered | ReplyStatus::AwaitingDispatch, _) => {
            view.participating
                && (message.unread_replies > 0 || view.is_after_last_reply(message.created_at))
        }
    }
}

/// All messages of one conversation, oldest first.
#[derive(Debug, Clone)]
pub struct ConversationThread {
    pub conversation_id: String,
    pub messages: Vec<Message>,
    pub last_reply_time: Option<DateTime<Utc>>,
}

impl ConversationThread {
    /// Builds a thread, sorting by `created_at` with the numeric id as
    /// tie-break.
    pub fn new(conversation_id: impl Into<String>, mut messages: Vec<Message>) -> Self {
        messages.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| compare_ids(&a.id, &b.id))
        });
        let last_reply_time = ThreadView::from_messages(&messages).last_reply_time;
        Self {
            conversation_id: conversation_id.into(),
            messages,
            last_reply_time,
        }
    }

    pub fn view(&self) -> ThreadView {
        ThreadView::from_messages(&self.messages)
    }

    /// The newest message that needs a reply, if any.
    pub fn target(&self, agent_id: &str) -> Option<&Message> {
        let view = self.view();
        self.messages
            .iter()
            .rev()
            .find(|m| is_actionable(m, &view, agent_id))
    }

    /// Messages strictly before `target`, oldest first.
    pub fn context_before(&self, target: &Message) -> &[Message] {
        let end = self
            .messages
            .iter()
            .position(|m| m.id == target.id)
            .unwrap_or(self.messages.len());
        &self.messages[..end]
    }

    /// Timestamp of the newest message in the thread.
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.messages.last().map(|m| m.created_at)
    }
}

/// Computes the set of threads that need a reply.
pub struct EligibilityEngine {
    store: Arc<ConversationStore>,
}

impl EligibilityEngine {
    pub fn new(store: Arc<ConversationStore>) -> Self {
        Self { store }
    }

    /// Threads with a reply target, most recently active first.
    pub async fn recall(&self, agent_id: &str) -> Result<Vec<ConversationThread>, MurmurError> {
        let candidates = self.store.candidate_messages(agent_id).await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = candidates
            .iter()
            .map(|m| m.conversation_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let conversations = self.store.conversations(&ids).await?;

        let mut threads: Vec<ConversationThread> = conversations
            .into_iter()
            .map(|(id, messages)| ConversationThread::new(id, messages))
            .filter(|t| t.target(agent_id).is_some())
            .collect();

        threads.sort_by_key(|t| (Reverse(t.last_activity()), t.conversation_id.clone()));
        debug!(
            candidates = candidates.len(),
            threads = threads.len(),
            "eligible threads recalled"
        );
        Ok(threads)
    }
}
