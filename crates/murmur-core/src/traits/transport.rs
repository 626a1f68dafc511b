// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport adapter trait for the social platform the agent lives on.

use async_trait::async_trait;

use crate::error::MurmurError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{InboundMessage, MentionsPage, PostReplyRequest, PostedReply};

/// Query parameters for one mentions fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MentionsQuery {
    /// Only return messages newer than this id.
    pub since_id: Option<String>,
    /// Continuation token from a previous page of the same query.
    pub cursor: Option<String>,
    pub page_size: u32,
}

/// Adapter for reading mentions and publishing replies.
///
/// Implementations report platform throttling as
/// [`MurmurError::RateLimited`] so the dispatcher can pause the cycle.
#[async_trait]
pub trait TransportAdapter: PluginAdapter {
    /// Fetches one page of mentions of the authenticated account.
    async fn fetch_mentions(&self, query: &MentionsQuery) -> Result<MentionsPage, MurmurError>;

    /// Returns the platform id of the account the agent posts as.
    async fn authenticated_account_id(&self) -> Result<String, MurmurError>;

    /// Publishes a reply and returns the platform's id for it.
    async fn post_reply(&self, request: &PostReplyRequest) -> Result<PostedReply, MurmurError>;

    /// Fetches a single message by id, `None` if it does not exist.
    async fn get_message(&self, id: &str) -> Result<Option<InboundMessage>, MurmurError>;
}
