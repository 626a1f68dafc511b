// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport adapter for deterministic testing.
//!
//! `MockTransport` serves scripted mention pages and captures every reply
//! posted through it for assertion in tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use murmur_core::{
    AdapterType, HealthStatus, InboundMessage, MentionsPage, MentionsQuery, MurmurError,
    PluginAdapter, PostReplyRequest, PostedReply, TransportAdapter,
};

/// A mock social platform.
///
/// Provides three queues:
/// - **pages**: results returned by `fetch_mentions()`, in order; an empty
///   page once exhausted
/// - **post results**: scripted outcomes for `post_reply()`; success with a
///   fresh id once exhausted
/// - **posts**: every request passed to `post_reply()`, including failed ones
pub struct MockTransport {
    account_id: String,
    pages: Arc<Mutex<VecDeque<Result<MentionsPage, MurmurError>>>>,
    post_results: Arc<Mutex<VecDeque<Result<PostedReply, MurmurError>>>>,
    posts: Arc<Mutex<Vec<PostReplyRequest>>>,
    queries: Arc<Mutex<Vec<MentionsQuery>>>,
    messages: Arc<Mutex<HashMap<String, InboundMessage>>>,
    next_id: AtomicU64,
}

impl MockTransport {
    /// Create a transport authenticated as `account_id`.
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            pages: Arc::new(Mutex::new(VecDeque::new())),
            post_results: Arc::new(Mutex::new(VecDeque::new())),
            posts: Arc::new(Mutex::new(Vec::new())),
            queries: Arc::new(Mutex::new(Vec::new())),
            messages: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(9_000_000),
        }
    }

    /// Queue a page for the next `fetch_mentions()` call.
    pub async fn push_page(&self, page: MentionsPage) {
        self.pages.lock().await.push_back(Ok(page));
    }

    /// Queue a failure for the next `fetch_mentions()` call.
    pub async fn push_fetch_error(&self, err: MurmurError) {
        self.pages.lock().await.push_back(Err(err));
    }

    /// Queue the outcome of the next `post_reply()` call.
    pub async fn push_post_result(&self, result: Result<PostedReply, MurmurError>) {
        self.post_results.lock().await.push_back(result);
    }

    /// Make `message` available through `get_message()`.
    pub async fn insert_message(&self, message: InboundMessage) {
        self.messages.lock().await.insert(message.id.clone(), message);
    }

    /// Every reply request received so far.
    pub async fn posts(&self) -> Vec<PostReplyRequest> {
        self.posts.lock().await.clone()
    }

    pub async fn post_count(&self) -> usize {
        self.posts.lock().await.len()
    }

    /// Every mentions query received so far.
    pub async fn queries(&self) -> Vec<MentionsQuery> {
        self.queries.lock().await.clone()
    }

    fn fresh_id(&self) -> String {
        self.next_id.fetch_add(1, Ordering::SeqCst).to_string()
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, MurmurError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MurmurError> {
        Ok(())
    }
}

#[async_trait]
impl TransportAdapter for MockTransport {
    async fn fetch_mentions(&self, query: &MentionsQuery) -> Result<MentionsPage, MurmurError> {
        self.queries.lock().await.push(query.clone());
        self.pages
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(MentionsPage::default()))
    }

    async fn authenticated_account_id(&self) -> Result<String, MurmurError> {
        Ok(self.account_id.clone())
    }

    async fn post_reply(&self, request: &PostReplyRequest) -> Result<PostedReply, MurmurError> {
        self.posts.lock().await.push(request.clone());
        match self.post_results.lock().await.pop_front() {
            Some(result) => result,
            None => Ok(PostedReply {
                id: self.fresh_id(),
                conversation_id: request.conversation_id.clone(),
            }),
        }
    }

    async fn get_message(&self, id: &str) -> Result<Option<InboundMessage>, MurmurError> {
        Ok(self.messages.lock().await.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, mention, page};

    #[tokio::test]
    async fn pages_are_served_in_order_then_empty() {
        let transport = MockTransport::new("42");
        transport
            .push_page(page(vec![mention("100", "7", "hi", at(0))]))
            .await;

        let query = MentionsQuery::default();
        let first = transport.fetch_mentions(&query).await.unwrap();
        assert_eq!(first.messages.len(), 1);
        let second = transport.fetch_mentions(&query).await.unwrap();
        assert!(second.messages.is_empty());
        assert_eq!(transport.queries().await.len(), 2);
    }

    #[tokio::test]
    async fn posts_are_captured_with_fresh_ids() {
        let transport = MockTransport::new("42");
        let request = PostReplyRequest {
            text: "hello".into(),
            reply_to_id: "100".into(),
            conversation_id: Some("100".into()),
        };
        let a = transport.post_reply(&request).await.unwrap();
        let b = transport.post_reply(&request).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.conversation_id.as_deref(), Some("100"));
        assert_eq!(transport.post_count().await, 2);
    }

    #[tokio::test]
    async fn scripted_post_failure_is_returned() {
        let transport = MockTransport::new("42");
        transport
            .push_post_result(Err(MurmurError::RateLimited { retry_after: None }))
            .await;
        let request = PostReplyRequest {
            text: "hello".into(),
            reply_to_id: "100".into(),
            conversation_id: None,
        };
        assert!(transport.post_reply(&request).await.unwrap_err().is_rate_limit());
        assert_eq!(transport.post_count().await, 1);
    }
}
