// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests: mock transport, real SQLite store, both pipelines.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use murmur_agent::{
    BatchConfig, GenerationSettings, IngestionPipeline, IngestionSettings, MENTIONS_CURSOR,
    MENTIONS_PENDING_CURSOR, MENTIONS_RESUME_CURSOR, ReplyAgent, ReplyDispatcher, TokenBucket,
};
use murmur_core::{
    InboundMessage, MentionsPage, MurmurError, ReplyStatus, TextGenerator, TransportAdapter,
};
use murmur_test_utils::TestHarness;
use murmur_test_utils::fixtures::{at, mention, page, reply};
use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;

const USER: &str = "7";

fn ingestion(h: &TestHarness) -> IngestionPipeline {
    let transport: Arc<dyn TransportAdapter> = h.transport.clone();
    IngestionPipeline::new(Arc::clone(&h.store), transport, IngestionSettings::default())
}

fn dispatcher(h: &TestHarness) -> ReplyDispatcher {
    let transport: Arc<dyn TransportAdapter> = h.transport.clone();
    let generator: Arc<dyn TextGenerator> = h.generator.clone();
    ReplyDispatcher::new(
        Arc::clone(&h.store),
        transport,
        generator,
        Arc::new(TokenBucket::new(1000, Duration::from_secs(1), 1000)),
        GenerationSettings::default(),
        Duration::from_secs(5),
    )
}

fn fast_batch() -> BatchConfig {
    BatchConfig {
        batch_size: 10,
        batch_delay: Duration::ZERO,
        max_retries: 0,
        retry_delay: Duration::ZERO,
        rate_limit_cooldown: Duration::ZERO,
    }
}

/// A reply created after any reply the agent records during the test.
fn later_reply(id: &str, conversation: &str, parent: &str, secs: i64) -> InboundMessage {
    reply(
        id,
        USER,
        "follow up",
        conversation,
        parent,
        Utc::now() + chrono::Duration::seconds(secs),
    )
}

#[tokio::test]
async fn mention_is_ingested_answered_and_not_repeated() {
    let h = TestHarness::new().await.unwrap();
    h.transport
        .push_page(page(vec![mention("100", USER, "hey @murmur", at(0))]))
        .await;
    h.generator.add_response("hello there").await;
    let cancel = CancellationToken::new();

    let ingested = ingestion(&h).run_cycle(&cancel).await.unwrap();
    assert_eq!(ingested.stored, 1);
    assert_eq!(
        h.store.load_cursor(MENTIONS_CURSOR).await.unwrap().as_deref(),
        Some("100")
    );

    let report = dispatcher(&h).process_pending(&cancel, &fast_batch()).await.unwrap();
    assert_eq!(report.replied, 1);

    let posts = h.transport.posts().await;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].reply_to_id, "100");
    assert_eq!(posts[0].text, "hello there");

    let original = h.store.get_message("100").await.unwrap().unwrap();
    assert_eq!(original.status(), ReplyStatus::Answered);
    assert!(original.replied_to);
    let reply_id = original.last_reply_id.clone().unwrap();
    let own = h.store.get_message(&reply_id).await.unwrap().unwrap();
    assert_eq!(own.author_id, h.agent_id());
    assert_eq!(own.conversation_id, "100");

    let again = dispatcher(&h).process_pending(&cancel, &fast_batch()).await.unwrap();
    assert_eq!(again.threads, 0);
    assert_eq!(h.transport.post_count().await, 1);
}

#[tokio::test]
async fn reply_beneath_agent_reply_becomes_next_target() {
    let h = TestHarness::new().await.unwrap();
    let cancel = CancellationToken::new();
    h.transport
        .push_page(page(vec![mention("100", USER, "question", at(0))]))
        .await;
    ingestion(&h).run_cycle(&cancel).await.unwrap();
    dispatcher(&h).process_pending(&cancel, &fast_batch()).await.unwrap();
    let agent_reply = h.transport.posts().await;
    assert_eq!(agent_reply.len(), 1);
    let reply_id = h
        .store
        .get_message("100")
        .await
        .unwrap()
        .unwrap()
        .last_reply_id
        .unwrap();

    h.transport
        .push_page(page(vec![later_reply("101", "100", &reply_id, 60)]))
        .await;
    ingestion(&h).run_cycle(&cancel).await.unwrap();

    let own = h.store.get_message(&reply_id).await.unwrap().unwrap();
    assert_eq!(own.unread_replies, 1);
    assert!(!own.needs_reply);
    let original = h.store.get_message("100").await.unwrap().unwrap();
    assert_eq!(original.status(), ReplyStatus::Answered);
    let follow_up = h.store.get_message("101").await.unwrap().unwrap();
    assert!(follow_up.is_participating);

    let report = dispatcher(&h).process_pending(&cancel, &fast_batch()).await.unwrap();
    assert_eq!(report.replied, 1);
    let posts = h.transport.posts().await;
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[1].reply_to_id, "101");
    assert!(h.generator.prompts().await[1].contains("question"));
}

#[tokio::test]
async fn newest_message_in_thread_is_answered_once() {
    let h = TestHarness::new().await.unwrap();
    let cancel = CancellationToken::new();
    h.transport
        .push_page(page(vec![
            mention("100", USER, "root", at(0)),
            reply("101", "8", "first", "100", "100", at(10)),
            reply("102", "9", "second", "100", "101", at(20)),
        ]))
        .await;
    ingestion(&h).run_cycle(&cancel).await.unwrap();

    let report = dispatcher(&h).process_pending(&cancel, &fast_batch()).await.unwrap();
    assert_eq!(report.threads, 1);
    assert_eq!(report.replied, 1);
    let posts = h.transport.posts().await;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].reply_to_id, "102");

    for id in ["100", "101", "102"] {
        let m = h.store.get_message(id).await.unwrap().unwrap();
        assert!(!m.needs_reply, "{id} should be closed");
    }
    let again = dispatcher(&h).process_pending(&cancel, &fast_batch()).await.unwrap();
    assert_eq!(again.replied, 0);
}

#[tokio::test]
#[traced_test]
async fn rate_limited_post_leaves_thread_eligible() {
    let h = TestHarness::new().await.unwrap();
    let cancel = CancellationToken::new();
    h.transport
        .push_page(page(vec![mention("100", USER, "hi", at(0))]))
        .await;
    ingestion(&h).run_cycle(&cancel).await.unwrap();
    let before = h.store.get_message("100").await.unwrap().unwrap();
    let reset = Duration::from_millis(200);
    h.transport
        .push_post_result(Err(MurmurError::RateLimited {
            retry_after: Some(reset),
        }))
        .await;

    let start = std::time::Instant::now();
    let report = dispatcher(&h).process_pending(&cancel, &fast_batch()).await.unwrap();
    assert!(report.rate_limited);
    assert_eq!(report.replied, 0);
    assert!(start.elapsed() >= reset, "cooldown ignored the platform reset");
    assert!(logs_contain("platform rate limit hit"));

    let pending = h.store.get_message("100").await.unwrap().unwrap();
    assert_eq!(pending, before);
    assert_eq!(pending.status(), ReplyStatus::Unanswered);

    let retry = dispatcher(&h).process_pending(&cancel, &fast_batch()).await.unwrap();
    assert_eq!(retry.replied, 1);
    assert_eq!(h.transport.post_count().await, 2);
    assert_eq!(
        h.store.get_message("100").await.unwrap().unwrap().process_count,
        before.process_count + 1
    );
}

#[tokio::test]
async fn generator_failure_counts_and_keeps_thread_open() {
    let h = TestHarness::new().await.unwrap();
    let cancel = CancellationToken::new();
    h.transport
        .push_page(page(vec![mention("100", USER, "hi", at(0))]))
        .await;
    ingestion(&h).run_cycle(&cancel).await.unwrap();
    h.generator
        .add_error(MurmurError::Provider {
            message: "upstream 500".into(),
            source: None,
        })
        .await;

    let report = dispatcher(&h).process_pending(&cancel, &fast_batch()).await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(h.transport.post_count().await, 0);
    assert!(h.store.get_message("100").await.unwrap().unwrap().needs_reply);
}

#[tokio::test]
async fn transient_post_failure_is_retried() {
    let h = TestHarness::new().await.unwrap();
    let cancel = CancellationToken::new();
    h.transport
        .push_page(page(vec![mention("100", USER, "hi", at(0))]))
        .await;
    ingestion(&h).run_cycle(&cancel).await.unwrap();
    h.transport
        .push_post_result(Err(MurmurError::Transport {
            message: "bad gateway".into(),
            status: Some(502),
            source: None,
        }))
        .await;

    let batch = BatchConfig {
        max_retries: 2,
        ..fast_batch()
    };
    let report = dispatcher(&h).process_pending(&cancel, &batch).await.unwrap();
    assert_eq!(report.replied, 1);
    assert_eq!(h.transport.post_count().await, 2);
}

#[tokio::test]
#[traced_test]
async fn fetch_failure_holds_cursor_back() {
    let h = TestHarness::new().await.unwrap();
    let cancel = CancellationToken::new();
    let first = MentionsPage {
        next_cursor: Some("page-2".into()),
        ..page(vec![mention("205", USER, "one", at(0))])
    };
    h.transport.push_page(first).await;
    h.transport
        .push_fetch_error(MurmurError::Transport {
            message: "connection reset".into(),
            status: None,
            source: None,
        })
        .await;

    assert!(ingestion(&h).run_cycle(&cancel).await.is_err());
    assert!(h.store.get_message("205").await.unwrap().is_some());
    assert_eq!(h.store.load_cursor(MENTIONS_CURSOR).await.unwrap(), None);

    h.transport
        .push_page(page(vec![mention("206", USER, "two", at(5))]))
        .await;
    let report = ingestion(&h).run_cycle(&cancel).await.unwrap();
    assert_eq!(report.stored, 1);

    let queries = h.transport.queries().await;
    assert_eq!(queries.len(), 3);
    assert_eq!(queries[1].cursor.as_deref(), Some("page-2"));
    assert_eq!(queries[2].since_id, None);
    assert_eq!(
        h.store.load_cursor(MENTIONS_CURSOR).await.unwrap().as_deref(),
        Some("206")
    );
}

#[tokio::test]
#[traced_test]
async fn backlog_beyond_page_limit_resumes_next_cycle() {
    let h = TestHarness::new().await.unwrap();
    let cancel = CancellationToken::new();
    let transport: Arc<dyn TransportAdapter> = h.transport.clone();
    let pipeline = IngestionPipeline::new(
        Arc::clone(&h.store),
        transport,
        IngestionSettings {
            max_pages: 1,
            ..IngestionSettings::default()
        },
    );
    let newest = MentionsPage {
        next_cursor: Some("tok".into()),
        ..page(vec![mention("300", USER, "newer", at(10))])
    };
    h.transport.push_page(newest).await;
    h.transport
        .push_page(page(vec![mention("200", USER, "older", at(0))]))
        .await;

    let first = pipeline.run_cycle(&cancel).await.unwrap();
    assert!(first.truncated);
    assert_eq!(first.stored, 1);
    assert!(logs_contain("mentions backlog exceeds page limit"));
    assert_eq!(h.store.load_cursor(MENTIONS_CURSOR).await.unwrap(), None);
    assert_eq!(
        h.store.load_cursor(MENTIONS_RESUME_CURSOR).await.unwrap().as_deref(),
        Some("tok")
    );

    let second = pipeline.run_cycle(&cancel).await.unwrap();
    assert!(!second.truncated);
    assert!(h.store.get_message("200").await.unwrap().is_some());

    let queries = h.transport.queries().await;
    assert_eq!(queries[1].cursor.as_deref(), Some("tok"));
    assert_eq!(
        h.store.load_cursor(MENTIONS_CURSOR).await.unwrap().as_deref(),
        Some("300")
    );
    assert_eq!(h.store.load_cursor(MENTIONS_RESUME_CURSOR).await.unwrap(), None);
    assert_eq!(h.store.load_cursor(MENTIONS_PENDING_CURSOR).await.unwrap(), None);
}

#[tokio::test]
async fn malformed_and_own_messages_are_never_targeted() {
    let h = TestHarness::new().await.unwrap();
    let cancel = CancellationToken::new();
    let mut orphan = mention("300", USER, "no author", at(0));
    orphan.author_id = String::new();
    h.transport
        .push_page(page(vec![
            orphan,
            mention("301", h.agent_id(), "posted by me", at(1)),
        ]))
        .await;

    let report = ingestion(&h).run_cycle(&cancel).await.unwrap();
    assert_eq!(report.rejected, 1);
    assert_eq!(report.stored, 1);
    assert!(h.store.get_message("300").await.unwrap().is_none());
    assert!(!h.store.get_message("301").await.unwrap().unwrap().needs_reply);

    let dispatch = dispatcher(&h).process_pending(&cancel, &fast_batch()).await.unwrap();
    assert_eq!(dispatch.threads, 0);
    assert_eq!(h.transport.post_count().await, 0);
}

#[tokio::test]
#[traced_test]
async fn threads_are_batched_most_recent_first() {
    let h = TestHarness::new().await.unwrap();
    let cancel = CancellationToken::new();
    h.transport
        .push_page(page(vec![
            mention("100", USER, "a", at(0)),
            mention("200", USER, "b", at(10)),
            mention("300", USER, "c", at(20)),
        ]))
        .await;
    ingestion(&h).run_cycle(&cancel).await.unwrap();

    let batch = BatchConfig {
        batch_size: 2,
        ..fast_batch()
    };
    let report = dispatcher(&h).process_pending(&cancel, &batch).await.unwrap();
    assert_eq!(report.threads, 3);
    assert_eq!(report.replied, 3);

    let order: Vec<String> = h
        .transport
        .posts()
        .await
        .into_iter()
        .map(|p| p.reply_to_id)
        .collect();
    assert_eq!(order, ["300", "200", "100"]);
    assert!(logs_contain("processing batch"));
}

#[tokio::test]
async fn cancelled_dispatch_posts_nothing() {
    let h = TestHarness::new().await.unwrap();
    let cancel = CancellationToken::new();
    h.transport
        .push_page(page(vec![mention("100", USER, "hi", at(0))]))
        .await;
    ingestion(&h).run_cycle(&cancel).await.unwrap();

    cancel.cancel();
    let report = dispatcher(&h).process_pending(&cancel, &fast_batch()).await.unwrap();
    assert_eq!(report.replied, 0);
    assert_eq!(h.transport.post_count().await, 0);
}

#[tokio::test]
async fn agent_loops_run_until_cancelled() {
    let h = TestHarness::new().await.unwrap();
    h.transport
        .push_page(page(vec![mention("100", USER, "hi", at(0))]))
        .await;

    let agent = Arc::new(ReplyAgent::new(
        ingestion(&h),
        dispatcher(&h),
        Duration::from_millis(20),
        Duration::from_millis(20),
        fast_batch(),
    ));
    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let agent = Arc::clone(&agent);
        let cancel = cancel.clone();
        async move { agent.run(cancel).await }
    });

    tokio::time::timeout(Duration::from_secs(5), async {
        while h.transport.post_count().await == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("agent should post a reply");

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("agent should stop")
        .unwrap();
    assert_eq!(h.transport.post_count().await, 1);
}
