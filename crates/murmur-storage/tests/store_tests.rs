// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation store behaviour through the public API only.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use murmur_core::{
    AgentIdentity, Category, InboundMessage, ReferenceKind, ReferencedMessage, ReplyStatus,
};
use murmur_storage::{ConversationStore, Database};

const AGENT: &str = "1000";

async fn open_store(dir: &tempfile::TempDir) -> ConversationStore {
    let path = dir.path().join("store.db");
    let db = Database::open(&path.to_string_lossy()).await.unwrap();
    ConversationStore::new(
        db,
        AgentIdentity {
            account_id: AGENT.into(),
            name: "Murmur".into(),
            username: "murmur".into(),
        },
        Duration::from_secs(10),
    )
}

fn message(id: &str, author: &str, conversation: &str, parent: Option<&str>, secs: i64) -> InboundMessage {
    InboundMessage {
        id: id.into(),
        text: format!("message {id}"),
        author_id: author.into(),
        conversation_id: Some(conversation.into()),
        created_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
            + chrono::Duration::seconds(secs),
        language: None,
        in_reply_to_user_id: None,
        referenced_messages: parent
            .map(|p| {
                vec![ReferencedMessage {
                    kind: ReferenceKind::RepliedTo,
                    id: p.into(),
                }]
            })
            .unwrap_or_default(),
    }
}

#[tokio::test]
async fn reingesting_a_message_changes_nothing_that_matters() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;

    store
        .upsert_message(&message("100", "7", "100", None, 0), Category::Mention, None)
        .await
        .unwrap();
    store
        .record_own_reply("100", "101", "100", "hello")
        .await
        .unwrap();
    let reply = message("102", "7", "100", Some("101"), 60);
    let first = store
        .upsert_message(&reply, Category::Conversation, None)
        .await
        .unwrap();
    let second = store
        .upsert_message(&reply, Category::Conversation, None)
        .await
        .unwrap();

    assert!(first.inserted && first.parent_bumped);
    assert!(!second.inserted && !second.parent_bumped);
    let parent = store.get_message("101").await.unwrap().unwrap();
    assert_eq!(parent.unread_replies, 1);
    assert_eq!(
        store.get_message("100").await.unwrap().unwrap().status(),
        ReplyStatus::Answered
    );
}

#[tokio::test]
async fn participation_never_reverts() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;

    store
        .upsert_message(&message("200", "7", "200", None, 0), Category::Mention, None)
        .await
        .unwrap();
    store
        .record_own_reply("200", "201", "200", "hi")
        .await
        .unwrap();
    store
        .upsert_message(&message("200", "7", "200", None, 0), Category::Mention, None)
        .await
        .unwrap();
    store
        .upsert_message(&message("202", "8", "200", Some("200"), 90), Category::Conversation, None)
        .await
        .unwrap();

    let conversation = store.get_conversation("200").await.unwrap();
    assert_eq!(conversation.len(), 3);
    assert!(conversation.iter().all(|m| m.is_participating));
}

#[tokio::test]
async fn concurrent_writers_serialize_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(open_store(&dir).await);
    store
        .upsert_message(&message("300", "7", "300", None, 0), Category::Mention, None)
        .await
        .unwrap();
    store
        .record_own_reply("300", "301", "300", "hi")
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..8i64 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let id = format!("{}", 400 + i);
            store
                .upsert_message(
                    &message(&id, "7", "300", Some("301"), 100 + i),
                    Category::Conversation,
                    None,
                )
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let parent = store.get_message("301").await.unwrap().unwrap();
    assert_eq!(parent.unread_replies, 8);
    assert!(!parent.needs_reply);
}
