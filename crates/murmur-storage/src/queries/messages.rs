// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message persistence: ingestion upserts, reply closure, and reads.
//!
//! Every multi-row change runs inside one SQLite transaction so counters and
//! flags never drift under concurrent ingestion and dispatch.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use murmur_core::classifier;
use murmur_core::{
    AgentIdentity, Category, ConversationRef, InboundMessage, Message, MurmurError,
    ReferenceKind, ReferencedMessage, UserProfile,
};
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};
use crate::timestamp;

pub(crate) const COLUMNS: &str = "id, text, author_id, author_name, author_username, language, \
     created_at, conversation_id, category, referenced_messages, in_reply_to_user_id, \
     needs_reply, replied_to, is_participating, unread_replies, last_reply_id, last_reply_time, \
     process_count, processed_at, last_updated, conversation_ref";

/// What an upsert changed, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// False when the row already existed and was refreshed.
    pub inserted: bool,
    /// The parent's unread counter was incremented.
    pub parent_bumped: bool,
    /// The conversation is (now) one the agent takes part in.
    pub participating: bool,
}

/// Per-category and pending counts for the `status` command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub total: i64,
    pub by_category: BTreeMap<String, i64>,
    pub needs_reply: i64,
    pub participating_conversations: i64,
}

fn conversion_err(idx: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    timestamp::decode(&raw).map_err(|e| conversion_err(idx, e))
}

fn opt_ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|r| timestamp::decode(&r).map_err(|e| conversion_err(idx, e)))
        .transpose()
}

/// Maps a row selected with [`COLUMNS`] into a [`Message`].
pub(crate) fn row_to_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    let category: String = row.get(8)?;
    let refs: String = row.get(9)?;
    let conversation_ref: Option<String> = row.get(20)?;

    Ok(Message {
        id: row.get(0)?,
        text: row.get(1)?,
        author_id: row.get(2)?,
        author_name: row.get(3)?,
        author_username: row.get(4)?,
        language: row.get(5)?,
        created_at: ts_col(row, 6)?,
        conversation_id: row.get(7)?,
        category: Category::from_str(&category).map_err(|e| conversion_err(8, e))?,
        referenced_messages: serde_json::from_str(&refs).map_err(|e| conversion_err(9, e))?,
        in_reply_to_user_id: row.get(10)?,
        needs_reply: row.get(11)?,
        replied_to: row.get(12)?,
        is_participating: row.get(13)?,
        unread_replies: row.get(14)?,
        last_reply_id: row.get(15)?,
        last_reply_time: opt_ts_col(row, 16)?,
        process_count: row.get(17)?,
        processed_at: ts_col(row, 18)?,
        last_updated: ts_col(row, 19)?,
        conversation_ref: conversation_ref
            .map(|raw| serde_json::from_str::<ConversationRef>(&raw))
            .transpose()
            .map_err(|e| conversion_err(20, e))?,
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> rusqlite::Result<String> {
    serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

/// Inserts or refreshes an inbound message and propagates conversation state.
///
/// On conflict the category, reply-closure flags and counters of the
/// existing row are kept; only descriptive fields are refreshed. The parent's
/// unread counter moves only the first time a message is stored.
pub async fn upsert_message(
    db: &Database,
    message: &InboundMessage,
    category: Category,
    author: Option<&UserProfile>,
    agent_id: &str,
) -> Result<UpsertOutcome, MurmurError> {
    let message = message.clone();
    let author = author.cloned();
    let agent_id = agent_id.to_string();

    db.connection()
        .call(move |conn| -> Result<UpsertOutcome, rusqlite::Error> {
            let tx = conn.transaction()?;
            let now = timestamp::now();
            let conversation_id = message.resolved_conversation_id();
            let parent_id = message.replied_to().map(str::to_string);
            let own = message.author_id == agent_id;

            let existed: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM messages WHERE id = ?1)",
                params![message.id],
                |row| row.get(0),
            )?;

            let conversation_participating: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM messages WHERE conversation_id = ?1 AND is_participating = 1)",
                params![conversation_id],
                |row| row.get(0),
            )?;
            let parent_participating: bool = match &parent_id {
                Some(parent) => tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM messages WHERE id = ?1 AND is_participating = 1)",
                    params![parent],
                    |row| row.get(0),
                )?,
                None => false,
            };
            let participating = own || conversation_participating || parent_participating;

            tx.execute(
                "INSERT INTO messages (id, text, author_id, author_name, author_username, language,
                     created_at, conversation_id, category, referenced_messages, in_reply_to_user_id,
                     needs_reply, replied_to, is_participating, unread_replies, process_count,
                     processed_at, last_updated, conversation_ref)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 0, ?13, 0, 0, ?14, ?14, ?15)
                 ON CONFLICT(id) DO UPDATE SET
                     text = excluded.text,
                     author_name = COALESCE(excluded.author_name, messages.author_name),
                     author_username = COALESCE(excluded.author_username, messages.author_username),
                     language = COALESCE(excluded.language, messages.language),
                     referenced_messages = excluded.referenced_messages,
                     in_reply_to_user_id = COALESCE(excluded.in_reply_to_user_id, messages.in_reply_to_user_id),
                     conversation_ref = excluded.conversation_ref,
                     is_participating = MAX(messages.is_participating, excluded.is_participating),
                     last_updated = excluded.last_updated",
                params![
                    message.id,
                    message.text,
                    message.author_id,
                    author.as_ref().map(|a| a.name.clone()),
                    author.as_ref().map(|a| a.username.clone()),
                    message.language,
                    timestamp::encode(&message.created_at),
                    conversation_id,
                    category.to_string(),
                    to_json(&message.referenced_messages)?,
                    message.in_reply_to_user_id,
                    !own,
                    participating,
                    now,
                    to_json(&classifier::conversation_ref(&message))?,
                ],
            )?;

            let mut parent_bumped = false;
            if !existed
                && participating
                && let Some(parent) = &parent_id
            {
                let changed = tx.execute(
                    "UPDATE messages
                     SET unread_replies = unread_replies + 1,
                         needs_reply = CASE WHEN author_id = ?2 THEN needs_reply ELSE 1 END,
                         last_updated = ?3
                     WHERE id = ?1",
                    params![parent, agent_id, now],
                )?;
                parent_bumped = changed > 0;
            }

            if participating {
                tx.execute(
                    "UPDATE messages SET is_participating = 1, last_updated = ?3
                     WHERE conversation_id = ?1 AND id != ?2 AND is_participating = 0",
                    params![conversation_id, message.id, now],
                )?;
            }

            tx.commit()?;
            Ok(UpsertOutcome {
                inserted: !existed,
                parent_bumped,
                participating,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Persists a reply the agent just posted and closes the thread it answers.
///
/// In one transaction: inserts the outbound row, closes the original,
/// consolidates older inbound messages of the conversation, and stamps the
/// conversation with the reply time.
pub async fn record_own_reply(
    db: &Database,
    agent: &AgentIdentity,
    original_id: &str,
    reply_id: &str,
    conversation_id: &str,
    reply_text: &str,
) -> Result<(), MurmurError> {
    let agent = agent.clone();
    let original_id = original_id.to_string();
    let reply_id = reply_id.to_string();
    let conversation_id = conversation_id.to_string();
    let reply_text = reply_text.to_string();

    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            let now = timestamp::now();

            let original: Option<(String, String)> = tx
                .query_row(
                    "SELECT created_at, conversation_id FROM messages WHERE id = ?1",
                    params![original_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let conversation_id = match (&original, conversation_id.is_empty()) {
                (_, false) => conversation_id,
                (Some((_, stored)), true) => stored.clone(),
                (None, true) => original_id.clone(),
            };

            let refs = vec![ReferencedMessage {
                kind: ReferenceKind::RepliedTo,
                id: original_id.clone(),
            }];
            let conversation_ref = ConversationRef {
                is_root: false,
                parent_id: Some(original_id.clone()),
                root_id: conversation_id.clone(),
                conversation_id: conversation_id.clone(),
            };

            tx.execute(
                "INSERT INTO messages (id, text, author_id, author_name, author_username,
                     created_at, conversation_id, category, referenced_messages,
                     needs_reply, replied_to, is_participating, unread_replies, process_count,
                     processed_at, last_updated, conversation_ref)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, 0, 1, 0, 0, ?6, ?6, ?10)
                 ON CONFLICT(id) DO NOTHING",
                params![
                    reply_id,
                    reply_text,
                    agent.account_id,
                    agent.name,
                    agent.username,
                    now,
                    conversation_id,
                    Category::Reply.to_string(),
                    to_json(&refs)?,
                    to_json(&conversation_ref)?,
                ],
            )?;

            tx.execute(
                "UPDATE messages
                 SET replied_to = 1, needs_reply = 0, unread_replies = 0,
                     last_reply_id = ?2, last_reply_time = ?3, last_updated = ?3
                 WHERE id = ?1",
                params![original_id, reply_id, now],
            )?;

            if let Some((original_created, _)) = &original {
                tx.execute(
                    "UPDATE messages
                     SET needs_reply = 0, unread_replies = 0, last_updated = ?4
                     WHERE conversation_id = ?1 AND id != ?2 AND author_id != ?3
                       AND created_at <= ?5 AND (needs_reply = 1 OR unread_replies > 0)",
                    params![conversation_id, original_id, agent.account_id, now, original_created],
                )?;
            }

            tx.execute(
                "UPDATE messages SET is_participating = 1, last_reply_time = ?2, last_updated = ?2
                 WHERE conversation_id = ?1",
                params![conversation_id, now],
            )?;

            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

/// Closes a message without recording the reply row.
///
/// Returns `NotFound` when the message does not exist.
pub async fn mark_answered(
    db: &Database,
    message_id: &str,
    reply_id: Option<&str>,
) -> Result<(), MurmurError> {
    let id = message_id.to_string();
    let reply_id = reply_id.map(str::to_string);
    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            let now = timestamp::now();
            conn.execute(
                "UPDATE messages
                 SET replied_to = 1, needs_reply = 0, unread_replies = 0, is_participating = 1,
                     last_reply_id = COALESCE(?2, last_reply_id),
                     last_reply_time = COALESCE(last_reply_time, ?3),
                     last_updated = ?3
                 WHERE id = ?1",
                params![id, reply_id, now],
            )
        })
        .await
        .map_err(map_tr_err)?;

    if changed == 0 {
        return Err(MurmurError::NotFound {
            id: message_id.to_string(),
        });
    }
    Ok(())
}

/// Bumps `process_count` and stamps `processed_at` for a dispatch attempt.
pub async fn record_attempt(db: &Database, message_id: &str) -> Result<(), MurmurError> {
    let id = message_id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let now = timestamp::now();
            conn.execute(
                "UPDATE messages SET process_count = process_count + 1, processed_at = ?2
                 WHERE id = ?1",
                params![id, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_message(db: &Database, id: &str) -> Result<Option<Message>, MurmurError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Message>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM messages WHERE id = ?1"),
                params![id],
                row_to_message,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// All messages of a conversation, oldest first (id breaks ties).
pub async fn get_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<Message>, MurmurError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Message>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM messages WHERE conversation_id = ?1
                 ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![conversation_id], row_to_message)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Several conversations in one round trip, each oldest first.
pub async fn get_conversations(
    db: &Database,
    conversation_ids: &[String],
) -> Result<BTreeMap<String, Vec<Message>>, MurmurError> {
    let ids = conversation_ids.to_vec();
    db.connection()
        .call(move |conn| -> Result<BTreeMap<String, Vec<Message>>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM messages WHERE conversation_id = ?1
                 ORDER BY created_at ASC, id ASC"
            ))?;
            let mut out = BTreeMap::new();
            for id in ids {
                let rows = stmt
                    .query_map(params![id], row_to_message)?
                    .collect::<Result<Vec<_>, _>>()?;
                out.insert(id, rows);
            }
            Ok(out)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_by_category(
    db: &Database,
    category: Category,
) -> Result<Vec<Message>, MurmurError> {
    db.connection()
        .call(move |conn| -> Result<Vec<Message>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM messages WHERE category = ?1 ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![category.to_string()], row_to_message)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn stats(db: &Database) -> Result<StoreStats, MurmurError> {
    db.connection()
        .call(|conn| -> Result<StoreStats, rusqlite::Error> {
            let mut stats = StoreStats::default();
            let mut stmt =
                conn.prepare("SELECT category, COUNT(*) FROM messages GROUP BY category")?;
            let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get(1)?)))?;
            for row in rows {
                let (category, count) = row?;
                stats.total += count;
                stats.by_category.insert(category, count);
            }
            stats.needs_reply = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE needs_reply = 1",
                [],
                |row| row.get(0),
            )?;
            stats.participating_conversations = conn.query_row(
                "SELECT COUNT(DISTINCT conversation_id) FROM messages WHERE is_participating = 1",
                [],
                |row| row.get(0),
            )?;
            Ok(stats)
        })
        .await
        .map_err(map_tr_err)
}
