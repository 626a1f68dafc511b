// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The conversation store shared by ingestion and dispatch.
//!
//! Wraps the single-writer [`Database`] with a read/write lock and a bounded
//! per-call timeout. Reads take the read lock, mutations the write lock.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use murmur_config::model::StorageConfig;
use murmur_core::{
    AdapterType, AgentIdentity, Category, HealthStatus, InboundMessage, Message, MurmurError,
    PluginAdapter, UserProfile, with_deadline,
};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::database::{Database, map_tr_err};
use crate::queries::messages::{StoreStats, UpsertOutcome};
use crate::queries::{candidates, cursors, messages};

/// Persistent record of every message plus conversation tracking state.
pub struct ConversationStore {
    db: Database,
    agent: AgentIdentity,
    lock: RwLock<()>,
    timeout: Duration,
}

impl ConversationStore {
    /// Opens the database described by `config` on behalf of `agent`.
    pub async fn open(config: &StorageConfig, agent: AgentIdentity) -> Result<Self, MurmurError> {
        let db = Database::open_with_options(&config.database_path, config.wal_mode).await?;
        Ok(Self::new(db, agent, config.timeout()))
    }

    pub fn new(db: Database, agent: AgentIdentity, timeout: Duration) -> Self {
        Self {
            db,
            agent,
            lock: RwLock::new(()),
            timeout,
        }
    }

    pub fn agent(&self) -> &AgentIdentity {
        &self.agent
    }

    async fn read<T, F>(&self, fut: F) -> Result<T, MurmurError>
    where
        F: Future<Output = Result<T, MurmurError>>,
    {
        with_deadline(self.timeout, async {
            let _guard = self.lock.read().await;
            fut.await
        })
        .await
    }

    async fn write<T, F>(&self, fut: F) -> Result<T, MurmurError>
    where
        F: Future<Output = Result<T, MurmurError>>,
    {
        with_deadline(self.timeout, async {
            let _guard = self.lock.write().await;
            fut.await
        })
        .await
    }

    /// Inserts or refreshes an inbound message in one transaction.
    #[instrument(skip_all, fields(message_id = %message.id))]
    pub async fn upsert_message(
        &self,
        message: &InboundMessage,
        category: Category,
        author: Option<&UserProfile>,
    ) -> Result<UpsertOutcome, MurmurError> {
        let outcome = self
            .write(messages::upsert_message(
                &self.db,
                message,
                category,
                author,
                &self.agent.account_id,
            ))
            .await?;
        debug!(
            inserted = outcome.inserted,
            parent_bumped = outcome.parent_bumped,
            participating = outcome.participating,
            "message upserted"
        );
        Ok(outcome)
    }

    /// Records the agent's reply and closes the thread it answers.
    #[instrument(skip(self, reply_text))]
    pub async fn record_own_reply(
        &self,
        original_id: &str,
        reply_id: &str,
        conversation_id: &str,
        reply_text: &str,
    ) -> Result<(), MurmurError> {
        self.write(messages::record_own_reply(
            &self.db,
            &self.agent,
            original_id,
            reply_id,
            conversation_id,
            reply_text,
        ))
        .await
    }

    /// Closes a message when the reply row could not be recorded.
    pub async fn mark_answered(
        &self,
        message_id: &str,
        reply_id: Option<&str>,
    ) -> Result<(), MurmurError> {
        self.write(messages::mark_answered(&self.db, message_id, reply_id))
            .await
    }

    pub async fn record_attempt(&self, message_id: &str) -> Result<(), MurmurError> {
        self.write(messages::record_attempt(&self.db, message_id))
            .await
    }

    pub async fn get_message(&self, id: &str) -> Result<Option<Message>, MurmurError> {
        self.read(messages::get_message(&self.db, id)).await
    }

    pub async fn get_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<Message>, MurmurError> {
        self.read(messages::get_conversation(&self.db, conversation_id))
            .await
    }

    pub async fn conversations(
        &self,
        conversation_ids: &[String],
    ) -> Result<BTreeMap<String, Vec<Message>>, MurmurError> {
        self.read(messages::get_conversations(&self.db, conversation_ids))
            .await
    }

    pub async fn get_by_category(&self, category: Category) -> Result<Vec<Message>, MurmurError> {
        self.read(messages::get_by_category(&self.db, category))
            .await
    }

    /// Messages that may need a reply from `agent_id`.
    pub async fn candidate_messages(&self, agent_id: &str) -> Result<Vec<Message>, MurmurError> {
        self.read(candidates::candidate_messages(&self.db, agent_id))
            .await
    }

    pub async fn stats(&self) -> Result<StoreStats, MurmurError> {
        self.read(messages::stats(&self.db)).await
    }

    pub async fn load_cursor(&self, name: &str) -> Result<Option<String>, MurmurError> {
        self.read(cursors::load_cursor(&self.db, name)).await
    }

    pub async fn save_cursor(&self, name: &str, value: &str) -> Result<(), MurmurError> {
        self.write(cursors::save_cursor(&self.db, name, value)).await
    }

    pub async fn clear_cursor(&self, name: &str) -> Result<(), MurmurError> {
        self.write(cursors::clear_cursor(&self.db, name)).await
    }

    /// Checkpoints the WAL and closes the database.
    pub async fn close(self) -> Result<(), MurmurError> {
        self.db.close().await
    }
}

#[async_trait]
impl PluginAdapter for ConversationStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, MurmurError> {
        self.read(async {
            self.db
                .connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("SELECT 1;")?;
                    Ok(())
                })
                .await
                .map_err(map_tr_err)
        })
        .await?;
        Ok(HealthStatus::Healthy)
    }

    /// Flushes the WAL; the connection stays usable until [`close`](Self::close).
    async fn shutdown(&self) -> Result<(), MurmurError> {
        self.write(async {
            self.db
                .connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(map_tr_err)
        })
        .await
    }
}
