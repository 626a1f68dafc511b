// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `murmur status` command implementation.
//!
//! Opens the conversation store and prints message counts and the
//! ingestion cursor. Safe to run next to a live `murmur serve`.

use std::collections::BTreeMap;

use murmur_agent::MENTIONS_CURSOR;
use murmur_config::MurmurConfig;
use murmur_core::{AgentIdentity, MurmurError};
use murmur_storage::ConversationStore;
use serde::Serialize;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub database_path: String,
    pub total_messages: i64,
    pub awaiting_reply: i64,
    pub participating_conversations: i64,
    pub by_category: BTreeMap<String, i64>,
    pub mentions_cursor: Option<String>,
}

impl StatusResponse {
    fn render(&self) -> String {
        let mut out = format!(
            "database:       {}\nmessages:       {}\nawaiting reply: {}\nconversations:  {} participating\ncursor:         {}\n",
            self.database_path,
            self.total_messages,
            self.awaiting_reply,
            self.participating_conversations,
            self.mentions_cursor.as_deref().unwrap_or("(none)"),
        );
        for (category, count) in &self.by_category {
            out.push_str(&format!("  {category:<14}{count}\n"));
        }
        out
    }
}

pub async fn collect_status(config: &MurmurConfig) -> Result<StatusResponse, MurmurError> {
    let identity = AgentIdentity {
        account_id: config.agent.account_id.clone().unwrap_or_default(),
        name: config.agent.name.clone(),
        username: config.agent.username.clone(),
    };
    let store = ConversationStore::open(&config.storage, identity).await?;
    let stats = store.stats().await?;
    let cursor = store.load_cursor(MENTIONS_CURSOR).await?;
    store.close().await?;

    Ok(StatusResponse {
        database_path: config.storage.database_path.clone(),
        total_messages: stats.total,
        awaiting_reply: stats.needs_reply,
        participating_conversations: stats.participating_conversations,
        by_category: stats.by_category,
        mentions_cursor: cursor,
    })
}

/// Run the `murmur status` command.
pub async fn run_status(config: &MurmurConfig, json: bool) -> Result<(), MurmurError> {
    let status = collect_status(config).await?;
    if json {
        let rendered = serde_json::to_string_pretty(&status)
            .map_err(|e| MurmurError::Internal(format!("failed to encode status: {e}")))?;
        println!("{rendered}");
    } else {
        print!("{}", status.render());
    }
    Ok(())
}
