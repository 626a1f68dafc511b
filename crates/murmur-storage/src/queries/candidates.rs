// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Indexed prefilter for reply candidates.
//!
//! Narrows the table to messages that may need a reply. The eligibility
//! engine re-checks each candidate against its full conversation, so this
//! query may over-select but must never miss a message.

use murmur_core::{Message, MurmurError};
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::queries::messages::{COLUMNS, row_to_message};

/// Open messages not authored by `agent_id` that are fresh mentions or
/// conversation replies, or sit in a conversation the agent takes part in
/// with unread replies or activity after the agent's last reply.
pub async fn candidate_messages(db: &Database, agent_id: &str) -> Result<Vec<Message>, MurmurError> {
    let agent_id = agent_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Message>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM messages m
                 WHERE m.needs_reply = 1
                   AND m.author_id != ?1
                   AND (
                     (m.category IN ('mention', 'conversation') AND m.replied_to = 0)
                     OR (
                       EXISTS (SELECT 1 FROM messages p
                               WHERE p.conversation_id = m.conversation_id AND p.is_participating = 1)
                       AND (
                         m.unread_replies > 0
                         OR m.created_at > COALESCE(
                              (SELECT MAX(r.last_reply_time) FROM messages r
                               WHERE r.conversation_id = m.conversation_id), '')
                       )
                     )
                   )
                 ORDER BY m.created_at ASC, m.id ASC"
            ))?;
            let rows = stmt.query_map(params![agent_id], row_to_message)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
