// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mention ingestion.
//!
//! Each cycle pulls mentions newer than the persisted cursor, classifies
//! them, and upserts them into the conversation store. A message that fails
//! to persist keeps the cursor where it was so the next cycle refetches it.
//!
//! Pages arrive newest first. When a backlog is deeper than `max_pages`, the
//! continuation token and the newest id seen are persisted and the next cycle
//! resumes from the token; the `since_id` cursor only advances once the
//! backlog has been drained.

use std::sync::Arc;
use std::time::Duration;

use murmur_core::classifier;
use murmur_core::{
    InboundMessage, MentionsPage, MentionsQuery, MurmurError, TransportAdapter, UserProfile,
    compare_ids, with_deadline,
};
use murmur_storage::ConversationStore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Cursor name for the mentions timeline.
pub const MENTIONS_CURSOR: &str = "mentions_since_id";

/// Continuation token of a backlog cut short by the page limit.
pub const MENTIONS_RESUME_CURSOR: &str = "mentions_resume_token";

/// Newest id seen while a backlog is being drained.
pub const MENTIONS_PENDING_CURSOR: &str = "mentions_pending_since_id";

/// Counts for one ingestion cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub fetched: usize,
    pub stored: usize,
    pub rejected: usize,
    pub failed: usize,
    /// The page limit was reached with older mentions still to fetch.
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct IngestionSettings {
    pub page_size: u32,
    pub max_pages: u32,
    pub request_timeout: Duration,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_pages: 5,
            request_timeout: Duration::from_secs(30),
        }
    }
}

pub struct IngestionPipeline {
    store: Arc<ConversationStore>,
    transport: Arc<dyn TransportAdapter>,
    settings: IngestionSettings,
}

fn newer_id<'a>(a: &'a str, b: &'a str) -> &'a str {
    match compare_ids(a, b) {
        std::cmp::Ordering::Less => b,
        _ => a,
    }
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<ConversationStore>,
        transport: Arc<dyn TransportAdapter>,
        settings: IngestionSettings,
    ) -> Self {
        Self {
            store,
            transport,
            settings,
        }
    }

    /// Fetches and stores one round of mentions.
    ///
    /// Transport and cursor errors end the cycle with `Err`; per-message
    /// failures are counted in the report.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> Result<IngestReport, MurmurError> {
        let since_id = self.store.load_cursor(MENTIONS_CURSOR).await?;
        let resume = self.store.load_cursor(MENTIONS_RESUME_CURSOR).await?;
        let pending = self.store.load_cursor(MENTIONS_PENDING_CURSOR).await?;
        if let Some(token) = resume.as_deref() {
            debug!(token, "resuming mentions backlog");
        }

        let mut report = IngestReport::default();
        let mut newest = pending.clone();
        let mut complete = true;
        let mut cursor = resume.clone();

        for page_no in 0..self.settings.max_pages {
            let query = MentionsQuery {
                since_id: since_id.clone(),
                cursor: cursor.take(),
                page_size: self.settings.page_size,
            };
            let page = with_deadline(
                self.settings.request_timeout,
                self.transport.fetch_mentions(&query),
            )
            .await?;
            debug!(page = page_no, count = page.messages.len(), "mentions page fetched");

            if let Some(id) = page.newest_id.as_deref().or_else(|| {
                page.messages
                    .iter()
                    .map(|m| m.id.as_str())
                    .reduce(newer_id)
            }) {
                newest = Some(match newest.as_deref() {
                    Some(current) => newer_id(current, id).to_string(),
                    None => id.to_string(),
                });
            }

            if !self.store_page(&page, cancel, &mut report).await {
                complete = false;
                break;
            }

            match page.next_cursor {
                Some(next) if !page.messages.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        if !complete || report.failed > 0 {
            warn!(
                failed = report.failed,
                cancelled = !complete,
                "mentions cursor held back; messages will be refetched"
            );
        } else if let Some(next) = cursor {
            report.truncated = true;
            self.store.save_cursor(MENTIONS_RESUME_CURSOR, &next).await?;
            if let Some(newest) = newest.as_deref() {
                self.store.save_cursor(MENTIONS_PENDING_CURSOR, newest).await?;
            }
            warn!(
                max_pages = self.settings.max_pages,
                fetched = report.fetched,
                "mentions backlog exceeds page limit; resuming next cycle"
            );
        } else {
            if let Some(newest) = newest
                && since_id.as_deref() != Some(newest.as_str())
            {
                self.store.save_cursor(MENTIONS_CURSOR, &newest).await?;
                debug!(cursor = %newest, "mentions cursor advanced");
            }
            if resume.is_some() {
                self.store.clear_cursor(MENTIONS_RESUME_CURSOR).await?;
            }
            if pending.is_some() {
                self.store.clear_cursor(MENTIONS_PENDING_CURSOR).await?;
            }
        }

        if report.fetched > 0 {
            info!(
                fetched = report.fetched,
                stored = report.stored,
                rejected = report.rejected,
                failed = report.failed,
                truncated = report.truncated,
                "ingestion cycle complete"
            );
        }
        Ok(report)
    }

    /// Stores every message in `page`. Returns false if cancelled midway.
    async fn store_page(
        &self,
        page: &MentionsPage,
        cancel: &CancellationToken,
        report: &mut IngestReport,
    ) -> bool {
        for message in &page.messages {
            if cancel.is_cancelled() {
                return false;
            }
            report.fetched += 1;

            if let Err(e) = classifier::validate(message) {
                warn!(message_id = %message.id, error = %e, "rejected malformed mention");
                report.rejected += 1;
                continue;
            }

            match self.ingest_one(message, page.author(&message.author_id)).await {
                Ok(()) => report.stored += 1,
                Err(e) => {
                    error!(
                        message_id = %message.id,
                        conversation_id = %message.resolved_conversation_id(),
                        error = %e,
                        "failed to store mention"
                    );
                    report.failed += 1;
                }
            }
        }
        true
    }

    /// Classifies and upserts one message, retrying the upsert once.
    async fn ingest_one(
        &self,
        message: &InboundMessage,
        author: Option<&UserProfile>,
    ) -> Result<(), MurmurError> {
        let category = classifier::classify(message);
        match self.store.upsert_message(message, category, author).await {
            Ok(_) => Ok(()),
            Err(first) => {
                warn!(
                    message_id = %message.id,
                    error = %first,
                    "upsert failed, retrying once"
                );
                self.store
                    .upsert_message(message, category, author)
                    .await
                    .map(|_| ())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_id_compares_numerically() {
        assert_eq!(newer_id("99", "100"), "100");
        assert_eq!(newer_id("205", "201"), "205");
        assert_eq!(newer_id("7", "7"), "7");
    }
}
