// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion, eligibility and reply dispatch for Murmur.
//!
//! [`IngestionPipeline`] pulls mentions into the conversation store,
//! [`EligibilityEngine`] decides which threads need an answer, and
//! [`ReplyDispatcher`] generates and posts replies under a token bucket.
//! [`ReplyAgent`] runs ingestion and dispatch as two interval loops.

pub mod dispatcher;
pub mod eligibility;
pub mod ingestion;
pub mod prompt;
pub mod rate_limit;
pub mod retry;
pub mod runner;
pub mod shutdown;

pub use dispatcher::{
    BatchConfig, DispatchPhase, DispatchReport, GenerationSettings, ReplyDispatcher,
};
pub use eligibility::{ConversationThread, EligibilityEngine, ThreadView, is_actionable};
pub use ingestion::{
    IngestReport, IngestionPipeline, IngestionSettings, MENTIONS_CURSOR, MENTIONS_PENDING_CURSOR,
    MENTIONS_RESUME_CURSOR,
};
pub use rate_limit::TokenBucket;
pub use retry::RetryPolicy;
pub use runner::ReplyAgent;
