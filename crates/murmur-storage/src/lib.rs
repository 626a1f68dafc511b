// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Murmur reply engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and the [`ConversationStore`] that
//! owns every mutation of conversation state.

pub mod database;
pub mod migrations;
pub mod queries;
pub mod store;
mod timestamp;

pub use database::Database;
pub use queries::messages::{StoreStats, UpsertOutcome};
pub use store::ConversationStore;
