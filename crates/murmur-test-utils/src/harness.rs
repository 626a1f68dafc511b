// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` opens a conversation store in a temp directory and pairs
//! it with a [`MockTransport`] and a [`MockGenerator`] authenticated as the
//! same agent account.

use std::sync::Arc;
use std::time::Duration;

use murmur_core::{AgentIdentity, MurmurError};
use murmur_storage::{ConversationStore, Database};

use crate::mock_generator::MockGenerator;
use crate::mock_transport::MockTransport;

/// Account id the harness agent posts as.
pub const AGENT_ID: &str = "1000";

pub fn agent_identity() -> AgentIdentity {
    AgentIdentity {
        account_id: AGENT_ID.to_string(),
        name: "Murmur".to_string(),
        username: "murmur".to_string(),
    }
}

/// A conversation store plus mock adapters, cleaned up on drop.
pub struct TestHarness {
    pub store: Arc<ConversationStore>,
    pub transport: Arc<MockTransport>,
    pub generator: Arc<MockGenerator>,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub async fn new() -> Result<Self, MurmurError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| MurmurError::Storage {
            source: Box::new(e),
        })?;
        let db_path = temp_dir.path().join("murmur-test.db");
        let db = Database::open(&db_path.to_string_lossy()).await?;
        let store = ConversationStore::new(db, agent_identity(), Duration::from_secs(30));

        Ok(Self {
            store: Arc::new(store),
            transport: Arc::new(MockTransport::new(AGENT_ID)),
            generator: Arc::new(MockGenerator::new()),
            _temp_dir: temp_dir,
        })
    }

    pub fn agent_id(&self) -> &str {
        AGENT_ID
    }
}
