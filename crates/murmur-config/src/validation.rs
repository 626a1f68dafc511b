// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Collects every violated constraint instead of failing on the first one.

use crate::diagnostic::ConfigError;
use crate::model::{MAX_INGESTION_INTERVAL_SECS, MIN_INGESTION_INTERVAL_SECS, MurmurConfig};

/// Validate a deserialized configuration for semantic correctness.
///
/// Credentials are not checked here; `serve` verifies them before building
/// adapters so `status` and `config check` work without secrets.
pub fn validate_config(config: &MurmurConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.agent.name.trim().is_empty() {
        fail("agent.name must not be empty".into());
    }
    if config.agent.username.trim().is_empty() {
        fail("agent.username must not be empty".into());
    }
    if let Some(id) = &config.agent.account_id
        && id.trim().is_empty()
    {
        fail("agent.account_id must not be empty when set".into());
    }

    if !(5..=100).contains(&config.twitter.page_size) {
        fail(format!(
            "twitter.page_size must be between 5 and 100, got {}",
            config.twitter.page_size
        ));
    }
    if config.twitter.base_url.trim().is_empty() {
        fail("twitter.base_url must not be empty".into());
    }

    if !(0.0..=2.0).contains(&config.openai.temperature) {
        fail(format!(
            "openai.temperature must be between 0.0 and 2.0, got {}",
            config.openai.temperature
        ));
    }
    if config.openai.max_length == 0 {
        fail("openai.max_length must be positive".into());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".into());
    }
    if config.storage.timeout_secs == 0 {
        fail("storage.timeout_secs must be positive".into());
    }

    let interval = config.ingestion.interval_secs;
    if !(MIN_INGESTION_INTERVAL_SECS..=MAX_INGESTION_INTERVAL_SECS).contains(&interval) {
        fail(format!(
            "ingestion.interval_secs must be between {MIN_INGESTION_INTERVAL_SECS} and \
             {MAX_INGESTION_INTERVAL_SECS}, got {interval}"
        ));
    }
    if config.ingestion.max_pages == 0 {
        fail("ingestion.max_pages must be at least 1".into());
    }

    let d = &config.dispatch;
    for (key, value) in [
        ("dispatch.interval_secs", d.interval_secs),
        ("dispatch.window_secs", d.window_secs),
        ("dispatch.request_timeout_secs", d.request_timeout_secs),
        ("dispatch.batch_size", d.batch_size as u64),
        ("dispatch.posts_per_window", u64::from(d.posts_per_window)),
        ("dispatch.burst", u64::from(d.burst)),
    ] {
        if value == 0 {
            fail(format!("{key} must be positive"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
