// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Murmur reply engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Murmur configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MurmurConfig {
    /// Agent identity settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Twitter API v2 credentials and endpoints.
    #[serde(default)]
    pub twitter: TwitterConfig,

    /// OpenAI-compatible text generation settings.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Mention polling settings.
    #[serde(default)]
    pub ingestion: IngestionConfig,

    /// Reply dispatch, batching and rate limit settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

/// Agent identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name recorded on the agent's own replies.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Handle recorded on the agent's own replies.
    #[serde(default = "default_agent_username")]
    pub username: String,

    /// Platform account id. When unset it is resolved from the transport at startup.
    #[serde(default)]
    pub account_id: Option<String>,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            username: default_agent_username(),
            account_id: None,
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "murmur".to_string()
}

fn default_agent_username() -> String {
    "murmur".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Twitter API v2 configuration (OAuth 1.0a user context).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TwitterConfig {
    #[serde(default)]
    pub consumer_key: Option<String>,

    #[serde(default)]
    pub consumer_secret: Option<String>,

    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub access_token_secret: Option<String>,

    /// API base URL, overridable for proxies and tests.
    #[serde(default = "default_twitter_base_url")]
    pub base_url: String,

    /// Mentions requested per page (platform bounds: 5..=100).
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            consumer_key: None,
            consumer_secret: None,
            access_token: None,
            access_token_secret: None,
            base_url: default_twitter_base_url(),
            page_size: default_page_size(),
        }
    }
}

impl TwitterConfig {
    /// Returns true when all four OAuth credentials are present.
    pub fn has_credentials(&self) -> bool {
        [
            &self.consumer_key,
            &self.consumer_secret,
            &self.access_token,
            &self.access_token_secret,
        ]
        .iter()
        .all(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

fn default_twitter_base_url() -> String {
    "https://api.twitter.com/2".to_string()
}

fn default_page_size() -> u32 {
    100
}

/// OpenAI-compatible chat completion configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiConfig {
    /// API key. `None` requires the `OPENAI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on reply length in characters.
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_length: default_max_length(),
        }
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_length() -> usize {
    280
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// Upper bound for a single store operation.
    #[serde(default = "default_storage_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            timeout_secs: default_storage_timeout_secs(),
        }
    }
}

impl StorageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("murmur").join("murmur.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("murmur.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

fn default_storage_timeout_secs() -> u64 {
    30
}

/// Smallest polling interval the platform tolerates for mention reads.
pub const MIN_INGESTION_INTERVAL_SECS: u64 = 30;

/// Largest polling interval before mentions feel unanswered.
pub const MAX_INGESTION_INTERVAL_SECS: u64 = 300;

/// Mention polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IngestionConfig {
    #[serde(default = "default_ingestion_interval_secs")]
    pub interval_secs: u64,

    /// Pages followed per cycle when the platform reports more results.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_ingestion_interval_secs(),
            max_pages: default_max_pages(),
        }
    }
}

impl IngestionConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_ingestion_interval_secs() -> u64 {
    30
}

fn default_max_pages() -> u32 {
    5
}

/// Reply dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Pause between dispatch cycles.
    #[serde(default = "default_dispatch_interval_secs")]
    pub interval_secs: u64,

    /// Threads handled per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_batch_delay_secs")]
    pub batch_delay_secs: u64,

    /// Retries after the first failed attempt of a generate or post call.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Posts allowed per rate window.
    #[serde(default = "default_posts_per_window")]
    pub posts_per_window: u32,

    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Token bucket capacity.
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Pause applied when the platform reports a rate limit.
    #[serde(default = "default_rate_limit_cooldown_secs")]
    pub rate_limit_cooldown_secs: u64,

    /// Upper bound for a single transport or generator call.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_dispatch_interval_secs(),
            batch_size: default_batch_size(),
            batch_delay_secs: default_batch_delay_secs(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            posts_per_window: default_posts_per_window(),
            window_secs: default_window_secs(),
            burst: default_burst(),
            rate_limit_cooldown_secs: default_rate_limit_cooldown_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl DispatchConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_dispatch_interval_secs() -> u64 {
    60
}

fn default_batch_size() -> usize {
    10
}

fn default_batch_delay_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    60
}

fn default_posts_per_window() -> u32 {
    45
}

fn default_window_secs() -> u64 {
    15 * 60
}

fn default_burst() -> u32 {
    1
}

fn default_rate_limit_cooldown_secs() -> u64 {
    5 * 60
}

fn default_request_timeout_secs() -> u64 {
    30
}
