// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Murmur reply engine.

use std::time::Duration;

use thiserror::Error;

/// Message fragments that identify a platform rate-limit response when no
/// structured status code is available.
const RATE_LIMIT_FRAGMENTS: &[&str] = &[
    "rate limit exceeded",
    "too many requests",
    "429 too many requests",
    "rate_limit_exceeded",
    "x-rate-limit-remaining: 0",
    "x-rate-limit-reset",
];

/// The primary error type used across all Murmur adapter traits and core operations.
#[derive(Debug, Error)]
pub enum MurmurError {
    /// Configuration errors (invalid TOML, missing credentials, bad limits).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Social platform transport errors (HTTP failure, unexpected payload).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        status: Option<u16>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The platform refused the request because a rate limit was hit.
    #[error("rate limited by platform (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// Language-model provider errors (API failure, empty completion).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An inbound message failed structural validation.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A referenced message does not exist in the store.
    #[error("message not found: {id}")]
    NotFound { id: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// The surrounding task was cancelled while waiting.
    #[error("operation cancelled")]
    Cancelled,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MurmurError {
    /// Builds a storage error from anything printable, for failures that do not
    /// carry a typed source (closed connections, driver wrappers).
    pub fn storage_message(message: impl Into<String>) -> Self {
        MurmurError::Storage {
            source: message.into().into(),
        }
    }

    /// Returns true when this error signals a platform rate limit.
    ///
    /// Structured variants are checked first; transport and provider messages
    /// are scanned for known rate-limit fragments as a fallback.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            MurmurError::RateLimited { .. } => true,
            MurmurError::Transport {
                status: Some(429), ..
            } => true,
            MurmurError::Transport { message, .. } | MurmurError::Provider { message, .. } => {
                is_rate_limit_message(message)
            }
            _ => false,
        }
    }

    /// Returns true when retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            MurmurError::Timeout { .. } | MurmurError::Storage { .. } => true,
            MurmurError::Transport { status, .. } => match status {
                Some(code) => *code >= 500,
                None => true,
            },
            MurmurError::Provider { .. } => true,
            _ => false,
        }
    }
}

/// Checks free-form error text for rate-limit indicators.
pub fn is_rate_limit_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    RATE_LIMIT_FRAGMENTS
        .iter()
        .any(|fragment| lower.contains(fragment))
}
