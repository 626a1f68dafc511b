// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded waits for external calls.

use std::future::Future;
use std::time::Duration;

use crate::error::MurmurError;

/// Runs `fut` with an upper bound, mapping expiry to [`MurmurError::Timeout`].
pub async fn with_deadline<T, F>(duration: Duration, fut: F) -> Result<T, MurmurError>
where
    F: Future<Output = Result<T, MurmurError>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(MurmurError::Timeout { duration }),
    }
}
