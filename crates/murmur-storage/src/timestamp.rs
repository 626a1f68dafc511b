// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timestamp encoding for TEXT columns.
//!
//! Fixed-width RFC 3339 with milliseconds and a `Z` suffix, so SQL string
//! comparison orders rows chronologically.

use chrono::{DateTime, SecondsFormat, Utc};

pub fn encode(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn decode(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|ts| ts.with_timezone(&Utc))
}

pub fn now() -> String {
    encode(&Utc::now())
}
