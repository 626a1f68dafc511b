// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Murmur integration tests.
//!
//! Provides mock adapters and a store harness for fast, deterministic,
//! CI-runnable tests without network access.
//!
//! # Components
//!
//! - [`MockTransport`] - Scripted mention pages with captured replies
//! - [`MockGenerator`] - Text generator with pre-configured responses
//! - [`TestHarness`] - Temp SQLite conversation store wired to both mocks

pub mod fixtures;
pub mod harness;
pub mod mock_generator;
pub mod mock_transport;

pub use harness::TestHarness;
pub use mock_generator::MockGenerator;
pub use mock_transport::MockTransport;
