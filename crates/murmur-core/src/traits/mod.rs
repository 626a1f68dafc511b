// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability traits the engine depends on.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod generator;
pub mod transport;

pub use adapter::PluginAdapter;
pub use generator::TextGenerator;
pub use transport::{MentionsQuery, TransportAdapter};
