// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Murmur reply engine.
//!
//! This crate provides the error type, the shared message types, the tweet
//! classifier, and the capability traits that transport and text-generation
//! adapters implement.

pub mod classifier;
pub mod deadline;
pub mod error;
pub mod traits;
pub mod types;

pub use deadline::with_deadline;
pub use error::MurmurError;
pub use types::{
    AdapterType, AgentIdentity, Category, ConversationRef, GenerationRequest, HealthStatus,
    InboundMessage, MentionsPage, Message, PostReplyRequest, PostedReply, ReferenceKind,
    ReferencedMessage, ReplyStatus, UserProfile, compare_ids,
};

pub use traits::{MentionsQuery, PluginAdapter, TextGenerator, TransportAdapter};
