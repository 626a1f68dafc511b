// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text generator trait for language-model backends.

use async_trait::async_trait;

use crate::error::MurmurError;
use crate::traits::adapter::PluginAdapter;
use crate::types::GenerationRequest;

/// Produces reply text for a prompt.
#[async_trait]
pub trait TextGenerator: PluginAdapter {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, MurmurError>;
}
