// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock text generator for deterministic testing.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use murmur_core::{
    AdapterType, GenerationRequest, HealthStatus, MurmurError, PluginAdapter, TextGenerator,
};

/// A text generator that returns pre-configured responses.
///
/// Responses are popped from a FIFO queue. When the queue is empty,
/// a default "mock reply" text is returned. Every prompt is recorded.
pub struct MockGenerator {
    responses: Arc<Mutex<VecDeque<Result<String, MurmurError>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a generator pre-loaded with the given responses.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into_iter().map(Ok).collect())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn add_response(&self, text: impl Into<String>) {
        self.responses.lock().await.push_back(Ok(text.into()));
    }

    pub async fn add_error(&self, err: MurmurError) {
        self.responses.lock().await.push_back(Err(err));
    }

    /// Prompts received so far, oldest first.
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockGenerator {
    fn name(&self) -> &str {
        "mock-generator"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Generator
    }

    async fn health_check(&self) -> Result<HealthStatus, MurmurError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MurmurError> {
        Ok(())
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, MurmurError> {
        self.prompts.lock().await.push(request.prompt.clone());
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok("mock reply".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerationRequest {
        GenerationRequest {
            prompt: "say hi".into(),
            max_length: 280,
            temperature: 0.7,
        }
    }

    #[tokio::test]
    async fn responses_pop_in_order_then_default() {
        let generator = MockGenerator::with_responses(vec!["one".into(), "two".into()]);
        assert_eq!(generator.generate(&request()).await.unwrap(), "one");
        assert_eq!(generator.generate(&request()).await.unwrap(), "two");
        assert_eq!(generator.generate(&request()).await.unwrap(), "mock reply");
        assert_eq!(generator.prompts().await.len(), 3);
    }
}
