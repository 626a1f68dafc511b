// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible text generator for the Murmur reply engine.
//!
//! This crate implements [`TextGenerator`] over the Chat Completions API.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use murmur_config::MurmurConfig;
use murmur_core::{
    AdapterType, GenerationRequest, HealthStatus, MurmurError, PluginAdapter, TextGenerator,
};
use tracing::{debug, info};

use crate::client::OpenAiClient;
use crate::types::{ChatMessage, ChatRequest};

/// Chat-completion generator implementing [`TextGenerator`].
///
/// API key resolution order: config -> `OPENAI_API_KEY` env var -> error.
pub struct OpenAiGenerator {
    client: OpenAiClient,
    model: String,
    system_prompt: String,
}

impl OpenAiGenerator {
    pub fn new(config: &MurmurConfig) -> Result<Self, MurmurError> {
        let api_key = resolve_api_key(&config.openai.api_key)?;
        let client = OpenAiClient::new(
            &api_key,
            &config.openai.base_url,
            config.dispatch.request_timeout(),
        )?;
        info!(model = %config.openai.model, "OpenAI generator initialized");
        Ok(Self::with_client(
            client,
            config.openai.model.clone(),
            default_system_prompt(&config.agent.name, &config.agent.username),
        ))
    }

    pub fn with_client(client: OpenAiClient, model: String, system_prompt: String) -> Self {
        Self {
            client,
            model,
            system_prompt,
        }
    }

    fn to_chat_request(&self, request: &GenerationRequest) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(self.system_prompt.clone()),
                ChatMessage::user(request.prompt.clone()),
            ],
            max_tokens: max_tokens_for(request.max_length),
            temperature: request.temperature,
        }
    }
}

/// Token budget for a reply of at most `max_length` characters.
fn max_tokens_for(max_length: usize) -> u32 {
    u32::try_from(max_length.div_ceil(2)).unwrap_or(u32::MAX).max(16)
}

fn default_system_prompt(name: &str, username: &str) -> String {
    format!(
        "You are {name} (@{username}), replying to people on Twitter. \
         Answer the latest message directly, stay friendly and concise, \
         and never include hashtags unless asked."
    )
}

fn resolve_api_key(config_key: &Option<String>) -> Result<String, MurmurError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    std::env::var("OPENAI_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            MurmurError::Config(
                "OpenAI API key not found. Set openai.api_key in config or OPENAI_API_KEY environment variable.".into(),
            )
        })
}

#[async_trait]
impl PluginAdapter for OpenAiGenerator {
    fn name(&self) -> &str {
        "openai"
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
        debug!("OpenAI generator shutting down");
        Ok(())
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, MurmurError> {
        let chat = self.to_chat_request(request);
        let response = self.client.complete(&chat).await?;
        match response.first_text() {
            Some(text) => Ok(text.trim().to_string()),
            None => Err(MurmurError::Provider {
                message: format!(
                    "empty completion (finish_reason: {})",
                    response
                        .choices
                        .first()
                        .and_then(|c| c.finish_reason.as_deref())
                        .unwrap_or("none")
                ),
                source: None,
            }),
        }
    }
}
