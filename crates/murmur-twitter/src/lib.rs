// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Twitter API v2 transport adapter for the Murmur reply engine.
//!
//! This crate implements [`TransportAdapter`] over the v2 REST API with
//! OAuth 1.0a user-context signing.

pub mod client;
pub mod oauth;
pub mod types;

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use murmur_config::model::TwitterConfig;
use murmur_core::{
    AdapterType, HealthStatus, InboundMessage, MentionsPage, MentionsQuery, MurmurError,
    PluginAdapter, PostReplyRequest, PostedReply, TransportAdapter,
};
use tracing::{debug, info, warn};

use crate::client::TwitterClient;
use crate::oauth::OAuthCredentials;

/// Twitter transport implementing [`TransportAdapter`].
///
/// The authenticated account id is taken from configuration when present,
/// otherwise resolved once through `GET /users/me` and cached.
pub struct TwitterTransport {
    client: TwitterClient,
    account_id: OnceLock<String>,
}

impl TwitterTransport {
    /// Creates a transport from the `[twitter]` section.
    ///
    /// All four OAuth credentials must be set.
    pub fn new(
        config: &TwitterConfig,
        account_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self, MurmurError> {
        let credentials = credentials_from(config)?;
        let client = TwitterClient::new(credentials, timeout)?.with_base_url(&config.base_url);
        info!(base_url = client.base_url(), "Twitter transport initialized");
        Ok(Self::with_client(client, account_id))
    }

    pub fn with_client(client: TwitterClient, account_id: Option<String>) -> Self {
        let cell = OnceLock::new();
        if let Some(id) = account_id.filter(|id| !id.is_empty()) {
            let _ = cell.set(id);
        }
        Self {
            client,
            account_id: cell,
        }
    }
}

fn credentials_from(config: &TwitterConfig) -> Result<OAuthCredentials, MurmurError> {
    let field = |value: &Option<String>, name: &str| {
        value
            .clone()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| MurmurError::Config(format!("twitter.{name} is not set")))
    };
    Ok(OAuthCredentials {
        consumer_key: field(&config.consumer_key, "consumer_key")?,
        consumer_secret: field(&config.consumer_secret, "consumer_secret")?,
        access_token: field(&config.access_token, "access_token")?,
        access_token_secret: field(&config.access_token_secret, "access_token_secret")?,
    })
}

#[async_trait]
impl PluginAdapter for TwitterTransport {
    fn name(&self) -> &str {
        "twitter"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, MurmurError> {
        match self.client.me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) if e.is_rate_limit() => Ok(HealthStatus::Degraded(e.to_string())),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), MurmurError> {
        Ok(())
    }
}

#[async_trait]
impl TransportAdapter for TwitterTransport {
    async fn fetch_mentions(&self, query: &MentionsQuery) -> Result<MentionsPage, MurmurError> {
        let user_id = self.authenticated_account_id().await?;
        self.client
            .mentions(
                &user_id,
                query.since_id.as_deref(),
                query.cursor.as_deref(),
                query.page_size,
            )
            .await
    }

    async fn authenticated_account_id(&self) -> Result<String, MurmurError> {
        if let Some(id) = self.account_id.get() {
            return Ok(id.clone());
        }
        let id = self.client.me().await?;
        debug!(account_id = %id, "resolved authenticated account");
        Ok(self.account_id.get_or_init(|| id).clone())
    }

    async fn post_reply(&self, request: &PostReplyRequest) -> Result<PostedReply, MurmurError> {
        let conversation_id = match request.conversation_id.clone().filter(|c| !c.is_empty()) {
            Some(id) => Some(id),
            None => match self.client.tweet(&request.reply_to_id).await {
                Ok(parent) => parent.and_then(|p| p.conversation_id),
                Err(e) if e.is_rate_limit() => return Err(e),
                Err(e) => {
                    warn!(
                        message_id = %request.reply_to_id,
                        error = %e,
                        "could not recover conversation id for reply"
                    );
                    None
                }
            },
        };

        let created = self
            .client
            .create_reply(&request.text, &request.reply_to_id)
            .await?;
        debug!(reply_id = %created.id, message_id = %request.reply_to_id, "reply created");
        Ok(PostedReply {
            id: created.id,
            conversation_id,
        })
    }

    async fn get_message(&self, id: &str) -> Result<Option<InboundMessage>, MurmurError> {
        self.client.tweet(id).await
    }
}
