// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for an OpenAI-compatible Chat Completions API.
//!
//! Provides [`OpenAiClient`] which handles bearer authentication, request
//! construction, and a single retry on transient errors.

use std::time::Duration;

use murmur_core::MurmurError;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, ChatRequest, ChatResponse};

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl OpenAiClient {
    /// Creates a client for `{base_url}/chat/completions`.
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, MurmurError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| MurmurError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| MurmurError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: 1,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Shortens the retry delay (for tests).
    #[cfg(test)]
    pub(crate) fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Sends a completion request.
    ///
    /// On transient errors (429, 500, 503), retries once after a short delay.
    pub async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, MurmurError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying completion request after transient error");
                tokio::time::sleep(self.retry_delay).await;
            }

            let response = self
                .client
                .post(self.endpoint())
                .json(request)
                .send()
                .await
                .map_err(|e| MurmurError::Provider {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "completion response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| MurmurError::Provider {
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                })?;
                return serde_json::from_str(&body).map_err(|e| MurmurError::Provider {
                    message: format!("failed to parse API response: {e}"),
                    source: Some(Box::new(e)),
                });
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(MurmurError::Provider {
                    message: format!("API returned {status}: {body}"),
                    source: None,
                });
                continue;
            }

            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => format!(
                    "OpenAI API error {status} ({}): {}",
                    api_err.error.type_.as_deref().unwrap_or("unknown"),
                    api_err.error.message
                ),
                Err(_) => format!("API returned {status}: {body}"),
            };
            return Err(MurmurError::Provider {
                message,
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| MurmurError::Provider {
            message: "completion request failed after retries".into(),
            source: None,
        }))
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> OpenAiClient {
        OpenAiClient::new("sk-test", base_url, Duration::from_secs(5))
            .unwrap()
            .with_retry_delay(Duration::from_millis(10))
    }

    fn request() -> ChatRequest {
        ChatRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![ChatMessage::user("Hello")],
            max_tokens: 140,
            temperature: 0.7,
        }
    }

    fn completion(text: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": text},
                "finish_reason": "stop"
            }]
        })
    }

    #[tokio::test]
    async fn complete_sends_bearer_and_parses_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Hi there!")))
            .mount(&server)
            .await;

        let response = test_client(&server.uri()).complete(&request()).await.unwrap();
        assert_eq!(response.first_text(), Some("Hi there!"));
    }

    #[tokio::test]
    async fn complete_retries_once_on_503() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("After retry")))
            .mount(&server)
            .await;

        let response = test_client(&server.uri()).complete(&request()).await.unwrap();
        assert_eq!(response.first_text(), Some("After retry"));
    }

    #[tokio::test]
    async fn complete_reports_api_error_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"message": "bad model", "type": "invalid_request_error"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server.uri()).complete(&request()).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("invalid_request_error"), "got: {msg}");
        assert!(msg.contains("bad model"), "got: {msg}");
    }
}
