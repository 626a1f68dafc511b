// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Twitter API v2.
//!
//! Provides [`TwitterClient`] which signs every request with OAuth 1.0a,
//! decodes v2 payloads, and maps platform throttling to
//! [`MurmurError::RateLimited`].

use std::sync::LazyLock;
use std::time::Duration;

use murmur_core::{InboundMessage, MentionsPage, MurmurError};
use regex::Regex;
use reqwest::header::HeaderMap;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::oauth::{OAuthCredentials, authorization_header, percent_encode};
use crate::types::{
    ApiTweet, ApiUser, CreateTweetRequest, CreatedTweet, EXPANSIONS, ReplySettings,
    SingleResponse, TWEET_FIELDS, TweetListResponse, USER_FIELDS,
};

/// Default base URL for the v2 API.
pub const API_BASE_URL: &str = "https://api.twitter.com/2";

static TWEET_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{1,19}$").unwrap());

/// Returns true if `id` has the shape of a tweet id (1 to 19 digits).
pub fn is_valid_tweet_id(id: &str) -> bool {
    TWEET_ID.is_match(id)
}

/// Signed HTTP client for user-context v2 endpoints.
#[derive(Debug, Clone)]
pub struct TwitterClient {
    client: reqwest::Client,
    credentials: OAuthCredentials,
    base_url: String,
}

impl TwitterClient {
    pub fn new(credentials: OAuthCredentials, timeout: Duration) -> Result<Self, MurmurError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("murmur/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MurmurError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                status: None,
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            credentials,
            base_url: API_BASE_URL.to_string(),
        })
    }

    /// Overrides the base URL (proxies, wiremock).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /users/me`: the authenticated account's id.
    pub async fn me(&self) -> Result<String, MurmurError> {
        let response: SingleResponse<ApiUser> = self.get("/users/me", &[]).await?;
        match response.data {
            Some(user) => Ok(user.id),
            None => Err(api_errors("users/me", &response.errors)),
        }
    }

    /// `GET /users/{id}/mentions`: one page of mentions.
    pub async fn mentions(
        &self,
        user_id: &str,
        since_id: Option<&str>,
        pagination_token: Option<&str>,
        max_results: u32,
    ) -> Result<MentionsPage, MurmurError> {
        let mut query = vec![
            ("max_results", max_results.clamp(5, 100).to_string()),
            ("tweet.fields", TWEET_FIELDS.to_string()),
            ("expansions", EXPANSIONS.to_string()),
            ("user.fields", USER_FIELDS.to_string()),
        ];
        if let Some(since) = since_id {
            query.push(("since_id", since.to_string()));
        }
        if let Some(token) = pagination_token {
            query.push(("pagination_token", token.to_string()));
        }

        let response: TweetListResponse = self
            .get(&format!("/users/{user_id}/mentions"), &query)
            .await?;
        debug!(
            result_count = response.meta.result_count.unwrap_or(0),
            has_next = response.meta.next_token.is_some(),
            "mentions page received"
        );
        Ok(MentionsPage::from(response))
    }

    /// `GET /tweets/{id}`. Returns `None` when the tweet does not exist.
    pub async fn tweet(&self, id: &str) -> Result<Option<InboundMessage>, MurmurError> {
        let query = [
            ("tweet.fields", TWEET_FIELDS.to_string()),
            ("expansions", "author_id".to_string()),
        ];
        let response: SingleResponse<ApiTweet> =
            self.get(&format!("/tweets/{id}"), &query).await?;
        match response.data {
            Some(tweet) => InboundMessage::try_from(tweet).map(Some),
            None => {
                debug!(message_id = id, errors = response.errors.len(), "tweet not found");
                Ok(None)
            }
        }
    }

    /// `POST /tweets` as a reply to `reply_to_id`.
    pub async fn create_reply(
        &self,
        text: &str,
        reply_to_id: &str,
    ) -> Result<CreatedTweet, MurmurError> {
        if !is_valid_tweet_id(reply_to_id) {
            return Err(MurmurError::Validation {
                message: format!("invalid reply_to_id {reply_to_id:?}: must be 1-19 digits"),
            });
        }

        let url = format!("{}/tweets", self.base_url);
        let auth = authorization_header("POST", &url, &[], &self.credentials)?;
        let body = CreateTweetRequest {
            text,
            reply: ReplySettings {
                in_reply_to_tweet_id: reply_to_id,
            },
        };
        let response = self
            .client
            .request(Method::POST, &url)
            .header("Authorization", auth)
            .json(&body)
            .send()
            .await
            .map_err(request_failed)?;

        let response: SingleResponse<CreatedTweet> = decode(response).await?;
        response
            .data
            .ok_or_else(|| api_errors("tweets", &response.errors))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, MurmurError> {
        let url = format!("{}{path}", self.base_url);
        let auth = authorization_header("GET", &url, query, &self.credentials)?;
        let response = self
            .client
            .request(Method::GET, with_query(&url, query))
            .header("Authorization", auth)
            .send()
            .await
            .map_err(request_failed)?;
        decode(response).await
    }
}

/// Appends `query` using the same encoding the signature was computed over.
fn with_query(url: &str, query: &[(&str, String)]) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    let encoded = query
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{url}?{encoded}")
}

fn request_failed(e: reqwest::Error) -> MurmurError {
    MurmurError::Transport {
        message: format!("HTTP request failed: {e}"),
        status: None,
        source: Some(Box::new(e)),
    }
}

fn api_errors(endpoint: &str, errors: &[crate::types::ApiError]) -> MurmurError {
    let detail = errors
        .iter()
        .map(|e| e.describe())
        .collect::<Vec<_>>()
        .join("; ");
    MurmurError::Transport {
        message: format!("{endpoint} returned no data: {detail}"),
        status: None,
        source: None,
    }
}

/// Seconds until the `x-rate-limit-reset` epoch, if present.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let reset: i64 = headers
        .get("x-rate-limit-reset")?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()?;
    let wait = reset - chrono::Utc::now().timestamp();
    Some(Duration::from_secs(wait.max(0) as u64))
}

fn remaining(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("x-rate-limit-remaining")?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, MurmurError> {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await.map_err(|e| MurmurError::Transport {
        message: format!("failed to read response body: {e}"),
        status: Some(status.as_u16()),
        source: Some(Box::new(e)),
    })?;

    if status == StatusCode::TOO_MANY_REQUESTS
        || (!status.is_success() && remaining(&headers) == Some(0))
    {
        let retry_after = retry_after(&headers);
        warn!(status = %status, ?retry_after, "platform rate limit reached");
        return Err(MurmurError::RateLimited { retry_after });
    }

    if !status.is_success() {
        return Err(MurmurError::Transport {
            message: format!("API returned {status}: {body}"),
            status: Some(status.as_u16()),
            source: None,
        });
    }

    if remaining(&headers) == Some(0) {
        debug!(reset = ?retry_after(&headers), "rate limit window exhausted by this request");
    }

    serde_json::from_str(&body).map_err(|e| MurmurError::Transport {
        message: format!("failed to parse API response: {e}"),
        status: Some(status.as_u16()),
        source: Some(Box::new(e)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tweet_id_shape() {
        assert!(is_valid_tweet_id("1850000000000000001"));
        assert!(is_valid_tweet_id("7"));
        assert!(!is_valid_tweet_id(""));
        assert!(!is_valid_tweet_id("12345678901234567890"));
        assert!(!is_valid_tweet_id("12a"));
    }

    #[test]
    fn query_is_percent_encoded() {
        let url = with_query(
            "https://api.twitter.com/2/users/1/mentions",
            &[("tweet.fields", "author_id,lang".to_string())],
        );
        assert_eq!(
            url,
            "https://api.twitter.com/2/users/1/mentions?tweet.fields=author_id%2Clang"
        );
    }

    #[test]
    fn retry_after_reads_reset_header() {
        let mut headers = HeaderMap::new();
        let reset = chrono::Utc::now().timestamp() + 120;
        headers.insert("x-rate-limit-reset", reset.to_string().parse().unwrap());
        let wait = retry_after(&headers).unwrap();
        assert!(wait <= Duration::from_secs(120));
        assert!(wait >= Duration::from_secs(118));

        headers.insert("x-rate-limit-reset", "1".parse().unwrap());
        assert_eq!(retry_after(&headers), Some(Duration::ZERO));
    }
}
