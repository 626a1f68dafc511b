// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Twitter API v2 wire types.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use murmur_core::{
    InboundMessage, MentionsPage, MurmurError, ReferenceKind, ReferencedMessage, UserProfile,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Tweet fields requested on every read.
pub const TWEET_FIELDS: &str =
    "author_id,conversation_id,created_at,in_reply_to_user_id,lang,referenced_tweets";

/// Expansions requested with mention pages.
pub const EXPANSIONS: &str = "author_id,referenced_tweets.id,in_reply_to_user_id";

pub const USER_FIELDS: &str = "name,username";

#[derive(Debug, Clone, Deserialize)]
pub struct ApiTweet {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub in_reply_to_user_id: Option<String>,
    #[serde(default)]
    pub referenced_tweets: Vec<ApiReference>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiReference {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiUser {
    pub id: String,
    pub name: String,
    pub username: String,
}

impl From<ApiUser> for UserProfile {
    fn from(user: ApiUser) -> Self {
        UserProfile {
            id: user.id,
            name: user.name,
            username: user.username,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Includes {
    #[serde(default)]
    pub users: Vec<ApiUser>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub newest_id: Option<String>,
    #[serde(default)]
    pub next_token: Option<String>,
    #[serde(default)]
    pub result_count: Option<u32>,
}

/// An entry in the `errors` array of a v2 response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
}

impl ApiError {
    pub fn describe(&self) -> String {
        self.detail
            .clone()
            .or_else(|| self.message.clone())
            .or_else(|| self.title.clone())
            .unwrap_or_else(|| "unknown error".to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TweetListResponse {
    #[serde(default)]
    pub data: Vec<ApiTweet>,
    #[serde(default)]
    pub includes: Includes,
    #[serde(default)]
    pub meta: Meta,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SingleResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedTweet {
    pub id: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateTweetRequest<'a> {
    pub text: &'a str,
    pub reply: ReplySettings<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplySettings<'a> {
    pub in_reply_to_tweet_id: &'a str,
}

impl TryFrom<ApiTweet> for InboundMessage {
    type Error = MurmurError;

    fn try_from(tweet: ApiTweet) -> Result<Self, Self::Error> {
        let referenced_messages = tweet
            .referenced_tweets
            .into_iter()
            .map(|r| {
                ReferenceKind::from_str(&r.kind)
                    .map(|kind| ReferencedMessage { kind, id: r.id })
                    .map_err(|_| MurmurError::Validation {
                        message: format!(
                            "tweet {} has unknown reference type {:?}",
                            tweet.id, r.kind
                        ),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let author_id = tweet.author_id.ok_or_else(|| MurmurError::Validation {
            message: format!("tweet {} has no author_id", tweet.id),
        })?;

        Ok(InboundMessage {
            text: tweet.text,
            author_id,
            conversation_id: tweet.conversation_id,
            created_at: tweet.created_at.unwrap_or_else(Utc::now),
            language: tweet.lang,
            in_reply_to_user_id: tweet.in_reply_to_user_id,
            referenced_messages,
            id: tweet.id,
        })
    }
}

impl From<TweetListResponse> for MentionsPage {
    /// Tweets that cannot be decoded are dropped with a warning.
    fn from(response: TweetListResponse) -> Self {
        let messages = response
            .data
            .into_iter()
            .filter_map(|tweet| {
                let id = tweet.id.clone();
                match InboundMessage::try_from(tweet) {
                    Ok(message) => Some(message),
                    Err(e) => {
                        warn!(message_id = %id, error = %e, "dropping undecodable tweet");
                        None
                    }
                }
            })
            .collect();

        MentionsPage {
            messages,
            users: response
                .includes
                .users
                .into_iter()
                .map(UserProfile::from)
                .collect(),
            newest_id: response.meta.newest_id,
            next_cursor: response.meta.next_token,
        }
    }
}
