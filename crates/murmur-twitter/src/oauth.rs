// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OAuth 1.0a request signing (HMAC-SHA1) for user-context API calls.

use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use murmur_core::MurmurError;
use rand::Rng;
use rand::distributions::Alphanumeric;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// The four user-context credentials.
#[derive(Clone)]
pub struct OAuthCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .field("access_token", &self.access_token)
            .field("access_token_secret", &"[REDACTED]")
            .finish()
    }
}

/// Percent-encodes per RFC 3986, leaving only unreserved characters.
pub fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Computes the base64 HMAC-SHA1 signature over `method`, `url` and every
/// request parameter (query plus `oauth_*`).
pub fn sign(
    method: &str,
    url: &str,
    params: &[(String, String)],
    consumer_secret: &str,
    token_secret: &str,
) -> Result<String, MurmurError> {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();
    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let base_string = format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(url),
        percent_encode(&param_string)
    );
    let signing_key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    );

    let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes())
        .map_err(|e| MurmurError::Internal(format!("invalid HMAC key: {e}")))?;
    mac.update(base_string.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// Builds the `Authorization` header for a request.
///
/// `query` holds the URL query parameters, which take part in the signature.
/// JSON bodies do not.
pub fn authorization_header(
    method: &str,
    url: &str,
    query: &[(&str, String)],
    credentials: &OAuthCredentials,
) -> Result<String, MurmurError> {
    let nonce: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();
    let timestamp = chrono::Utc::now().timestamp().to_string();
    header_with(method, url, query, credentials, &nonce, &timestamp)
}

fn header_with(
    method: &str,
    url: &str,
    query: &[(&str, String)],
    credentials: &OAuthCredentials,
    nonce: &str,
    timestamp: &str,
) -> Result<String, MurmurError> {
    let oauth: Vec<(&str, &str)> = vec![
        ("oauth_consumer_key", credentials.consumer_key.as_str()),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", timestamp),
        ("oauth_token", credentials.access_token.as_str()),
        ("oauth_version", "1.0"),
    ];

    let params: Vec<(String, String)> = oauth
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .chain(query.iter().map(|(k, v)| (k.to_string(), v.clone())))
        .collect();
    let signature = sign(
        method,
        url,
        &params,
        &credentials.consumer_secret,
        &credentials.access_token_secret,
    )?;

    let mut fields: Vec<(&str, &str)> = oauth;
    fields.push(("oauth_signature", signature.as_str()));
    fields.sort();
    let header = fields
        .iter()
        .map(|(k, v)| format!("{k}=\"{}\"", percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("OAuth {header}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_credentials() -> OAuthCredentials {
        OAuthCredentials {
            consumer_key: "xvz1evFS4wEEPTGEFPHBog".into(),
            consumer_secret: "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw".into(),
            access_token: "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb".into(),
            access_token_secret: "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE".into(),
        }
    }

    #[test]
    fn percent_encode_reserved_characters() {
        assert_eq!(percent_encode("hello"), "hello");
        assert_eq!(percent_encode("hello world"), "hello%20world");
        assert_eq!(percent_encode("a=b&c=d"), "a%3Db%26c%3Dd");
        assert_eq!(percent_encode("~-._"), "~-._");
        assert_eq!(percent_encode("é"), "%C3%A9");
    }

    /// Worked example from the platform's "creating a signature" guide.
    #[test]
    fn signature_matches_reference_vector() {
        let header = header_with(
            "post",
            "https://api.twitter.com/1.1/statuses/update.json",
            &[
                ("include_entities", "true".to_string()),
                (
                    "status",
                    "Hello Ladies + Gentlemen, a signed OAuth request!".to_string(),
                ),
            ],
            &doc_credentials(),
            "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg",
            "1318622958",
        )
        .unwrap();

        assert!(header.starts_with("OAuth "));
        assert!(header.contains("oauth_signature=\"hCtSmYh%2BiHYCEqBWrE7C7hYmtUk%3D\""));
        assert!(header.contains("oauth_nonce=\"kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg\""));
        assert!(!header.contains("include_entities"));
    }

    #[test]
    fn fresh_headers_use_distinct_nonces() {
        let creds = doc_credentials();
        let a = authorization_header("GET", "https://api.twitter.com/2/users/me", &[], &creds)
            .unwrap();
        let b = authorization_header("GET", "https://api.twitter.com/2/users/me", &[], &creds)
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn debug_redacts_secrets() {
        let rendered = format!("{:?}", doc_credentials());
        assert!(!rendered.contains("kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
