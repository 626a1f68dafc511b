// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Merge order (later overrides earlier): compiled defaults,
//! `/etc/murmur/murmur.toml`, `$XDG_CONFIG_HOME/murmur/murmur.toml`,
//! `./murmur.toml`, then `MURMUR_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::MurmurConfig;

/// Top-level sections, used to turn `MURMUR_DISPATCH_BATCH_SIZE` into
/// `dispatch.batch_size` without splitting field names on underscores.
const SECTIONS: &[&str] = &["agent", "twitter", "openai", "storage", "ingestion", "dispatch"];

pub const SYSTEM_CONFIG_PATH: &str = "/etc/murmur/murmur.toml";
pub const LOCAL_CONFIG_PATH: &str = "murmur.toml";

/// Per-user config file location.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("murmur").join("murmur.toml"))
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<MurmurConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string over the defaults (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<MurmurConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MurmurConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MurmurConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MurmurConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for the standard hierarchy.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(MurmurConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

fn env_provider() -> Env {
    Env::prefixed("MURMUR_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped env var name onto a dotted config key.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `twitter_access_token_secret` maps to `twitter.access_token_secret`.
pub fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_only_at_section() {
        assert_eq!(map_env_key("agent_name"), "agent.name");
        assert_eq!(
            map_env_key("twitter_access_token_secret"),
            "twitter.access_token_secret"
        );
        assert_eq!(
            map_env_key("dispatch_rate_limit_cooldown_secs"),
            "dispatch.rate_limit_cooldown_secs"
        );
        assert_eq!(map_env_key("openai_api_key"), "openai.api_key");
    }

    #[test]
    fn unknown_prefix_is_left_alone() {
        assert_eq!(map_env_key("telemetry_enabled"), "telemetry_enabled");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config_from_path(Path::new("/nonexistent/murmur.toml"))
            .expect("missing files are skipped");
        assert_eq!(config.dispatch.batch_size, 10);
    }
}
