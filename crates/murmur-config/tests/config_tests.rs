// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Murmur configuration system.

use murmur_config::diagnostic::ConfigError;
use murmur_config::model::MurmurConfig;
use murmur_config::{load_and_validate_str, load_config_from_str};

#[test]
fn full_toml_deserializes() {
    let toml = r#"
[agent]
name = "Murmur Bot"
username = "murmurbot"
account_id = "1234"
log_level = "debug"

[twitter]
consumer_key = "ck"
consumer_secret = "cs"
access_token = "at"
access_token_secret = "ats"
page_size = 50

[openai]
api_key = "sk-test"
model = "gpt-4o"
temperature = 0.5

[storage]
database_path = "/tmp/murmur.db"
wal_mode = false

[ingestion]
interval_secs = 60

[dispatch]
batch_size = 5
max_retries = 2
posts_per_window = 30
rate_limit_cooldown_secs = 120
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.agent.username, "murmurbot");
    assert_eq!(config.agent.account_id.as_deref(), Some("1234"));
    assert!(config.twitter.has_credentials());
    assert_eq!(config.twitter.page_size, 50);
    assert_eq!(config.openai.model, "gpt-4o");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.ingestion.interval_secs, 60);
    assert_eq!(config.dispatch.batch_size, 5);
    assert_eq!(config.dispatch.posts_per_window, 30);
    // Untouched keys keep their defaults.
    assert_eq!(config.dispatch.window_secs, 900);
    assert_eq!(config.dispatch.burst, 1);
}

#[test]
fn unknown_key_gets_suggestion() {
    let toml = r#"
[dispatch]
bach_size = 4
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    let suggestion = errors.iter().find_map(|e| match e {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } if key == "bach_size" => suggestion.clone(),
        _ => None,
    });
    assert_eq!(suggestion.as_deref(), Some("batch_size"));
}

#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[dispatch]
batch_size = "ten"
"#;
    let errors = load_and_validate_str(toml).expect_err("should reject string");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { .. } | ConfigError::Other(_)))
    );
}

#[test]
fn validation_runs_after_successful_parse() {
    let toml = r#"
[dispatch]
posts_per_window = 0
"#;
    let errors = load_and_validate_str(toml).expect_err("zero rate is invalid");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("posts_per_window"))
    ));
}

#[test]
fn dotted_override_reaches_nested_key() {
    use figment::{Figment, providers::Serialized};

    let config: MurmurConfig = Figment::new()
        .merge(Serialized::defaults(MurmurConfig::default()))
        .merge(("twitter.access_token_secret", "from-env"))
        .extract()
        .expect("should set nested key via dot notation");

    assert_eq!(
        config.twitter.access_token_secret.as_deref(),
        Some("from-env")
    );
}

#[test]
fn defaults_match_documented_values() {
    let config = MurmurConfig::default();
    assert_eq!(config.agent.log_level, "info");
    assert!(!config.twitter.has_credentials());
    assert_eq!(config.twitter.base_url, "https://api.twitter.com/2");
    assert_eq!(config.openai.max_length, 280);
    assert!((config.openai.temperature - 0.7).abs() < f32::EPSILON);
    assert_eq!(config.storage.timeout_secs, 30);
    assert_eq!(config.ingestion.interval_secs, 30);
    assert_eq!(config.dispatch.batch_delay_secs, 60);
    assert_eq!(config.dispatch.retry_delay_secs, 60);
    assert_eq!(config.dispatch.max_retries, 3);
    assert_eq!(config.dispatch.rate_limit_cooldown_secs, 300);
    assert!(config.storage.database_path.ends_with("murmur.db"));
}

#[test]
fn empty_toml_uses_defaults() {
    let config = load_and_validate_str("").expect("empty config is valid");
    assert_eq!(config.agent.name, "murmur");
}
