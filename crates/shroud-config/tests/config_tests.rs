// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Shroud configuration system.

use shroud_config::diagnostic::ConfigError;
use shroud_config::model::ShroudConfig;
use shroud_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_shroud_config() {
    let toml = r#"
[service]
log_level = "debug"

[telegram]
bot_token = "123:ABC"
group_id = -1001234567890

[storage]
database_path = "/tmp/shroud-test.db"
table_name = "p_of_light"
wal_mode = false

[delivery]
retry_interval_secs = 5
notify_user_on_delay = false

[relay]
greeting = "hi"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.service.log_level, "debug");
    assert_eq!(config.telegram.bot_token.as_deref(), Some("123:ABC"));
    assert_eq!(config.telegram.group_id, Some(-1001234567890));
    assert_eq!(config.storage.database_path, "/tmp/shroud-test.db");
    assert_eq!(config.storage.table_name, "p_of_light");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.delivery.retry_interval_secs, 5);
    assert!(!config.delivery.notify_user_on_delay);
    assert_eq!(config.relay.greeting, "hi");
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.service.log_level, "info");
    assert!(config.telegram.bot_token.is_none());
    assert!(config.telegram.group_id.is_none());
    assert_eq!(config.storage.database_path, "shroud.db");
    assert_eq!(config.storage.table_name, "user_bindings");
    assert!(config.storage.wal_mode);
    assert_eq!(config.delivery.retry_interval_secs, 10);
    assert!(config.delivery.notify_user_on_delay);
    assert!(!config.relay.greeting.is_empty());
}

/// Unknown field in [telegram] is rejected with a suggestion.
#[test]
fn unknown_telegram_key_suggests_correction() {
    let toml = r#"
[telegram]
bot_tken = "abc"
group_id = -100
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    let found = errors.iter().any(|e| {
        matches!(
            e,
            ConfigError::UnknownKey { key, suggestion, .. }
                if key == "bot_tken" && suggestion.as_deref() == Some("bot_token")
        )
    });
    assert!(found, "expected UnknownKey with suggestion, got: {errors:?}");
}

/// Unknown key spans point into the inline source.
#[test]
fn unknown_key_carries_source_span() {
    let toml = "[storage]\ntable_nmae = \"x\"\n";
    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    match &errors[0] {
        ConfigError::UnknownKey { span, src, .. } => {
            assert!(span.is_some());
            assert!(src.is_some());
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

/// Missing credential is fatal at startup.
#[test]
fn missing_bot_token_fails_validation() {
    let toml = r#"
[telegram]
group_id = -100
"#;

    let errors = load_and_validate_str(toml).expect_err("token is required");
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::MissingKey { key } if key == "telegram.bot_token")));
}

/// Wrong value type is reported as InvalidType.
#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[delivery]
retry_interval_secs = "soon"
"#;

    let errors = load_and_validate_str(toml).expect_err("string is not an integer");
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::InvalidType { .. })));
}

/// A complete config passes validation end to end.
#[test]
fn complete_config_validates() {
    let toml = r#"
[telegram]
bot_token = "123:ABC"
group_id = -100
"#;

    let config = load_and_validate_str(toml).expect("config should be valid");
    assert_eq!(config.telegram.workspace().map(|w| w.0), Some(-100));
}

/// Direct TOML deserialization also denies unknown sections.
#[test]
fn unknown_section_is_rejected() {
    let result = toml::from_str::<ShroudConfig>("[agent]\nname = \"x\"\n");
    assert!(result.is_err());
}
