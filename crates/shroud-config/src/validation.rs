// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates constraints serde attributes cannot express: required
//! credentials, SQL-safe table names, and non-zero intervals.

use crate::diagnostic::ConfigError;
use crate::model::ShroudConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ShroudConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    match config.telegram.bot_token.as_deref() {
        None => errors.push(ConfigError::MissingKey {
            key: "telegram.bot_token".to_string(),
        }),
        Some(token) if token.trim().is_empty() => errors.push(ConfigError::Validation {
            message: "telegram.bot_token must not be empty".to_string(),
        }),
        Some(_) => {}
    }

    if config.telegram.group_id.is_none() {
        errors.push(ConfigError::MissingKey {
            key: "telegram.group_id".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    // The table name is interpolated into SQL, so only plain identifiers pass.
    if !is_sql_identifier(&config.storage.table_name) {
        errors.push(ConfigError::Validation {
            message: format!(
                "storage.table_name `{}` must start with a letter or underscore \
                 and contain only ASCII letters, digits, and underscores",
                config.storage.table_name
            ),
        });
    }

    if config.delivery.retry_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "delivery.retry_interval_secs must be at least 1".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Returns `true` for `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
