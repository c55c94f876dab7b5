// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Shroud relay.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};
use shroud_core::types::WorkspaceId;

/// Top-level Shroud configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// Every section has defaults except the bot credential and the operator group,
/// which validation requires.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ShroudConfig {
    /// Process-level settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Telegram bot and operator group settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Binding store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Retry queue settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// User-facing relay texts.
    #[serde(default)]
    pub relay: RelayConfig,
}

/// Process-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram bot integration configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. Required; the process does not start without it.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Chat id of the forum-enabled operator group (usually `-100...`).
    #[serde(default)]
    pub group_id: Option<i64>,
}

impl TelegramConfig {
    /// Returns the operator workspace, if configured.
    pub fn workspace(&self) -> Option<WorkspaceId> {
        self.group_id.map(WorkspaceId)
    }
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Name of the binding table. Must be a plain SQL identifier.
    #[serde(default = "default_table_name")]
    pub table_name: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            table_name: default_table_name(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    "shroud.db".to_string()
}

fn default_table_name() -> String {
    "user_bindings".to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Retry queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Seconds between two drain cycles of the retry queue.
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,

    /// Tell end users when a message to them could not be delivered right away.
    #[serde(default = "default_notify_user_on_delay")]
    pub notify_user_on_delay: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            retry_interval_secs: default_retry_interval_secs(),
            notify_user_on_delay: default_notify_user_on_delay(),
        }
    }
}

fn default_retry_interval_secs() -> u64 {
    10
}

fn default_notify_user_on_delay() -> bool {
    true
}

/// User-facing relay texts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Reply to `/start` in a private chat.
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            greeting: default_greeting(),
        }
    }
}

fn default_greeting() -> String {
    "Привет 👋! Напишите сообщение, и его анонимно получит наша команда. \
     Ответ придёт сюда же."
        .to_string()
}
