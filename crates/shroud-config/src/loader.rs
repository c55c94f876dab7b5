// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./shroud.toml` > `~/.config/shroud/shroud.toml` > `/etc/shroud/shroud.toml`
//! with environment variable overrides via the `SHROUD_` prefix and the
//! plain `BOT_TOKEN` / `GROUP_ID` / `TABLE_NAME` variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::ShroudConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/shroud/shroud.toml";

/// Local config file, relative to the working directory.
pub const LOCAL_CONFIG_PATH: &str = "shroud.toml";

/// Per-user config file under the XDG config directory.
pub fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("shroud/shroud.toml"))
        .unwrap_or_default()
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/shroud/shroud.toml` (system-wide)
/// 3. `~/.config/shroud/shroud.toml` (user XDG config)
/// 4. `./shroud.toml` (local directory)
/// 5. `BOT_TOKEN`, `GROUP_ID`, `TABLE_NAME`
/// 6. `SHROUD_*` environment variables
pub fn load_config() -> Result<ShroudConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no environment).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<ShroudConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ShroudConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ShroudConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ShroudConfig::default()))
        .merge(Toml::file(path))
        .merge(legacy_env_provider())
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ShroudConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(legacy_env_provider())
        .merge(env_provider())
}

/// Create the `SHROUD_` environment provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `SHROUD_TELEGRAM_BOT_TOKEN` must map to `telegram.bot_token`,
/// not `telegram.bot.token`.
fn env_provider() -> Env {
    Env::prefixed("SHROUD_").map(|key| {
        // `key` keeps the original case with the prefix stripped.
        // Example: SHROUD_TELEGRAM_BOT_TOKEN -> "telegram_bot_token"
        let mapped = key
            .as_str()
            .to_ascii_lowercase()
            .replacen("service_", "service.", 1)
            .replacen("telegram_", "telegram.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("delivery_", "delivery.", 1)
            .replacen("relay_", "relay.", 1);
        mapped.into()
    })
}

/// Unprefixed variables kept for deployments that already export them.
fn legacy_env_provider() -> Env {
    Env::raw()
        .only(&["bot_token", "group_id", "table_name"])
        .map(|key| {
            let mapped = match key.as_str().to_ascii_lowercase().as_str() {
                "bot_token" => "telegram.bot_token",
                "group_id" => "telegram.group_id",
                _ => "storage.table_name",
            };
            mapped.into()
        })
}
