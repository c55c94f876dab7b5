// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `shroud doctor` command implementation.
//!
//! Runs diagnostic checks against the deployment: the binding store, the
//! Bot API credential and the operator group.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use shroud_config::ShroudConfig;
use shroud_core::{HealthStatus, PluginAdapter, ShroudError};
use shroud_storage::SqliteBindingStore;
use shroud_telegram::TelegramEndpoint;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

/// Run the `shroud doctor` command.
///
/// Returns an error when any check fails, so the exit code is usable in scripts.
pub async fn run_doctor(config: &ShroudConfig, plain: bool) -> Result<(), ShroudError> {
    let use_color = !plain && std::io::stdout().is_terminal();

    let results = vec![
        check_database(config).await,
        check_telegram(config).await,
    ];

    println!();
    println!("  shroud doctor");
    println!("  {}", "-".repeat(50));
    for result in &results {
        println!("{}", format_line(result, use_color));
    }
    println!();

    let failed = results
        .iter()
        .filter(|r| r.status == CheckStatus::Fail)
        .count();
    let warned = results
        .iter()
        .filter(|r| r.status == CheckStatus::Warn)
        .count();

    if failed + warned == 0 {
        println!("  All checks passed.");
    } else {
        let issues = failed + warned;
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    }
    println!();

    if failed > 0 {
        return Err(ShroudError::Internal(format!("{failed} check(s) failed")));
    }
    Ok(())
}

fn format_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green(), result.message.normal()),
            CheckStatus::Warn => ("!".yellow(), result.message.yellow()),
            CheckStatus::Fail => ("✗".red(), result.message.red()),
        };
        format!(
            "    {symbol} {:<20} {message} ({duration_ms}ms)",
            result.name
        )
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

/// Opens the binding store, runs `SELECT 1` and counts bindings.
async fn check_database(config: &ShroudConfig) -> CheckResult {
    let start = Instant::now();
    let name = "Database".to_string();
    let db_path = &config.storage.database_path;

    if !std::path::Path::new(db_path).exists() {
        return CheckResult {
            name,
            status: CheckStatus::Warn,
            message: format!("not found: {db_path} (will be created on first run)"),
            duration: start.elapsed(),
        };
    }

    let outcome = async {
        let store = SqliteBindingStore::open(&config.storage).await?;
        store.database().ping().await?;
        store.count().await
    }
    .await;

    match outcome {
        Ok(count) => CheckResult {
            name,
            status: CheckStatus::Pass,
            message: format!("connected, {count} binding(s)"),
            duration: start.elapsed(),
        },
        Err(e) => CheckResult {
            name,
            status: CheckStatus::Fail,
            message: e.to_string(),
            duration: start.elapsed(),
        },
    }
}

/// Calls `getMe` with the configured token.
async fn check_telegram(config: &ShroudConfig) -> CheckResult {
    let start = Instant::now();
    let name = "Telegram".to_string();

    let endpoint = match TelegramEndpoint::new(&config.telegram) {
        Ok(endpoint) => endpoint,
        Err(e) => {
            return CheckResult {
                name,
                status: CheckStatus::Fail,
                message: e.to_string(),
                duration: start.elapsed(),
            };
        }
    };

    let (status, message) = match endpoint.health_check().await {
        Ok(HealthStatus::Healthy) => (CheckStatus::Pass, "bot reachable".to_string()),
        Ok(HealthStatus::Degraded(msg)) => (CheckStatus::Warn, msg),
        Ok(HealthStatus::Unhealthy(msg)) => (CheckStatus::Fail, msg),
        Err(e) => (CheckStatus::Fail, e.to_string()),
    };
    CheckResult {
        name,
        status,
        message,
        duration: start.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: CheckStatus) -> CheckResult {
        CheckResult {
            name: "Database".into(),
            status,
            message: "connected".into(),
            duration: Duration::from_millis(3),
        }
    }

    #[test]
    fn plain_lines_carry_status_tags() {
        assert!(format_line(&result(CheckStatus::Pass), false).contains("[OK]"));
        assert!(format_line(&result(CheckStatus::Warn), false).contains("[WARN]"));
        let line = format_line(&result(CheckStatus::Fail), false);
        assert!(line.contains("[FAIL]"));
        assert!(line.contains("Database"));
        assert!(line.contains("(3ms)"));
    }

    #[tokio::test]
    async fn missing_database_is_a_warning() {
        let mut config = ShroudConfig::default();
        config.storage.database_path = "/nonexistent/dir/shroud.db".into();
        let result = check_database(&config).await;
        assert_eq!(result.status, CheckStatus::Warn);
    }

    #[tokio::test]
    async fn missing_token_fails_telegram_check() {
        let result = check_telegram(&ShroudConfig::default()).await;
        assert_eq!(result.status, CheckStatus::Fail);
    }
}
