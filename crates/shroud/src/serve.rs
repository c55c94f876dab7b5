// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `shroud serve` command implementation.
//!
//! Opens the binding store, connects the Telegram endpoint, starts the retry
//! drain loop and consumes inbound events until SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use shroud_config::ShroudConfig;
use shroud_core::{EventSource, PluginAdapter, ShroudError};
use shroud_relay::{shutdown, recording, DeliveryEngine, RelayService, RetryQueue};
use shroud_storage::SqliteBindingStore;
use shroud_telegram::TelegramEndpoint;
use tracing::{error, info, warn};

/// Runs the `shroud serve` command.
///
/// Startup fails when the database cannot be opened or does not answer
/// `SELECT 1`, or when the Bot API is unreachable.
pub async fn run_serve(config: ShroudConfig) -> Result<(), ShroudError> {
    init_tracing(&config.service.log_level);
    recording::register_metrics();
    info!(version = env!("CARGO_PKG_VERSION"), "starting shroud");

    let store = SqliteBindingStore::open(&config.storage)
        .await
        .inspect_err(|e| error!(error = %e, "failed to open binding store"))?;
    store
        .database()
        .ping()
        .await
        .inspect_err(|e| error!(error = %e, "database connectivity check failed"))?;
    info!(path = %config.storage.database_path, "database connectivity verified");
    let store = Arc::new(store);

    let mut telegram = TelegramEndpoint::new(&config.telegram)?;
    telegram
        .connect()
        .await
        .inspect_err(|e| error!(error = %e, "failed to connect Telegram endpoint"))?;
    let telegram = Arc::new(telegram);

    let cancel = shutdown::install_signal_handler();

    let engine = Arc::new(DeliveryEngine::new(
        telegram.clone(),
        Arc::new(RetryQueue::new()),
        config.delivery.notify_user_on_delay,
    ));
    let drain = tokio::spawn({
        let engine = engine.clone();
        let cancel = cancel.clone();
        let interval = Duration::from_secs(config.delivery.retry_interval_secs);
        async move { engine.run_drain_loop(interval, cancel).await }
    });

    let service = Arc::new(RelayService::from_config(
        &config,
        store.clone(),
        telegram.clone(),
        engine,
    )?);
    let result = service.run(telegram.clone(), cancel.clone()).await;

    // The relay loop may also stop because the event source closed.
    cancel.cancel();
    if let Err(e) = drain.await {
        warn!(error = %e, "drain task ended abnormally");
    }

    if let Err(e) = telegram.shutdown().await {
        warn!(error = %e, "Telegram endpoint shutdown failed");
    }
    if let Err(e) = store.shutdown().await {
        warn!(error = %e, "binding store shutdown failed");
    }

    info!("shroud stopped");
    result
}

/// Initializes the tracing subscriber with the given log level.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("shroud={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
