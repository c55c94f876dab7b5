// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder can collect these metrics.
//! Without an installed recorder every call is a no-op.

use metrics::{describe_counter, describe_gauge};

/// Register all Shroud metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "shroud_deliveries_total",
        "Outbound send attempts by outcome"
    );
    describe_gauge!(
        "shroud_retry_queue_depth",
        "Sends waiting in the retry queue"
    );
    describe_counter!(
        "shroud_registrations_total",
        "Identity registrations by outcome"
    );
    describe_counter!("shroud_events_total", "Inbound events by kind");
}

/// Record one send attempt (`delivered`, `queued`, `retried`, `retry_failed`).
pub fn record_delivery(outcome: &'static str) {
    metrics::counter!("shroud_deliveries_total", "outcome" => outcome).increment(1);
}

/// Set the current retry queue depth.
pub fn set_retry_queue_depth(depth: usize) {
    metrics::gauge!("shroud_retry_queue_depth").set(depth as f64);
}

/// Record a registration (`existing`, `created`, `recovered`, `unpersisted`, `failed`).
pub fn record_registration(outcome: &'static str) {
    metrics::counter!("shroud_registrations_total", "outcome" => outcome).increment(1);
}

/// Record an inbound event.
pub fn record_event(kind: &'static str) {
    metrics::counter!("shroud_events_total", "kind" => kind).increment(1);
}
