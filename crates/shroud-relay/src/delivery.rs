// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reliable delivery: one immediate attempt, then periodic retries.
//!
//! A failed send is appended to the [`RetryQueue`]. The drain loop re-sends
//! every queued descriptor on a fixed interval until it succeeds. There is no
//! backoff, no attempt cap and no expiry; the queue lives in memory and is
//! abandoned on shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use shroud_core::{Destination, MessageId, MessagingEndpoint, OutboundSend, SendOperation, ShroudError};

use crate::queue::RetryQueue;
use crate::recording;
use crate::texts;

/// Result of [`DeliveryEngine::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The endpoint accepted the send.
    Delivered(MessageId),
    /// The attempt failed; the send waits in the retry queue.
    Queued { retry_id: u64 },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }
}

/// Summary of one drain cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub attempted: usize,
    pub delivered: usize,
    pub remaining: usize,
}

/// Executes an [`OutboundSend`] with the matching endpoint primitive.
pub async fn perform(
    endpoint: &dyn MessagingEndpoint,
    send: &OutboundSend,
) -> Result<MessageId, ShroudError> {
    let to = &send.destination;
    match &send.operation {
        SendOperation::Text { text } => endpoint.send_text(to, text).await,
        SendOperation::Photo { file_id, caption } => {
            endpoint.send_photo(to, file_id, caption.as_deref()).await
        }
        SendOperation::Video { file_id, caption } => {
            endpoint.send_video(to, file_id, caption.as_deref()).await
        }
        SendOperation::Document { file_id, caption } => {
            endpoint.send_document(to, file_id, caption.as_deref()).await
        }
        SendOperation::Audio { file_id, caption } => {
            endpoint.send_audio(to, file_id, caption.as_deref()).await
        }
        SendOperation::Voice { file_id, caption } => {
            endpoint.send_voice(to, file_id, caption.as_deref()).await
        }
    }
}

/// Sends through the messaging endpoint and owns the retry queue.
pub struct DeliveryEngine {
    endpoint: Arc<dyn MessagingEndpoint>,
    queue: Arc<RetryQueue>,
    notify_user_on_delay: bool,
}

impl DeliveryEngine {
    pub fn new(
        endpoint: Arc<dyn MessagingEndpoint>,
        queue: Arc<RetryQueue>,
        notify_user_on_delay: bool,
    ) -> Self {
        Self {
            endpoint,
            queue,
            notify_user_on_delay,
        }
    }

    pub fn queue(&self) -> &Arc<RetryQueue> {
        &self.queue
    }

    /// Attempts the send once. On failure the send is queued for retry and,
    /// when it was addressed to an end user, that user is told about the
    /// delay on a best-effort basis.
    pub async fn send(&self, send: OutboundSend) -> DeliveryOutcome {
        match perform(self.endpoint.as_ref(), &send).await {
            Ok(id) => {
                recording::record_delivery("delivered");
                debug!(
                    destination = %send.destination,
                    kind = %send.operation.kind(),
                    "delivered"
                );
                DeliveryOutcome::Delivered(id)
            }
            Err(e) => {
                recording::record_delivery("queued");
                warn!(
                    destination = %send.destination,
                    kind = %send.operation.kind(),
                    error = %e,
                    "send failed, queued for retry"
                );
                let destination = send.destination;
                let retry_id = self.queue.push(send).await;
                if self.notify_user_on_delay && destination.user().is_some() {
                    self.notify_delay(&destination).await;
                }
                DeliveryOutcome::Queued { retry_id }
            }
        }
    }

    async fn notify_delay(&self, destination: &Destination) {
        if let Err(e) = self
            .endpoint
            .send_text(destination, texts::DELAY_NOTICE)
            .await
        {
            debug!(destination = %destination, error = %e, "delay notice not sent");
        }
    }

    /// Re-sends every queued descriptor once, in insertion order.
    ///
    /// Descriptors enqueued while the cycle runs wait for the next one.
    pub async fn drain_once(&self) -> DrainReport {
        let snapshot = self.queue.snapshot().await;
        let mut report = DrainReport {
            attempted: snapshot.len(),
            ..DrainReport::default()
        };

        for descriptor in snapshot {
            match perform(self.endpoint.as_ref(), &descriptor.send).await {
                Ok(_) => {
                    self.queue.remove(descriptor.id).await;
                    report.delivered += 1;
                    recording::record_delivery("retried");
                    info!(
                        retry_id = descriptor.id,
                        destination = %descriptor.send.destination,
                        attempts = descriptor.attempts + 1,
                        "queued send delivered"
                    );
                }
                Err(e) => {
                    self.queue.record_failure(descriptor.id).await;
                    recording::record_delivery("retry_failed");
                    debug!(
                        retry_id = descriptor.id,
                        destination = %descriptor.send.destination,
                        error = %e,
                        "retry failed, keeping in queue"
                    );
                }
            }
        }

        report.remaining = self.queue.len().await;
        report
    }

    /// Runs [`drain_once`](Self::drain_once) every `interval` until `cancel`
    /// fires. Send failures never end the loop.
    pub async fn run_drain_loop(&self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Skip the first immediate tick.
        ticker.tick().await;

        info!(interval_secs = interval.as_secs(), "retry drain loop started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.queue.is_empty().await {
                        continue;
                    }
                    let report = self.drain_once().await;
                    debug!(
                        attempted = report.attempted,
                        delivered = report.delivered,
                        remaining = report.remaining,
                        "drain cycle complete"
                    );
                }
                _ = cancel.cancelled() => {
                    break;
                }
            }
        }

        let abandoned = self.queue.len().await;
        if abandoned > 0 {
            warn!(abandoned, "retry drain loop stopped, queued sends abandoned");
        } else {
            info!("retry drain loop stopped");
        }
    }
}
