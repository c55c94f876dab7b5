// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory retry queue of failed sends.
//!
//! Insertion-ordered, unbounded, and lost on restart. Descriptors are
//! removed only after a successful re-send.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use shroud_core::OutboundSend;

use crate::recording;

/// A send waiting to be retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryDescriptor {
    /// Queue-local identifier, unique for the lifetime of the queue.
    pub id: u64,
    pub send: OutboundSend,
    pub enqueued_at: DateTime<Utc>,
    /// Failed attempts so far, including the initial one.
    pub attempts: u32,
}

/// Shared queue of [`RetryDescriptor`]s.
#[derive(Debug, Default)]
pub struct RetryQueue {
    items: Mutex<Vec<RetryDescriptor>>,
    next_id: AtomicU64,
}

impl RetryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a send whose first attempt failed. Returns its id.
    pub async fn push(&self, send: OutboundSend) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut items = self.items.lock().await;
        items.push(RetryDescriptor {
            id,
            send,
            enqueued_at: Utc::now(),
            attempts: 1,
        });
        recording::set_retry_queue_depth(items.len());
        id
    }

    /// Copies the current contents in insertion order.
    pub async fn snapshot(&self) -> Vec<RetryDescriptor> {
        self.items.lock().await.clone()
    }

    /// Removes a descriptor. Returns `false` if it was already gone.
    pub async fn remove(&self, id: u64) -> bool {
        let mut items = self.items.lock().await;
        let before = items.len();
        items.retain(|d| d.id != id);
        recording::set_retry_queue_depth(items.len());
        items.len() != before
    }

    /// Counts one more failed attempt for a descriptor.
    pub async fn record_failure(&self, id: u64) {
        let mut items = self.items.lock().await;
        if let Some(d) = items.iter_mut().find(|d| d.id == id) {
            d.attempts = d.attempts.saturating_add(1);
        }
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shroud_core::{Destination, ExternalUserId};

    fn send(text: &str) -> OutboundSend {
        OutboundSend::text(Destination::User(ExternalUserId(1)), text)
    }

    #[tokio::test]
    async fn preserves_insertion_order() {
        let queue = RetryQueue::new();
        queue.push(send("a")).await;
        queue.push(send("b")).await;
        queue.push(send("c")).await;

        let texts: Vec<_> = queue
            .snapshot()
            .await
            .into_iter()
            .map(|d| d.send.operation.text().unwrap_or_default().to_string())
            .collect();
        assert_eq!(texts, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn remove_only_named_descriptor() {
        let queue = RetryQueue::new();
        let a = queue.push(send("a")).await;
        let b = queue.push(send("b")).await;
        assert_ne!(a, b);

        assert!(queue.remove(a).await);
        assert!(!queue.remove(a).await);
        let left = queue.snapshot().await;
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, b);
    }

    #[tokio::test]
    async fn failures_are_counted() {
        let queue = RetryQueue::new();
        let id = queue.push(send("a")).await;
        queue.record_failure(id).await;
        queue.record_failure(id).await;
        assert_eq!(queue.snapshot().await[0].attempts, 3);
    }

    #[tokio::test]
    async fn empty_queue() {
        let queue = RetryQueue::new();
        assert!(queue.is_empty().await);
        assert_eq!(queue.len().await, 0);
    }
}
