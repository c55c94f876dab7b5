// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock messaging endpoint for deterministic testing.
//!
//! `MockEndpoint` implements both `MessagingEndpoint` and `EventSource`:
//! inbound events are injected by the test, outbound sends are captured for
//! assertion, and failures can be scripted per call.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use shroud_core::traits::adapter::PluginAdapter;
use shroud_core::traits::messaging::{EventSource, MessagingEndpoint};
use shroud_core::types::{
    AdapterType, Destination, HealthStatus, InboundEvent, MessageId, SendOperation, ThreadId,
    WorkspaceId,
};
use shroud_core::ShroudError;

/// First thread id handed out by [`MockEndpoint::create_thread`].
const FIRST_THREAD_ID: i32 = 100;

/// One captured outbound send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRecord {
    pub destination: Destination,
    pub operation: SendOperation,
}

/// One captured thread creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedThread {
    pub workspace: WorkspaceId,
    pub label: String,
    pub thread_id: ThreadId,
}

/// A mock chat platform for testing.
///
/// Failure scripting:
/// - [`fail_next_sends`](Self::fail_next_sends) makes the next `n` send attempts fail
/// - [`set_offline`](Self::set_offline) makes every send fail until switched back
/// - [`deny_thread_creation`](Self::deny_thread_creation) makes `create_thread` fail
///
/// Thread creation is not affected by the offline switch.
pub struct MockEndpoint {
    inbound: Arc<Mutex<VecDeque<InboundEvent>>>,
    sent: Arc<Mutex<Vec<SentRecord>>>,
    threads: Arc<Mutex<Vec<CreatedThread>>>,
    notify: Arc<Notify>,
    next_thread: AtomicI32,
    fail_next: AtomicUsize,
    offline: AtomicBool,
    deny_threads: AtomicBool,
    send_attempts: AtomicUsize,
}

impl MockEndpoint {
    /// Create a new mock endpoint that accepts every call.
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            threads: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
            next_thread: AtomicI32::new(FIRST_THREAD_ID),
            fail_next: AtomicUsize::new(0),
            offline: AtomicBool::new(false),
            deny_threads: AtomicBool::new(false),
            send_attempts: AtomicUsize::new(0),
        }
    }

    /// Inject an inbound event. The next call to `receive()` returns it.
    pub async fn inject_event(&self, event: InboundEvent) {
        self.inbound.lock().await.push_back(event);
        self.notify.notify_one();
    }

    /// Make the next `n` send attempts fail with an endpoint error.
    pub fn fail_next_sends(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Switch permanent send failure on or off.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make `create_thread` fail with a permission error.
    pub fn deny_thread_creation(&self, deny: bool) {
        self.deny_threads.store(deny, Ordering::SeqCst);
    }

    /// All sends that were accepted, in order.
    pub async fn sent(&self) -> Vec<SentRecord> {
        self.sent.lock().await.clone()
    }

    /// Accepted sends addressed to `destination`.
    pub async fn sent_to(&self, destination: &Destination) -> Vec<SentRecord> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|r| &r.destination == destination)
            .cloned()
            .collect()
    }

    /// Text or caption of every accepted send addressed to `destination`.
    pub async fn texts_to(&self, destination: &Destination) -> Vec<String> {
        self.sent_to(destination)
            .await
            .iter()
            .filter_map(|r| r.operation.text().map(str::to_string))
            .collect()
    }

    /// Count of accepted sends.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Clear captured sends.
    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }

    /// Every send attempt, accepted or failed.
    pub fn send_attempts(&self) -> usize {
        self.send_attempts.load(Ordering::SeqCst)
    }

    /// Threads created so far, in order.
    pub async fn created_threads(&self) -> Vec<CreatedThread> {
        self.threads.lock().await.clone()
    }

    async fn record(
        &self,
        destination: &Destination,
        operation: SendOperation,
    ) -> Result<MessageId, ShroudError> {
        self.send_attempts.fetch_add(1, Ordering::SeqCst);
        // Let concurrent callers interleave like a real network call would.
        tokio::task::yield_now().await;

        if self.offline.load(Ordering::SeqCst) {
            return Err(unreachable_error(destination));
        }
        let scripted = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if scripted {
            return Err(unreachable_error(destination));
        }

        self.sent.lock().await.push(SentRecord {
            destination: *destination,
            operation,
        });
        Ok(MessageId(format!("mock-msg-{}", uuid::Uuid::new_v4())))
    }
}

impl Default for MockEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

fn unreachable_error(destination: &Destination) -> ShroudError {
    ShroudError::Endpoint {
        message: format!("mock endpoint unreachable for {destination}"),
        source: None,
    }
}

fn caption(caption: Option<&str>) -> Option<String> {
    caption.map(str::to_string)
}

#[async_trait]
impl PluginAdapter for MockEndpoint {
    fn name(&self) -> &str {
        "mock-endpoint"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Messaging
    }

    async fn health_check(&self) -> Result<HealthStatus, ShroudError> {
        if self.offline.load(Ordering::SeqCst) {
            Ok(HealthStatus::Unhealthy("offline".into()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }

    async fn shutdown(&self) -> Result<(), ShroudError> {
        Ok(())
    }
}

#[async_trait]
impl MessagingEndpoint for MockEndpoint {
    async fn create_thread(
        &self,
        workspace: WorkspaceId,
        label: &str,
    ) -> Result<ThreadId, ShroudError> {
        tokio::task::yield_now().await;
        if self.deny_threads.load(Ordering::SeqCst) {
            return Err(ShroudError::PermissionDenied(
                "not enough rights to create a topic in the chat".into(),
            ));
        }
        let thread_id = ThreadId(self.next_thread.fetch_add(1, Ordering::SeqCst));
        self.threads.lock().await.push(CreatedThread {
            workspace,
            label: label.to_string(),
            thread_id,
        });
        Ok(thread_id)
    }

    async fn send_text(&self, to: &Destination, text: &str) -> Result<MessageId, ShroudError> {
        self.record(
            to,
            SendOperation::Text {
                text: text.to_string(),
            },
        )
        .await
    }

    async fn send_photo(
        &self,
        to: &Destination,
        file_id: &str,
        caption_text: Option<&str>,
    ) -> Result<MessageId, ShroudError> {
        self.record(
            to,
            SendOperation::Photo {
                file_id: file_id.to_string(),
                caption: caption(caption_text),
            },
        )
        .await
    }

    async fn send_video(
        &self,
        to: &Destination,
        file_id: &str,
        caption_text: Option<&str>,
    ) -> Result<MessageId, ShroudError> {
        self.record(
            to,
            SendOperation::Video {
                file_id: file_id.to_string(),
                caption: caption(caption_text),
            },
        )
        .await
    }

    async fn send_document(
        &self,
        to: &Destination,
        file_id: &str,
        caption_text: Option<&str>,
    ) -> Result<MessageId, ShroudError> {
        self.record(
            to,
            SendOperation::Document {
                file_id: file_id.to_string(),
                caption: caption(caption_text),
            },
        )
        .await
    }

    async fn send_audio(
        &self,
        to: &Destination,
        file_id: &str,
        caption_text: Option<&str>,
    ) -> Result<MessageId, ShroudError> {
        self.record(
            to,
            SendOperation::Audio {
                file_id: file_id.to_string(),
                caption: caption(caption_text),
            },
        )
        .await
    }

    async fn send_voice(
        &self,
        to: &Destination,
        file_id: &str,
        caption_text: Option<&str>,
    ) -> Result<MessageId, ShroudError> {
        self.record(
            to,
            SendOperation::Voice {
                file_id: file_id.to_string(),
                caption: caption(caption_text),
            },
        )
        .await
    }
}

#[async_trait]
impl EventSource for MockEndpoint {
    async fn connect(&mut self) -> Result<(), ShroudError> {
        Ok(())
    }

    async fn receive(&self) -> Result<InboundEvent, ShroudError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(event) = queue.pop_front() {
                    return Ok(event);
                }
            }
            self.notify.notified().await;
        }
    }
}
