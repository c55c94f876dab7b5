// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The relay service: consumes inbound events and drives registration,
//! dispatch and user notices.
//!
//! Each event is handled in its own task. Events of one conversation (one
//! user's private chat, or one operator thread) are handled in arrival
//! order; different conversations run concurrently. A failure while
//! handling one event is logged and never stops the loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use shroud_config::ShroudConfig;
use shroud_core::{
    BindingStore, ContentItem, ContentKind, Destination, EventSource, ExternalUserId,
    InboundEvent, MessagingEndpoint, ShroudError, ThreadId, WorkspaceId,
};

use crate::delivery::{DeliveryEngine, DeliveryOutcome};
use crate::dispatcher::Dispatcher;
use crate::recording;
use crate::registry::{IdentityRegistry, Registration};
use crate::texts;

/// How long shutdown waits for in-flight events.
const IN_FLIGHT_GRACE: Duration = Duration::from_secs(5);

/// The conversation an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Lane {
    User(ExternalUserId),
    Thread(ThreadId),
}

impl Lane {
    fn of(event: &InboundEvent) -> Option<Self> {
        match event {
            InboundEvent::UserStart { user_id } | InboundEvent::UserMessage { user_id, .. } => {
                Some(Self::User(*user_id))
            }
            InboundEvent::OperatorMessage { thread_id, .. }
            | InboundEvent::OperatorMessageEdited { thread_id, .. } => {
                (*thread_id).map(Self::Thread)
            }
        }
    }
}

/// Completion signal of the latest event queued on a lane.
struct LaneTail {
    seq: u64,
    done: oneshot::Receiver<()>,
}

/// Coordinates the registry, the dispatcher and the messaging endpoint.
pub struct RelayService {
    registry: IdentityRegistry,
    dispatcher: Dispatcher,
    endpoint: Arc<dyn MessagingEndpoint>,
    workspace: WorkspaceId,
    greeting: String,
    tasks: TaskTracker,
    lanes: DashMap<Lane, LaneTail>,
    lane_seq: AtomicU64,
}

impl RelayService {
    pub fn new(
        store: Arc<dyn BindingStore>,
        endpoint: Arc<dyn MessagingEndpoint>,
        engine: Arc<DeliveryEngine>,
        workspace: WorkspaceId,
        greeting: String,
    ) -> Self {
        Self {
            registry: IdentityRegistry::new(store, endpoint.clone(), workspace),
            dispatcher: Dispatcher::new(engine, workspace),
            endpoint,
            workspace,
            greeting,
            tasks: TaskTracker::new(),
            lanes: DashMap::new(),
            lane_seq: AtomicU64::new(0),
        }
    }

    /// Builds the service from validated configuration.
    pub fn from_config(
        config: &ShroudConfig,
        store: Arc<dyn BindingStore>,
        endpoint: Arc<dyn MessagingEndpoint>,
        engine: Arc<DeliveryEngine>,
    ) -> Result<Self, ShroudError> {
        let workspace = config
            .telegram
            .workspace()
            .ok_or_else(|| ShroudError::Config("telegram.group_id is required".into()))?;
        Ok(Self::new(
            store,
            endpoint,
            engine,
            workspace,
            config.relay.greeting.clone(),
        ))
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    /// Runs until `cancel` fires or the event source closes.
    ///
    /// On exit, waits briefly for in-flight events; anything still running
    /// after that is abandoned.
    pub async fn run(
        self: Arc<Self>,
        source: Arc<dyn EventSource>,
        cancel: CancellationToken,
    ) -> Result<(), ShroudError> {
        info!(workspace = %self.workspace, "relay loop running");

        let result = loop {
            tokio::select! {
                event = source.receive() => {
                    match event {
                        Ok(event) => self.spawn_in_lane(event),
                        Err(e) => {
                            error!(error = %e, "event source failed, stopping relay loop");
                            break Err(e);
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping relay loop");
                    break Ok(());
                }
            }
        };

        self.tasks.close();
        if tokio::time::timeout(IN_FLIGHT_GRACE, self.tasks.wait())
            .await
            .is_err()
        {
            warn!(in_flight = self.tasks.len(), "in-flight events abandoned");
        }

        info!("relay loop stopped");
        result
    }

    /// Spawns the handler for `event` behind the previous event of the same
    /// conversation. The lane is claimed here, in arrival order, before the
    /// task starts.
    fn spawn_in_lane(self: &Arc<Self>, event: InboundEvent) {
        let lane = Lane::of(&event);
        let (done_tx, done_rx) = oneshot::channel::<()>();
        let seq = self.lane_seq.fetch_add(1, Ordering::Relaxed);
        let previous = lane.and_then(|lane| {
            self.lanes
                .insert(lane, LaneTail { seq, done: done_rx })
                .map(|tail| tail.done)
        });

        let service = self.clone();
        self.tasks.spawn(async move {
            if let Some(previous) = previous {
                // Err means the previous handler finished (or was dropped).
                let _ = previous.await;
            }
            let label = event.label();
            if let Err(e) = service.handle_event(event).await {
                warn!(event = label, error = %e, "event handling failed");
            }
            drop(done_tx);
            if let Some(lane) = lane {
                service.lanes.remove_if(&lane, |_, tail| tail.seq == seq);
            }
        });
    }

    /// Handles one inbound event to completion.
    pub async fn handle_event(&self, event: InboundEvent) -> Result<(), ShroudError> {
        recording::record_event(event.label());
        match event {
            InboundEvent::UserStart { user_id } => self.handle_start(user_id).await,
            InboundEvent::UserMessage { user_id, content } => {
                self.handle_user_message(user_id, content).await
            }
            InboundEvent::OperatorMessage { thread_id, content } => {
                self.handle_operator_message(thread_id, content, false).await
            }
            InboundEvent::OperatorMessageEdited { thread_id, content } => {
                self.handle_operator_message(thread_id, content, true).await
            }
        }
    }

    async fn handle_start(&self, user_id: ExternalUserId) -> Result<(), ShroudError> {
        if let Err(e) = self.registration_for(user_id).await {
            self.notify_user(user_id, texts::APOLOGY).await;
            return Err(e);
        }
        self.notify_user(user_id, &self.greeting).await;
        Ok(())
    }

    async fn handle_user_message(
        &self,
        user_id: ExternalUserId,
        content: ContentItem,
    ) -> Result<(), ShroudError> {
        debug!(user_id = %user_id, kind = %content.kind, "user message");

        let registration = match self.registration_for(user_id).await {
            Ok(registration) => registration,
            Err(e) => {
                self.notify_user(user_id, texts::APOLOGY).await;
                return Err(e);
            }
        };

        let outcome = match self
            .dispatcher
            .relay_user_to_operator(&registration, &content)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                self.notify_user(user_id, texts::APOLOGY).await;
                return Err(e);
            }
        };

        let notice = match outcome {
            DeliveryOutcome::Queued { .. } => texts::DELAY_NOTICE,
            DeliveryOutcome::Delivered(_) if content.kind == ContentKind::Unsupported => {
                texts::UNSUPPORTED
            }
            DeliveryOutcome::Delivered(_) => {
                info!(
                    user_id = %user_id,
                    thread_id = %registration.thread_id,
                    "user message relayed"
                );
                texts::ACK
            }
        };
        self.notify_user(user_id, notice).await;
        Ok(())
    }

    async fn handle_operator_message(
        &self,
        thread_id: Option<ThreadId>,
        content: ContentItem,
        edited: bool,
    ) -> Result<(), ShroudError> {
        if content.kind == ContentKind::Unsupported {
            debug!(edited, "ignoring operator message without relayable content");
            return Ok(());
        }
        let Some(thread_id) = thread_id else {
            debug!(edited, "ignoring operator message outside a thread");
            return Ok(());
        };

        let user_id = match self.registry.resolve_by_thread(thread_id).await {
            Ok(Some(user_id)) => user_id,
            Ok(None) if edited => {
                debug!(thread_id = %thread_id, "edit in unbound thread ignored");
                return Ok(());
            }
            Ok(None) => {
                warn!(thread_id = %thread_id, "message in unbound thread ignored");
                return Ok(());
            }
            Err(e) => {
                error!(thread_id = %thread_id, error = %e, "thread lookup failed");
                self.notify_thread(thread_id, texts::OPERATOR_REPLY_FAILED).await;
                return Err(e);
            }
        };

        match self
            .dispatcher
            .relay_operator_to_user(user_id, &content)
            .await
        {
            Ok(outcome) => {
                info!(
                    thread_id = %thread_id,
                    user_id = %user_id,
                    edited,
                    delivered = outcome.is_delivered(),
                    "operator reply relayed"
                );
                Ok(())
            }
            Err(e) => {
                self.notify_thread(thread_id, texts::OPERATOR_REPLY_FAILED).await;
                Err(e)
            }
        }
    }

    /// Registers the user, falling back to the in-memory thread when the
    /// binding could not be stored.
    async fn registration_for(
        &self,
        user_id: ExternalUserId,
    ) -> Result<Registration, ShroudError> {
        match self.registry.register_or_get(user_id).await {
            Ok(registration) => Ok(registration),
            Err(e) => match Registration::from_failure(&e) {
                Some(registration) => Ok(registration),
                None => {
                    error!(user_id = %user_id, error = %e, "registration failed");
                    Err(e)
                }
            },
        }
    }

    async fn notify_user(&self, user_id: ExternalUserId, text: &str) {
        let to = Destination::User(user_id);
        if let Err(e) = self.endpoint.send_text(&to, text).await {
            debug!(user_id = %user_id, error = %e, "user notice not sent");
        }
    }

    async fn notify_thread(&self, thread_id: ThreadId, text: &str) {
        let to = Destination::Thread {
            workspace: self.workspace,
            thread: thread_id,
        };
        if let Err(e) = self.endpoint.send_text(&to, text).await {
            debug!(thread_id = %thread_id, error = %e, "operator notice not sent");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::RetryQueue;
    use shroud_test_utils::{MemoryStore, MockEndpoint};
    use tracing_test::traced_test;

    const WORKSPACE: WorkspaceId = WorkspaceId(-100_200);

    fn service() -> (RelayService, Arc<MockEndpoint>) {
        let endpoint = Arc::new(MockEndpoint::new());
        let engine = Arc::new(DeliveryEngine::new(
            endpoint.clone(),
            Arc::new(RetryQueue::new()),
            true,
        ));
        let service = RelayService::new(
            Arc::new(MemoryStore::new()),
            endpoint.clone(),
            engine,
            WORKSPACE,
            "hi there".into(),
        );
        (service, endpoint)
    }

    #[tokio::test]
    #[traced_test]
    async fn new_message_in_unbound_thread_is_an_anomaly() {
        let (service, endpoint) = service();
        service
            .handle_event(InboundEvent::OperatorMessage {
                thread_id: Some(ThreadId(555)),
                content: ContentItem::text("anyone?"),
            })
            .await
            .unwrap();

        assert_eq!(endpoint.send_attempts(), 0);
        assert!(logs_contain("message in unbound thread ignored"));
    }

    #[tokio::test]
    #[traced_test]
    async fn edit_in_unbound_thread_is_silent() {
        let (service, endpoint) = service();
        service
            .handle_event(InboundEvent::OperatorMessageEdited {
                thread_id: Some(ThreadId(555)),
                content: ContentItem::text("fixed typo"),
            })
            .await
            .unwrap();

        assert_eq!(endpoint.send_attempts(), 0);
        assert!(!logs_contain("WARN"));
    }

    #[test]
    fn lanes_follow_the_conversation() {
        let user = InboundEvent::UserMessage {
            user_id: ExternalUserId(1),
            content: ContentItem::text("x"),
        };
        let start = InboundEvent::UserStart {
            user_id: ExternalUserId(1),
        };
        assert_eq!(Lane::of(&user), Some(Lane::User(ExternalUserId(1))));
        assert_eq!(Lane::of(&user), Lane::of(&start));

        let edit = InboundEvent::OperatorMessageEdited {
            thread_id: Some(ThreadId(4)),
            content: ContentItem::text("y"),
        };
        assert_eq!(Lane::of(&edit), Some(Lane::Thread(ThreadId(4))));

        let general = InboundEvent::OperatorMessage {
            thread_id: None,
            content: ContentItem::text("z"),
        };
        assert_eq!(Lane::of(&general), None);
    }

    #[tokio::test]
    async fn finished_lanes_are_dropped() {
        let (service, endpoint) = service();
        let service = Arc::new(service);
        for _ in 0..3 {
            service.spawn_in_lane(InboundEvent::UserStart {
                user_id: ExternalUserId(8),
            });
        }
        service.tasks.close();
        service.tasks.wait().await;

        assert!(service.lanes.is_empty());
        assert_eq!(endpoint.texts_to(&Destination::User(ExternalUserId(8))).await.len(), 3);
    }

    #[tokio::test]
    async fn start_registers_and_greets() {
        let (service, endpoint) = service();
        service
            .handle_event(InboundEvent::UserStart {
                user_id: ExternalUserId(3),
            })
            .await
            .unwrap();

        assert_eq!(endpoint.created_threads().await.len(), 1);
        assert_eq!(
            endpoint
                .texts_to(&Destination::User(ExternalUserId(3)))
                .await,
            vec!["hi there"]
        );
    }

    #[tokio::test]
    async fn general_topic_messages_are_ignored() {
        let (service, endpoint) = service();
        service
            .handle_event(InboundEvent::OperatorMessage {
                thread_id: None,
                content: ContentItem::text("team chat"),
            })
            .await
            .unwrap();
        assert_eq!(endpoint.send_attempts(), 0);
    }

    #[test]
    fn from_config_requires_group() {
        let endpoint = Arc::new(MockEndpoint::new());
        let engine = Arc::new(DeliveryEngine::new(
            endpoint.clone(),
            Arc::new(RetryQueue::new()),
            true,
        ));
        let result = RelayService::from_config(
            &ShroudConfig::default(),
            Arc::new(MemoryStore::new()),
            endpoint,
            engine,
        );
        assert!(matches!(result, Err(ShroudError::Config(_))));
    }
}
