// SPDX-FileCopyrightText: 2026 Shroud Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relay behavior end to end over the mock endpoint and the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use shroud_core::{
    BindingStore, ContentItem, ContentKind, Destination, ExternalUserId, InboundEvent,
    OutboundSend, SendOperation, ThreadId, WorkspaceId,
};
use shroud_relay::{texts, DeliveryEngine, DeliveryOutcome, IdentityRegistry, RelayService, RetryQueue};
use shroud_test_utils::{MemoryStore, MockEndpoint};
use tokio_util::sync::CancellationToken;

const WORKSPACE: WorkspaceId = WorkspaceId(-100_777);

struct Fixture {
    store: Arc<MemoryStore>,
    endpoint: Arc<MockEndpoint>,
    engine: Arc<DeliveryEngine>,
    service: Arc<RelayService>,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let endpoint = Arc::new(MockEndpoint::new());
    let engine = Arc::new(DeliveryEngine::new(
        endpoint.clone(),
        Arc::new(RetryQueue::new()),
        true,
    ));
    let service = Arc::new(RelayService::new(
        store.clone(),
        endpoint.clone(),
        engine.clone(),
        WORKSPACE,
        "welcome".into(),
    ));
    Fixture {
        store,
        endpoint,
        engine,
        service,
    }
}

fn thread(id: ThreadId) -> Destination {
    Destination::Thread {
        workspace: WORKSPACE,
        thread: id,
    }
}

fn user(id: i64) -> Destination {
    Destination::User(ExternalUserId(id))
}

// ---- Registration ----

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_contact_creates_one_binding() {
    let store = Arc::new(MemoryStore::new());
    let endpoint = Arc::new(MockEndpoint::new());
    let registry = Arc::new(IdentityRegistry::new(
        store.clone(),
        endpoint.clone(),
        WORKSPACE,
    ));

    let calls = (0..16).map(|_| {
        let registry = registry.clone();
        tokio::spawn(async move { registry.register_or_get(ExternalUserId(5)).await })
    });
    let results: Vec<_> = join_all(calls)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    assert_eq!(endpoint.created_threads().await.len(), 1);
    assert_eq!(store.rows().await.len(), 1);
    for r in &results {
        assert_eq!(r.anon_id, results[0].anon_id);
        assert_eq!(r.thread_id, results[0].thread_id);
    }
}

#[tokio::test]
async fn resolution_is_bijective() {
    let f = fixture();
    let registry = IdentityRegistry::new(f.store.clone(), f.endpoint.clone(), WORKSPACE);

    for id in 1..=10 {
        registry.register_or_get(ExternalUserId(id)).await.unwrap();
    }
    for row in f.store.rows().await {
        assert_eq!(
            registry.resolve_by_thread(row.thread_id).await.unwrap(),
            Some(row.user_id)
        );
        let by_user = f.store.find_by_user(row.user_id).await.unwrap().unwrap();
        assert_eq!(by_user.thread_id, row.thread_id);
    }
}

// ---- User to operator ----

#[tokio::test]
async fn first_message_from_user_42() {
    let f = fixture();
    f.service
        .handle_event(InboundEvent::UserMessage {
            user_id: ExternalUserId(42),
            content: ContentItem::text("hello"),
        })
        .await
        .unwrap();

    let threads = f.endpoint.created_threads().await;
    assert_eq!(threads.len(), 1);
    let rows = f.store.rows().await;
    assert_eq!(rows.len(), 1);
    let tag = rows[0].anon_id.tag();
    assert_eq!(tag.len(), 4);

    let to_thread = f.endpoint.sent_to(&thread(threads[0].thread_id)).await;
    assert_eq!(to_thread.len(), 1);
    assert_eq!(
        to_thread[0].operation,
        SendOperation::Text {
            text: format!("Сообщение от {tag}:\nhello")
        }
    );
    assert_eq!(f.endpoint.texts_to(&user(42)).await, vec![texts::ACK]);
}

#[tokio::test]
async fn photo_with_caption_round_trip() {
    let f = fixture();
    f.service
        .handle_event(InboundEvent::UserMessage {
            user_id: ExternalUserId(8),
            content: ContentItem::media(ContentKind::Photo, "photo-big", Some("hi".into())),
        })
        .await
        .unwrap();

    let row = f.store.rows().await.remove(0);
    let to_thread = f.endpoint.sent_to(&thread(row.thread_id)).await;
    assert_eq!(to_thread.len(), 1);
    assert_eq!(
        to_thread[0].operation,
        SendOperation::Photo {
            file_id: "photo-big".into(),
            caption: Some(format!("Сообщение от {}:\nhi", row.anon_id.tag())),
        }
    );

    f.endpoint.clear_sent().await;
    f.service
        .handle_event(InboundEvent::OperatorMessage {
            thread_id: Some(row.thread_id),
            content: ContentItem::media(ContentKind::Photo, "photo-reply", Some("hi".into())),
        })
        .await
        .unwrap();

    let to_user = f.endpoint.sent_to(&user(8)).await;
    assert_eq!(to_user.len(), 1);
    assert_eq!(
        to_user[0].operation,
        SendOperation::Photo {
            file_id: "photo-reply".into(),
            caption: Some("hi".into()),
        }
    );
}

#[tokio::test]
async fn unsupported_content_is_relayed_as_placeholder() {
    let f = fixture();
    f.service
        .handle_event(InboundEvent::UserMessage {
            user_id: ExternalUserId(9),
            content: ContentItem::unsupported(),
        })
        .await
        .unwrap();

    let row = f.store.rows().await.remove(0);
    let texts_in_thread = f.endpoint.texts_to(&thread(row.thread_id)).await;
    assert_eq!(
        texts_in_thread,
        vec![format!("Сообщение от {}:\n{}", row.anon_id.tag(), texts::UNSUPPORTED)]
    );
    assert_eq!(f.endpoint.texts_to(&user(9)).await, vec![texts::UNSUPPORTED]);
}

#[tokio::test]
async fn failed_relay_is_queued_and_user_told() {
    let f = fixture();
    f.endpoint.fail_next_sends(1);
    f.service
        .handle_event(InboundEvent::UserMessage {
            user_id: ExternalUserId(11),
            content: ContentItem::text("are you there"),
        })
        .await
        .unwrap();

    assert_eq!(f.engine.queue().len().await, 1);
    assert_eq!(f.endpoint.texts_to(&user(11)).await, vec![texts::DELAY_NOTICE]);

    let report = f.engine.drain_once().await;
    assert_eq!(report.delivered, 1);
    let row = f.store.rows().await.remove(0);
    assert_eq!(f.endpoint.sent_to(&thread(row.thread_id)).await.len(), 1);
}

#[tokio::test]
async fn unpersisted_binding_still_relays_both_ways() {
    let f = fixture();
    f.store.fail_inserts(true);

    f.service
        .handle_event(InboundEvent::UserMessage {
            user_id: ExternalUserId(13),
            content: ContentItem::text("first"),
        })
        .await
        .unwrap();

    let threads = f.endpoint.created_threads().await;
    assert_eq!(threads.len(), 1);
    let thread_id = threads[0].thread_id;
    assert_eq!(f.endpoint.sent_to(&thread(thread_id)).await.len(), 1);
    assert_eq!(f.endpoint.texts_to(&user(13)).await, vec![texts::ACK]);

    f.service
        .handle_event(InboundEvent::OperatorMessage {
            thread_id: Some(thread_id),
            content: ContentItem::text("answer"),
        })
        .await
        .unwrap();
    assert_eq!(
        f.endpoint.texts_to(&user(13)).await,
        vec![texts::ACK, "answer"]
    );

    // A second message reuses the thread.
    f.service
        .handle_event(InboundEvent::UserMessage {
            user_id: ExternalUserId(13),
            content: ContentItem::text("second"),
        })
        .await
        .unwrap();
    assert_eq!(f.endpoint.created_threads().await.len(), 1);
}

#[tokio::test]
async fn storage_outage_gets_apology() {
    let f = fixture();
    f.store.fail_reads(true);
    let result = f
        .service
        .handle_event(InboundEvent::UserMessage {
            user_id: ExternalUserId(14),
            content: ContentItem::text("hello?"),
        })
        .await;

    assert!(result.is_err());
    assert!(f.endpoint.created_threads().await.is_empty());
    assert_eq!(f.endpoint.texts_to(&user(14)).await, vec![texts::APOLOGY]);
}

#[tokio::test]
async fn start_during_storage_outage_gets_apology() {
    let f = fixture();
    f.store.fail_reads(true);
    let result = f
        .service
        .handle_event(InboundEvent::UserStart {
            user_id: ExternalUserId(9),
        })
        .await;

    assert!(result.is_err());
    assert!(f.endpoint.created_threads().await.is_empty());
    assert_eq!(f.endpoint.texts_to(&user(9)).await, vec![texts::APOLOGY]);
}

#[tokio::test]
async fn start_without_topic_rights_gets_apology() {
    let f = fixture();
    f.endpoint.deny_thread_creation(true);
    let result = f
        .service
        .handle_event(InboundEvent::UserStart {
            user_id: ExternalUserId(10),
        })
        .await;

    assert!(result.is_err());
    assert!(f.store.rows().await.is_empty());
    assert_eq!(f.endpoint.texts_to(&user(10)).await, vec![texts::APOLOGY]);
}

// ---- Operator to user ----

#[tokio::test]
async fn edit_in_bound_thread_is_relayed() {
    let f = fixture();
    f.service
        .handle_event(InboundEvent::UserMessage {
            user_id: ExternalUserId(21),
            content: ContentItem::text("q"),
        })
        .await
        .unwrap();
    let thread_id = f.store.rows().await[0].thread_id;

    f.service
        .handle_event(InboundEvent::OperatorMessageEdited {
            thread_id: Some(thread_id),
            content: ContentItem::text("a (edited)"),
        })
        .await
        .unwrap();
    assert_eq!(
        f.endpoint.texts_to(&user(21)).await,
        vec![texts::ACK, "a (edited)"]
    );
}

#[tokio::test]
async fn operator_lookup_failure_is_reported_in_thread() {
    let f = fixture();
    f.store.fail_reads(true);
    let result = f
        .service
        .handle_event(InboundEvent::OperatorMessage {
            thread_id: Some(ThreadId(300)),
            content: ContentItem::text("reply"),
        })
        .await;

    assert!(result.is_err());
    assert_eq!(
        f.endpoint.texts_to(&thread(ThreadId(300))).await,
        vec![texts::OPERATOR_REPLY_FAILED]
    );
}

#[tokio::test]
async fn unsupported_operator_content_is_ignored() {
    let f = fixture();
    f.service
        .handle_event(InboundEvent::OperatorMessage {
            thread_id: Some(ThreadId(100)),
            content: ContentItem::unsupported(),
        })
        .await
        .unwrap();
    assert_eq!(f.endpoint.send_attempts(), 0);
}

// ---- Delivery ----

#[tokio::test]
async fn delivered_exactly_once_after_transient_failures() {
    let f = fixture();
    f.endpoint.fail_next_sends(3);
    let send = OutboundSend::text(thread(ThreadId(1)), "payload");

    let outcome = f.engine.send(send).await;
    assert!(matches!(outcome, DeliveryOutcome::Queued { .. }));

    for _ in 0..2 {
        assert_eq!(f.engine.drain_once().await.delivered, 0);
    }
    assert_eq!(f.engine.drain_once().await.delivered, 1);
    assert_eq!(f.engine.drain_once().await.attempted, 0);

    assert_eq!(f.endpoint.texts_to(&thread(ThreadId(1))).await, vec!["payload"]);
}

#[tokio::test]
async fn permanent_failure_stays_queued() {
    let f = fixture();
    f.endpoint.set_offline(true);
    f.engine
        .send(OutboundSend::text(thread(ThreadId(1)), "never"))
        .await;

    for _ in 0..50 {
        f.engine.drain_once().await;
    }
    let queued = f.engine.queue().snapshot().await;
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].attempts, 51);
}

#[tokio::test(start_paused = true)]
async fn drain_loop_delivers_after_outage() {
    let f = fixture();
    f.endpoint.set_offline(true);
    f.engine
        .send(OutboundSend::text(thread(ThreadId(2)), "late"))
        .await;

    let cancel = CancellationToken::new();
    let drain = tokio::spawn({
        let engine = f.engine.clone();
        let cancel = cancel.clone();
        async move { engine.run_drain_loop(Duration::from_secs(10), cancel).await }
    });

    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(f.engine.queue().len().await, 1);

    f.endpoint.set_offline(false);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(f.engine.queue().is_empty().await);
    assert_eq!(f.endpoint.texts_to(&thread(ThreadId(2))).await, vec!["late"]);

    cancel.cancel();
    drain.await.unwrap();
}

// ---- Event loop ----

#[tokio::test]
async fn run_handles_events_until_cancelled() {
    let f = fixture();
    let cancel = CancellationToken::new();
    let run = tokio::spawn(f.service.clone().run(f.endpoint.clone(), cancel.clone()));

    f.endpoint
        .inject_event(InboundEvent::UserStart {
            user_id: ExternalUserId(50),
        })
        .await;
    f.endpoint
        .inject_event(InboundEvent::UserMessage {
            user_id: ExternalUserId(51),
            content: ContentItem::text("ping"),
        })
        .await;

    tokio::time::timeout(Duration::from_secs(5), async {
        while f.endpoint.sent_count().await < 3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    cancel.cancel();
    run.await.unwrap().unwrap();

    assert_eq!(f.endpoint.texts_to(&user(50)).await, vec!["welcome"]);
    assert_eq!(f.endpoint.texts_to(&user(51)).await, vec![texts::ACK]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn messages_from_one_user_keep_their_order() {
    let f = fixture();
    let cancel = CancellationToken::new();
    let run = tokio::spawn(f.service.clone().run(f.endpoint.clone(), cancel.clone()));

    let texts: Vec<String> = (0..20).map(|i| format!("msg {i}")).collect();
    for text in &texts {
        f.endpoint
            .inject_event(InboundEvent::UserMessage {
                user_id: ExternalUserId(60),
                content: ContentItem::text(text.clone()),
            })
            .await;
    }

    let thread_id = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(binding) = f.store.find_by_user(ExternalUserId(60)).await.unwrap() {
                if f.endpoint.texts_to(&thread(binding.thread_id)).await.len() == texts.len() {
                    return binding.thread_id;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    cancel.cancel();
    run.await.unwrap().unwrap();

    let relayed = f.endpoint.texts_to(&thread(thread_id)).await;
    let bodies: Vec<&str> = relayed
        .iter()
        .map(|t| t.split_once('\n').unwrap().1)
        .collect();
    assert_eq!(bodies, texts);
    assert_eq!(f.endpoint.created_threads().await.len(), 1);
}
