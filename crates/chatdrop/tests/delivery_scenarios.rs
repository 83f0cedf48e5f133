use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chatdrop::config::ServiceConfig;
use chatdrop::coordinator::MessageDeliveryCoordinator;
use chatdrop::document_store::{BatchOutcome, Document, DocumentStore, Filter, WriteBatch};
use chatdrop::error::{ChatError, StoreError};
use chatdrop::metrics::DeliveryMetrics;
use chatdrop::storage::memory_document::MemoryDocumentStore;
use chatdrop::testing::TestHarness;
use chatdrop::types::{DocumentRef, UserId};
use serde_json::{json, Value};
use tokio::sync::{Notify, Semaphore};

/// Holds the first call that reaches it until released.
struct Gate {
    armed: AtomicBool,
    arrived: Notify,
    permits: Semaphore,
}

impl Gate {
    fn holding() -> Self {
        Self {
            armed: AtomicBool::new(true),
            arrived: Notify::new(),
            permits: Semaphore::new(0),
        }
    }

    fn passing() -> Self {
        Self {
            armed: AtomicBool::new(false),
            ..Self::holding()
        }
    }

    async fn pass(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.arrived.notify_one();
            self.permits.acquire().await.unwrap().forget();
        }
    }

    async fn reached(&self) {
        self.arrived.notified().await;
    }

    fn release(&self) {
        self.permits.add_permits(1);
    }
}

/// In-memory store that can stall the backfill write or the acknowledgment batch.
struct GatedStore {
    inner: MemoryDocumentStore,
    backfill: Gate,
    commit: Gate,
}

impl GatedStore {
    fn new(backfill: Gate, commit: Gate) -> Self {
        Self {
            inner: MemoryDocumentStore::new(),
            backfill,
            commit,
        }
    }

    fn seed_users(&self, ids: &[&str]) {
        for id in ids {
            self.inner.insert("users", id, json!({ "suffixType": "cat" }));
        }
    }

    fn read_flag(&self, id: &str) -> Option<Value> {
        self.inner
            .snapshot(&DocumentRef::new("messages", id))
            .and_then(|doc| doc.get("read").cloned())
    }
}

#[async_trait]
impl DocumentStore for GatedStore {
    async fn get(&self, target: &DocumentRef) -> Result<Option<Document>, StoreError> {
        self.inner.get(target).await
    }

    async fn query(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<Document>, StoreError> {
        self.inner.query(collection, filter).await
    }

    async fn update(
        &self,
        target: &DocumentRef,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        self.inner.update(target, field, value).await
    }

    async fn update_if_missing(
        &self,
        target: &DocumentRef,
        field: &str,
        value: Value,
    ) -> Result<bool, StoreError> {
        self.backfill.pass().await;
        self.inner.update_if_missing(target, field, value).await
    }

    async fn commit_batch(&self, batch: WriteBatch) -> BatchOutcome {
        self.commit.pass().await;
        self.inner.commit_batch(batch).await
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        self.inner.list_collections().await
    }
}

fn coordinator_over(store: Arc<GatedStore>) -> MessageDeliveryCoordinator {
    MessageDeliveryCoordinator::new(
        store,
        &ServiceConfig::default(),
        Arc::new(DeliveryMetrics::unregistered()),
    )
}

#[tokio::test]
async fn cat_user_receives_only_unread_message() {
    let harness = TestHarness::new();
    harness.add_user("u1", "cat");
    harness.add_message("m1", "hello", Some(false));
    harness.add_message("m2", "world", Some(true));

    let delivery = harness
        .coordinator
        .deliver(&UserId::new("u1"))
        .await
        .unwrap();
    assert_eq!(delivery.messages, vec!["hellonyan".to_string()]);

    let report = delivery.ack.wait().await;
    assert_eq!(report.acknowledged, 1);
    assert_eq!(harness.read_flag("m1"), Some(json!(true)));
    assert_eq!(harness.read_flag("m2"), Some(json!(true)));
}

#[tokio::test]
async fn delivered_text_is_preserved_byte_for_byte() {
    let harness = TestHarness::new();
    harness.add_user("u1", "dog");
    let texts = ["  spaced  ", "ünïcödé 🐾", "", "line\nbreak"];
    for (i, text) in texts.iter().enumerate() {
        harness.add_message(&format!("m{i}"), *text, Some(false));
    }

    let mut messages = harness
        .coordinator
        .get_chat_messages(&UserId::new("u1"))
        .await
        .unwrap();
    messages.sort();

    let mut expected: Vec<String> = texts.iter().map(|t| format!("{t}woof")).collect();
    expected.sort();
    assert_eq!(messages, expected);
}

#[tokio::test]
async fn mixed_valid_and_malformed_documents() {
    let harness = TestHarness::new();
    harness.add_user("u1", "cat");
    harness.add_message("good", "hi", Some(false));
    harness.add_message("bad", 42, Some(false));

    let delivery = harness
        .coordinator
        .deliver(&UserId::new("u1"))
        .await
        .unwrap();
    assert_eq!(delivery.messages, vec!["hinyan".to_string()]);
    delivery.ack.wait().await;

    assert_eq!(harness.read_flag("good"), Some(json!(true)));
    assert_eq!(harness.read_flag("bad"), Some(json!(false)));
    assert_eq!(harness.metrics.skipped.get(), 1);
}

#[tokio::test]
async fn unknown_user_leaves_messages_unread() {
    let harness = TestHarness::new();
    harness.add_message("m1", "hello", Some(false));

    let err = harness
        .coordinator
        .deliver(&UserId::new("ghost"))
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::UserNotFound { .. }));
    assert_eq!(err.to_string(), "user not found: ghost");
    assert_eq!(harness.read_flag("m1"), Some(json!(false)));
}

#[tokio::test]
async fn unrecognised_preference_delivers_without_suffix() {
    let harness = TestHarness::new();
    harness.add_user("u1", "hamster");
    harness.add_message("m1", "plain", Some(false));

    let messages = harness
        .coordinator
        .get_chat_messages(&UserId::new("u1"))
        .await
        .unwrap();
    assert_eq!(messages, vec!["plain".to_string()]);
}

#[tokio::test]
async fn failed_acknowledgment_means_redelivery() {
    let harness = TestHarness::new();
    harness.add_user("u1", "cat");
    harness.add_message("m1", "again", Some(false));
    harness.store.fail_writes_to(harness.message_ref("m1"));

    let first = harness
        .coordinator
        .deliver(&UserId::new("u1"))
        .await
        .unwrap();
    assert_eq!(first.messages, vec!["againnyan".to_string()]);
    let report = first.ack.wait().await;
    assert_eq!(report.failed, 1);
    assert_eq!(harness.metrics.ack_failures.get(), 1);

    harness.store.clear_faults();
    let second = harness
        .coordinator
        .deliver(&UserId::new("u1"))
        .await
        .unwrap();
    assert_eq!(second.messages, first.messages);
    second.ack.wait().await;

    let third = harness
        .coordinator
        .get_chat_messages(&UserId::new("u1"))
        .await
        .unwrap();
    assert!(third.is_empty());
}

#[tokio::test]
async fn legacy_messages_become_deliverable_once() {
    let harness = TestHarness::new();
    harness.add_user("u1", "character");
    harness.add_message("legacy", "old news", None);
    assert_eq!(harness.read_flag("legacy"), None);

    let delivery = harness
        .coordinator
        .deliver(&UserId::new("u1"))
        .await
        .unwrap();
    assert_eq!(delivery.messages, vec!["old newsyo".to_string()]);
    delivery.ack.wait().await;
    assert_eq!(harness.read_flag("legacy"), Some(json!(true)));
    assert_eq!(harness.metrics.backfilled.get(), 1);

    let writes = harness.store.write_count();
    let again = harness
        .coordinator
        .get_chat_messages(&UserId::new("u1"))
        .await
        .unwrap();
    assert!(again.is_empty());
    assert_eq!(harness.store.write_count(), writes);
}

#[tokio::test]
async fn concurrent_callers_can_both_receive_a_message() {
    let store = Arc::new(GatedStore::new(Gate::passing(), Gate::holding()));
    store.seed_users(&["u1", "u2"]);
    store.inner.insert("messages", "m1", json!({ "message": "race", "read": false }));
    let coordinator = coordinator_over(store.clone());

    let first = coordinator.deliver(&UserId::new("u1")).await.unwrap();
    store.commit.reached().await;
    let second = coordinator.deliver(&UserId::new("u2")).await.unwrap();

    assert_eq!(first.messages, vec!["racenyan".to_string()]);
    assert_eq!(second.messages, first.messages);

    store.commit.release();
    assert_eq!(first.ack.wait().await.acknowledged, 1);
    assert_eq!(second.ack.wait().await.acknowledged, 1);
    assert_eq!(store.read_flag("m1"), Some(json!(true)));
}

#[tokio::test]
async fn late_backfill_never_reverts_an_acknowledged_message() {
    let store = Arc::new(GatedStore::new(Gate::holding(), Gate::passing()));
    store.seed_users(&["u1", "u2"]);
    store.inner.insert("messages", "m1", json!({ "message": "legacy" }));
    let coordinator = Arc::new(coordinator_over(store.clone()));

    let stalled = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.deliver(&UserId::new("u1")).await })
    };
    store.backfill.reached().await;

    let delivery = coordinator.deliver(&UserId::new("u2")).await.unwrap();
    assert_eq!(delivery.messages, vec!["legacynyan".to_string()]);
    delivery.ack.wait().await;
    assert_eq!(store.read_flag("m1"), Some(json!(true)));

    store.backfill.release();
    let late = stalled.await.unwrap().unwrap();
    assert!(late.messages.is_empty());
    late.ack.wait().await;
    assert_eq!(store.read_flag("m1"), Some(json!(true)));
}

#[tokio::test]
async fn custom_collection_names_are_honoured() {
    let harness = TestHarness::with_config(ServiceConfig {
        users_collection: "profiles".into(),
        messages_collection: "inbox".into(),
        ..Default::default()
    });
    harness.add_user("u1", "dog");
    harness.add_message("m1", "custom", Some(false));
    harness
        .store
        .insert("messages", "decoy", json!({ "message": "ignored", "read": false }));

    let messages = harness
        .coordinator
        .get_chat_messages(&UserId::new("u1"))
        .await
        .unwrap();
    assert_eq!(messages, vec!["customwoof".to_string()]);
}
