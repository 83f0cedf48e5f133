use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::document_store::{BatchOutcome, Document, DocumentStore, Filter, WriteBatch};
use crate::error::StoreError;
use crate::types::DocumentRef;

type Collection = BTreeMap<String, Map<String, Value>>;

/// In-memory document store for tests and local runs.
///
/// Documents iterate in lexicographic id order. Faults can be injected per
/// operation so callers can exercise their failure paths.
pub struct MemoryDocumentStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    collections: BTreeMap<String, Collection>,
    /// Successful writes applied so far (single and batched).
    writes: u64,
    unavailable: bool,
    failing_gets: HashSet<String>,
    failing_queries: HashSet<String>,
    failing_writes: HashSet<DocumentRef>,
}

impl Inner {
    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable {
                reason: "store marked unavailable".into(),
            });
        }
        Ok(())
    }

    fn writable(&mut self, target: &DocumentRef) -> Result<&mut Map<String, Value>, StoreError> {
        self.check_available()?;
        if self.failing_writes.contains(target) {
            return Err(StoreError::Operation {
                reason: format!("injected write failure for {target}"),
            });
        }
        self.collections
            .get_mut(&target.collection)
            .and_then(|c| c.get_mut(&target.id))
            .ok_or_else(|| StoreError::DocumentNotFound {
                target: target.clone(),
            })
    }

    fn apply(
        &mut self,
        target: &DocumentRef,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        self.writable(target)?.insert(field.to_string(), value);
        self.writes += 1;
        Ok(())
    }

    fn apply_if_missing(
        &mut self,
        target: &DocumentRef,
        field: &str,
        value: Value,
    ) -> Result<bool, StoreError> {
        let doc = self.writable(target)?;
        if doc.contains_key(field) {
            return Ok(false);
        }
        doc.insert(field.to_string(), value);
        self.writes += 1;
        Ok(true)
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Build a store from a fixture shaped `{"collection": {"doc-id": {...}}}`.
    pub fn from_json(fixture: Value) -> Result<Self, serde_json::Error> {
        let collections: BTreeMap<String, Collection> = serde_json::from_value(fixture)?;
        Ok(Self {
            inner: Mutex::new(Inner {
                collections,
                ..Inner::default()
            }),
        })
    }

    /// Insert or replace a document. Non-object values are stored as an empty document.
    pub fn insert(&self, collection: &str, id: &str, data: Value) {
        let data = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.inner
            .lock()
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
    }

    /// Current field map of a document, bypassing fault injection.
    pub fn snapshot(&self, target: &DocumentRef) -> Option<Map<String, Value>> {
        self.inner
            .lock()
            .collections
            .get(&target.collection)
            .and_then(|c| c.get(&target.id))
            .cloned()
    }

    /// Number of writes applied since creation.
    pub fn write_count(&self) -> u64 {
        self.inner.lock().writes
    }

    /// Make every operation fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().unavailable = unavailable;
    }

    /// Fail `get` calls targeting `collection`.
    pub fn fail_gets_in(&self, collection: &str) {
        self.inner.lock().failing_gets.insert(collection.to_string());
    }

    /// Fail queries against `collection`.
    pub fn fail_queries_in(&self, collection: &str) {
        self.inner
            .lock()
            .failing_queries
            .insert(collection.to_string());
    }

    /// Fail single and batched writes to `target`.
    pub fn fail_writes_to(&self, target: DocumentRef) {
        self.inner.lock().failing_writes.insert(target);
    }

    pub fn clear_faults(&self) {
        let mut inner = self.inner.lock();
        inner.unavailable = false;
        inner.failing_gets.clear();
        inner.failing_queries.clear();
        inner.failing_writes.clear();
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, target: &DocumentRef) -> Result<Option<Document>, StoreError> {
        let inner = self.inner.lock();
        inner.check_available()?;
        if inner.failing_gets.contains(&target.collection) {
            return Err(StoreError::Operation {
                reason: format!("injected get failure for {target}"),
            });
        }
        Ok(inner
            .collections
            .get(&target.collection)
            .and_then(|c| c.get(&target.id))
            .map(|data| Document::new(target.clone(), data.clone())))
    }

    async fn query(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<Document>, StoreError> {
        let inner = self.inner.lock();
        inner.check_available()?;
        if inner.failing_queries.contains(collection) {
            return Err(StoreError::Operation {
                reason: format!("injected query failure for {collection}"),
            });
        }
        let Some(docs) = inner.collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .filter(|(_, data)| filter.matches(data))
            .map(|(id, data)| {
                Document::new(DocumentRef::new(collection, id.as_str()), data.clone())
            })
            .collect())
    }

    async fn update(
        &self,
        target: &DocumentRef,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        self.inner.lock().apply(target, field, value)
    }

    async fn update_if_missing(
        &self,
        target: &DocumentRef,
        field: &str,
        value: Value,
    ) -> Result<bool, StoreError> {
        self.inner.lock().apply_if_missing(target, field, value)
    }

    async fn commit_batch(&self, batch: WriteBatch) -> BatchOutcome {
        let mut inner = self.inner.lock();
        let mut outcome = BatchOutcome::default();
        for write in batch.into_writes() {
            match inner.apply(&write.target, &write.field, write.value) {
                Ok(()) => outcome.committed += 1,
                Err(e) => outcome.failures.push((write.target, e)),
            }
        }
        outcome
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.lock();
        inner.check_available()?;
        Ok(inner.collections.keys().cloned().collect())
    }
}
