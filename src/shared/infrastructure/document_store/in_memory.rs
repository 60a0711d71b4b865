// In memory implementation of the DocumentStore port.
//
// Purpose
// - Support subscription, aggregation and preference tests and local development without the
//   hosted backend.
//
// Responsibilities
// - Store documents per collection, apply set and counter primitives like the backend does.
// - Push change batches to every live listener whose target matches.
// - Offer switches to simulate an offline backend, slow writes, denied listens and broken
//   channels.

use crate::shared::infrastructure::document_store::{
    Collection, DocumentStore, DocumentStoreError, FieldUpdate, FieldUpdates, Fields, ListenTarget,
    Listener, ListenMessage, RawChange, RawChangeBatch,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, mpsc};

const OFFLINE_MESSAGE: &str = "Document store offline";

/// JSON seed: `{ "gigs": { "<id>": { ... } }, "users": { "<id>": { ... } } }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub gigs: BTreeMap<String, Fields>,
    #[serde(default)]
    pub users: BTreeMap<String, Fields>,
}

struct ListenerEntry {
    target: ListenTarget,
    sender: mpsc::UnboundedSender<ListenMessage>,
}

#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<Collection, BTreeMap<String, Fields>>>,
    listeners: Mutex<Vec<ListenerEntry>>,
    is_offline: AtomicBool,
    write_delay_ms: AtomicU64,
    denied: RwLock<HashSet<Collection>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: Seed) -> Self {
        let mut documents = HashMap::new();
        documents.insert(Collection::Gigs, seed.gigs);
        documents.insert(Collection::Users, seed.users);
        Self {
            documents: RwLock::new(documents),
            ..Self::default()
        }
    }

    pub fn from_seed_json(json: &str) -> Result<Self, serde_json::Error> {
        let seed: Seed = serde_json::from_str(json)?;
        Ok(Self::from_seed(seed))
    }

    pub fn toggle_offline(&self) {
        self.is_offline.fetch_xor(true, Ordering::SeqCst);
    }

    pub fn set_offline(&self, offline: bool) {
        self.is_offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_write_delay_ms(&self, delay_ms: u64) {
        self.write_delay_ms.store(delay_ms, Ordering::SeqCst);
    }

    /// Refuse every later listen on `collection`, as security rules would.
    pub async fn deny_listen(&self, collection: Collection) {
        self.denied.write().await.insert(collection);
    }

    fn ensure_online(&self) -> Result<(), DocumentStoreError> {
        if self.is_offline.load(Ordering::SeqCst) {
            return Err(DocumentStoreError::Backend(OFFLINE_MESSAGE.into()));
        }
        Ok(())
    }

    /// Create or replace a document, as a remote writer would.
    pub async fn put(&self, collection: Collection, id: &str, fields: Fields) {
        let mut documents = self.documents.write().await;
        let docs = documents.entry(collection).or_default();
        let change = if docs.contains_key(id) {
            RawChange::modified(id, fields.clone())
        } else {
            RawChange::added(id, fields.clone())
        };
        docs.insert(id.to_string(), fields);
        self.notify(collection, RawChangeBatch::new(vec![change]))
            .await;
    }

    /// Delete a document, as a remote writer would. No-op when absent.
    pub async fn delete(&self, collection: Collection, id: &str) {
        let mut documents = self.documents.write().await;
        let removed = documents
            .get_mut(&collection)
            .and_then(|docs| docs.remove(id));
        if removed.is_some() {
            self.notify(collection, RawChangeBatch::new(vec![RawChange::removed(id)]))
                .await;
        }
    }

    /// Apply several changes to storage and deliver them to listeners as one batch.
    pub async fn publish_batch(&self, collection: Collection, changes: Vec<RawChange>) {
        let mut documents = self.documents.write().await;
        let docs = documents.entry(collection).or_default();
        for change in &changes {
            match &change.data {
                Some(data) => {
                    docs.insert(change.id.clone(), data.clone());
                }
                None => {
                    docs.remove(&change.id);
                }
            }
        }
        self.notify(collection, RawChangeBatch::new(changes)).await;
    }

    /// Report `error` on every live channel, then hang up on all of them.
    pub async fn fail_listeners(&self, error: DocumentStoreError) {
        let mut listeners = self.listeners.lock().await;
        for entry in listeners.iter() {
            let _ = entry.sender.send(Err(error.clone()));
        }
        listeners.clear();
    }

    /// Number of channels still attached to a live receiver.
    pub async fn listener_count(&self) -> usize {
        let mut listeners = self.listeners.lock().await;
        listeners.retain(|entry| !entry.sender.is_closed());
        listeners.len()
    }

    async fn notify(&self, collection: Collection, batch: RawChangeBatch) {
        let mut listeners = self.listeners.lock().await;
        listeners.retain(|entry| {
            let delivery = match &entry.target {
                ListenTarget::Collection(target) if *target == collection => Some(batch.clone()),
                ListenTarget::Document {
                    collection: target,
                    id,
                } if *target == collection => {
                    let changes: Vec<RawChange> = batch
                        .changes
                        .iter()
                        .filter(|change| &change.id == id)
                        .cloned()
                        .collect();
                    (!changes.is_empty()).then(|| RawChangeBatch::new(changes))
                }
                _ => None,
            };
            match delivery {
                Some(batch) => entry.sender.send(Ok(batch)).is_ok(),
                None => !entry.sender.is_closed(),
            }
        });
    }
}

fn apply_field_update(fields: &mut Fields, key: &str, update: FieldUpdate) {
    match update {
        FieldUpdate::Set(value) => {
            fields.insert(key.to_string(), value);
        }
        FieldUpdate::SetUnion(ids) => {
            let entry = fields
                .entry(key.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if !entry.is_array() {
                *entry = Value::Array(Vec::new());
            }
            if let Value::Array(members) = entry {
                for id in ids {
                    if !members.iter().any(|member| member.as_str() == Some(id.as_str())) {
                        members.push(Value::String(id));
                    }
                }
            }
        }
        FieldUpdate::SetRemove(ids) => match fields.get_mut(key) {
            Some(Value::Array(members)) => {
                members.retain(|member| !member.as_str().is_some_and(|id| ids.contains(id)));
            }
            _ => {
                fields.insert(key.to_string(), Value::Array(Vec::new()));
            }
        },
        FieldUpdate::Increment(delta) => {
            let next = match fields.get(key) {
                Some(Value::Number(current)) => match current.as_i64() {
                    Some(current) => Value::from(current.saturating_add(delta)),
                    None => Value::from(current.as_f64().unwrap_or_default() + delta as f64),
                },
                _ => Value::from(delta),
            };
            fields.insert(key.to_string(), next);
        }
    }
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn listen(&self, target: &ListenTarget) -> Result<Listener, DocumentStoreError> {
        self.ensure_online()?;
        if self.denied.read().await.contains(&target.collection()) {
            return Err(DocumentStoreError::PermissionDenied(format!(
                "listen on {target} denied"
            )));
        }
        let documents = self.documents.read().await;
        let docs = documents.get(&target.collection());
        let initial = match target {
            ListenTarget::Collection(_) => docs
                .map(|docs| {
                    docs.iter()
                        .map(|(id, fields)| RawChange::added(id.clone(), fields.clone()))
                        .collect()
                })
                .unwrap_or_default(),
            ListenTarget::Document { id, .. } => {
                match docs.and_then(|docs| docs.get(id)) {
                    Some(fields) => vec![RawChange::added(id.clone(), fields.clone())],
                    None => vec![RawChange::removed(id.clone())],
                }
            }
        };
        let (sender, receiver) = mpsc::unbounded_channel();
        let _ = sender.send(Ok(RawChangeBatch::new(initial)));
        self.listeners.lock().await.push(ListenerEntry {
            target: target.clone(),
            sender,
        });
        Ok(Listener::new(receiver))
    }

    async fn get(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Fields>, DocumentStoreError> {
        self.ensure_online()?;
        let documents = self.documents.read().await;
        Ok(documents
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        updates: FieldUpdates,
    ) -> Result<(), DocumentStoreError> {
        let delay_ms = self.write_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        self.ensure_online()?;
        let mut documents = self.documents.write().await;
        let fields = documents
            .get_mut(&collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| DocumentStoreError::NotFound {
                collection,
                id: id.to_string(),
            })?;
        for (key, update) in updates {
            apply_field_update(fields, &key, update);
        }
        let change = RawChange::modified(id, fields.clone());
        self.notify(collection, RawChangeBatch::new(vec![change]))
            .await;
        Ok(())
    }
}
