// Ports for the remote document backend.
//
// Purpose
// - Describe what the core needs from the hosted backend: live listens on a collection or a
//   single document, point reads, and field updates with set and counter primitives.
//
// Boundaries
// - No concrete input or output here. `in_memory` implements the port for tests, local
//   development and seeded demo runs.
//
// Wire contract
// - Documents are JSON objects keyed by an opaque id.
// - `SetUnion` and `SetRemove` are true set operations: idempotent, never duplicating.
// - `Increment` is applied by the backend, so concurrent increments commute.

pub mod in_memory;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;

pub type Fields = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Gigs,
    Users,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Gigs => "gigs",
            Collection::Users => "users",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListenTarget {
    Collection(Collection),
    Document { collection: Collection, id: String },
}

impl ListenTarget {
    pub fn document(collection: Collection, id: impl Into<String>) -> Self {
        ListenTarget::Document {
            collection,
            id: id.into(),
        }
    }

    pub fn collection(&self) -> Collection {
        match self {
            ListenTarget::Collection(collection) => *collection,
            ListenTarget::Document { collection, .. } => *collection,
        }
    }
}

impl fmt::Display for ListenTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenTarget::Collection(collection) => write!(f, "{collection}"),
            ListenTarget::Document { collection, id } => write!(f, "{collection}/{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentStoreError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("document not found: {collection}/{id}")]
    NotFound { collection: Collection, id: String },

    #[error("channel closed: {0}")]
    ChannelClosed(String),

    #[error("backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawChange {
    pub kind: ChangeKind,
    pub id: String,
    pub data: Option<Fields>,
}

impl RawChange {
    pub fn added(id: impl Into<String>, data: Fields) -> Self {
        Self {
            kind: ChangeKind::Added,
            id: id.into(),
            data: Some(data),
        }
    }

    pub fn modified(id: impl Into<String>, data: Fields) -> Self {
        Self {
            kind: ChangeKind::Modified,
            id: id.into(),
            data: Some(data),
        }
    }

    pub fn removed(id: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Removed,
            id: id.into(),
            data: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawChangeBatch {
    pub changes: Vec<RawChange>,
}

impl RawChangeBatch {
    pub fn new(changes: Vec<RawChange>) -> Self {
        Self { changes }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

pub type ListenMessage = Result<RawChangeBatch, DocumentStoreError>;

/// Receiving end of a live listen. Dropping it detaches from the backend.
#[derive(Debug)]
pub struct Listener {
    receiver: mpsc::UnboundedReceiver<ListenMessage>,
}

impl Listener {
    pub fn new(receiver: mpsc::UnboundedReceiver<ListenMessage>) -> Self {
        Self { receiver }
    }

    /// `None` means the backend hung up without reporting an error.
    pub async fn next(&mut self) -> Option<ListenMessage> {
        self.receiver.recv().await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Set(Value),
    SetUnion(BTreeSet<String>),
    SetRemove(BTreeSet<String>),
    Increment(i64),
}

impl FieldUpdate {
    pub fn union_one(id: impl Into<String>) -> Self {
        FieldUpdate::SetUnion(BTreeSet::from([id.into()]))
    }

    pub fn remove_one(id: impl Into<String>) -> Self {
        FieldUpdate::SetRemove(BTreeSet::from([id.into()]))
    }
}

pub type FieldUpdates = Vec<(String, FieldUpdate)>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn listen(&self, target: &ListenTarget) -> Result<Listener, DocumentStoreError>;
    async fn get(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Fields>, DocumentStoreError>;
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        updates: FieldUpdates,
    ) -> Result<(), DocumentStoreError>;
}
