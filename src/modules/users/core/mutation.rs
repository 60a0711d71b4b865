// Tracking for optimistic mutations.
//
// Every optimistic edit is `Pending` until the remote write resolves, then `Confirmed` or
// `Rejected`. A rejected edit has already been reverted in the local cell when its status
// is published.
//
// Settled entries are kept for a bounded history so callers can still read the outcome of
// a recent mutation; older settled entries are evicted first-settled, first-out.

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MutationId(Uuid);

impl MutationId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for MutationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MutationStatus {
    Pending,
    Confirmed,
    Rejected { reason: String },
}

impl MutationStatus {
    pub fn is_settled(&self) -> bool {
        !matches!(self, MutationStatus::Pending)
    }
}

pub const DEFAULT_SETTLED_HISTORY: usize = 1024;

#[derive(Default)]
struct Entries {
    statuses: HashMap<MutationId, MutationStatus>,
    settled: VecDeque<MutationId>,
}

pub struct MutationLog {
    inner: RwLock<Entries>,
    settled_history: usize,
}

impl Default for MutationLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MutationLog {
    pub fn new() -> Self {
        Self::with_settled_history(DEFAULT_SETTLED_HISTORY)
    }

    /// Keep at most `settled_history` settled entries. Pending entries are never evicted.
    pub fn with_settled_history(settled_history: usize) -> Self {
        Self {
            inner: RwLock::new(Entries::default()),
            settled_history,
        }
    }

    pub async fn begin(&self) -> MutationId {
        let id = MutationId::new();
        self.inner
            .write()
            .await
            .statuses
            .insert(id, MutationStatus::Pending);
        id
    }

    pub async fn confirm(&self, id: MutationId) {
        self.settle(id, MutationStatus::Confirmed).await;
    }

    pub async fn reject(&self, id: MutationId, reason: impl Into<String>) {
        self.settle(
            id,
            MutationStatus::Rejected {
                reason: reason.into(),
            },
        )
        .await;
    }

    pub async fn status(&self, id: MutationId) -> Option<MutationStatus> {
        self.inner.read().await.statuses.get(&id).cloned()
    }

    /// Entries currently held, pending and settled.
    pub async fn len(&self) -> usize {
        self.inner.read().await.statuses.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn pending_count(&self) -> usize {
        let entries = self.inner.read().await;
        entries
            .statuses
            .values()
            .filter(|status| !status.is_settled())
            .count()
    }

    async fn settle(&self, id: MutationId, status: MutationStatus) {
        let mut entries = self.inner.write().await;
        let Some(entry) = entries.statuses.get_mut(&id) else {
            return;
        };
        if entry.is_settled() {
            return;
        }
        *entry = status;
        entries.settled.push_back(id);
        while entries.settled.len() > self.settled_history {
            if let Some(evicted) = entries.settled.pop_front() {
                entries.statuses.remove(&evicted);
            }
        }
    }
}
