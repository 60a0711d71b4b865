// Live subscriptions from the document store into local state.
//
// Purpose
// - Mirror the `gigs` collection into the EventIndex and single user documents into
//   UserRecordCells.
//
// Responsibilities
// - At most one live subscription per collection, and per user document.
// - Normalize raw change batches: added/modified become upserts, removed become removals.
//   One raw batch is one atomic index step.
// - On a channel error: log, keep the last good data, move to Error, then reopen with
//   bounded exponential backoff unless retries are disabled.
// - Bound subscription establishment with a timeout. Establishment ends when the first
//   batch (the current contents) has been applied.
//
// Boundaries
// - This is the only writer of the EventIndex and the only writer that replaces a user cell
//   wholesale.

use crate::modules::gigs::core::event_index::{EventIndex, IndexChange, IndexReader};
use crate::modules::gigs::core::gig::GigRecord;
use crate::modules::gigs::core::integrity::{DataIntegrityIssue, Diagnostics, audit};
use crate::modules::sync::core::handle::SubscriptionHandle;
use crate::modules::sync::core::retry::RetryPolicy;
use crate::modules::sync::core::state::SubscriptionState;
use crate::modules::users::core::user::UserRecord;
use crate::modules::users::core::user_cell::UserRecordCell;
use crate::shared::infrastructure::document_store::{
    ChangeKind, Collection, DocumentStore, DocumentStoreError, ListenTarget, Listener,
    RawChangeBatch,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    #[error("subscribing to {target} timed out after {timeout_ms} ms")]
    Timeout { target: String, timeout_ms: u64 },

    #[error("subscription to {0} ended before delivering its first batch")]
    ClosedEarly(String),

    #[error(transparent)]
    Store(#[from] DocumentStoreError),
}

/// Where normalized changes of one subscription land.
#[derive(Clone)]
enum Sink {
    Gigs {
        index: Arc<EventIndex>,
        diagnostics: Arc<Diagnostics>,
    },
    User {
        user_id: String,
        cell: Arc<UserRecordCell>,
    },
}

impl Sink {
    /// `initial` marks the first batch after (re)subscribing, which holds the complete
    /// current contents. Anything the sink holds beyond it was deleted while disconnected.
    fn apply(&self, batch: RawChangeBatch, initial: bool) {
        match self {
            Sink::Gigs { index, diagnostics } => {
                let mut changes = Vec::with_capacity(batch.changes.len());
                let mut seen = HashSet::new();
                for change in batch.changes {
                    seen.insert(change.id.clone());
                    match (change.kind, change.data) {
                        (ChangeKind::Removed, _) => {
                            diagnostics.forget(&change.id);
                            changes.push(IndexChange::Remove(change.id));
                        }
                        (_, Some(data)) => match GigRecord::from_document(&change.id, data) {
                            Ok(record) => {
                                diagnostics.observe(&record.id, audit(&record));
                                changes.push(IndexChange::Upsert(record));
                            }
                            Err(error) => {
                                let reason = error.to_string();
                                diagnostics.observe(
                                    &change.id,
                                    vec![DataIntegrityIssue::Malformed { id: change.id.clone(), reason }],
                                );
                            }
                        },
                        (_, None) => diagnostics.observe(
                            &change.id,
                            vec![DataIntegrityIssue::Malformed {
                                id: change.id.clone(),
                                reason: "change carried no data".into(),
                            }],
                        ),
                    }
                }
                if initial {
                    let stale = index
                        .snapshot()
                        .iter()
                        .filter(|record| !seen.contains(&record.id))
                        .map(|record| {
                            diagnostics.forget(&record.id);
                            IndexChange::Remove(record.id.clone())
                        })
                        .collect::<Vec<_>>();
                    changes.extend(stale);
                }
                let count = changes.len();
                let revision = index.apply(changes);
                tracing::debug!(count, revision, initial, "applied gig batch");
            }
            Sink::User { user_id, cell } => {
                let Some(change) = batch.changes.into_iter().filter(|c| c.id == *user_id).last()
                else {
                    return;
                };
                match (change.kind, change.data) {
                    (ChangeKind::Removed, _) => cell.replace(None),
                    (_, Some(data)) => match UserRecord::from_document(user_id, data) {
                        Ok(record) => cell.replace(Some(record)),
                        Err(error) => {
                            tracing::warn!(%user_id, %error, "user document could not be decoded")
                        }
                    },
                    (_, None) => tracing::warn!(%user_id, "user change carried no data"),
                }
                tracing::debug!(%user_id, "applied user batch");
            }
        }
    }
}

struct Pump<TStore>
where
    TStore: DocumentStore + 'static,
{
    store: Arc<TStore>,
    target: ListenTarget,
    sink: Sink,
    handle: SubscriptionHandle,
    retry: RetryPolicy,
    subscribe_timeout: Duration,
}

impl<TStore> Pump<TStore>
where
    TStore: DocumentStore + 'static,
{
    /// Listen and wait for the first batch, bounded by the subscribe timeout.
    async fn open(&self) -> Result<(Listener, RawChangeBatch), SubscriptionError> {
        let establish = async {
            let mut listener = self
                .store
                .listen(&self.target)
                .await
                .map_err(SubscriptionError::Store)?;
            match listener.next().await {
                Some(Ok(first)) => Ok((listener, first)),
                Some(Err(error)) => Err(SubscriptionError::Store(error)),
                None => Err(SubscriptionError::ClosedEarly(self.target.to_string())),
            }
        };
        tokio::time::timeout(self.subscribe_timeout, establish)
            .await
            .map_err(|_| SubscriptionError::Timeout {
                target: self.target.to_string(),
                timeout_ms: u64::try_from(self.subscribe_timeout.as_millis()).unwrap_or(u64::MAX),
            })?
    }

    async fn establish(&self) -> Result<Listener, SubscriptionError> {
        self.handle.set_state(SubscriptionState::Subscribing);
        let opened = tokio::select! {
            biased;
            _ = self.handle.closed() => Err(SubscriptionError::ClosedEarly(self.target.to_string())),
            opened = self.open() => opened,
        };
        match opened {
            Ok((listener, first)) => {
                self.sink.apply(first, true);
                self.handle.set_state(SubscriptionState::Active);
                tracing::info!(target = %self.target, subscription_id = %self.handle.id(), "subscription active");
                Ok(listener)
            }
            Err(error) => {
                tracing::warn!(target = %self.target, %error, "subscription failed to open");
                self.handle.set_state(SubscriptionState::Error {
                    reason: error.to_string(),
                });
                Err(error)
            }
        }
    }

    async fn run(self, mut listener: Listener) {
        loop {
            let reason = loop {
                tokio::select! {
                    biased;
                    _ = self.handle.closed() => return,
                    message = listener.next() => match message {
                        Some(Ok(batch)) => self.sink.apply(batch, false),
                        Some(Err(error)) => break error.to_string(),
                        None => break format!("channel to {} closed", self.target),
                    },
                }
            };
            tracing::warn!(target = %self.target, %reason, "subscription channel failed; keeping last known data");
            self.handle.set_state(SubscriptionState::Error { reason });
            drop(listener);

            match self.reopen().await {
                Some(next) => listener = next,
                None => {
                    self.handle.mark_finished();
                    return;
                }
            }
        }
    }

    async fn reopen(&self) -> Option<Listener> {
        for attempt in 0..self.retry.max_attempts {
            let delay = self.retry.backoff(attempt);
            tracing::info!(target = %self.target, attempt = attempt + 1, delay_ms = delay.as_millis() as u64, "resubscribing");
            tokio::select! {
                biased;
                _ = self.handle.closed() => return None,
                _ = tokio::time::sleep(delay) => {}
            }
            if let Ok(listener) = self.establish().await {
                return Some(listener);
            }
        }
        if self.retry.is_enabled() {
            tracing::warn!(target = %self.target, attempts = self.retry.max_attempts, "giving up on resubscribing");
        }
        None
    }
}

pub struct SubscriptionManager<TStore>
where
    TStore: DocumentStore + 'static,
{
    store: Arc<TStore>,
    index: Arc<EventIndex>,
    diagnostics: Arc<Diagnostics>,
    retry: RetryPolicy,
    subscribe_timeout: Duration,
    events: Mutex<Option<SubscriptionHandle>>,
    users: Mutex<HashMap<String, (SubscriptionHandle, Arc<UserRecordCell>)>>,
    // Serialize establishment per target without blocking state reads.
    events_opening: Mutex<()>,
    user_openings: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<TStore> SubscriptionManager<TStore>
where
    TStore: DocumentStore + 'static,
{
    pub fn new(store: Arc<TStore>, retry: RetryPolicy, subscribe_timeout: Duration) -> Self {
        Self {
            store,
            index: Arc::new(EventIndex::new()),
            diagnostics: Arc::new(Diagnostics::new()),
            retry,
            subscribe_timeout,
            events: Mutex::new(None),
            users: Mutex::new(HashMap::new()),
            events_opening: Mutex::new(()),
            user_openings: Mutex::new(HashMap::new()),
        }
    }

    pub fn index(&self) -> IndexReader {
        self.index.reader()
    }

    pub fn diagnostics(&self) -> Arc<Diagnostics> {
        self.diagnostics.clone()
    }

    /// Open the `gigs` subscription, or return the live one.
    pub async fn subscribe_events(&self) -> Result<SubscriptionHandle, SubscriptionError> {
        let _opening = self.events_opening.lock().await;
        let pump = {
            let mut slot = self.events.lock().await;
            if let Some(existing) = slot.as_ref().filter(|handle| !handle.is_finished()) {
                return Ok(existing.clone());
            }
            if let Some(stale) = slot.take() {
                stale.close();
            }
            let sink = Sink::Gigs {
                index: self.index.clone(),
                diagnostics: self.diagnostics.clone(),
            };
            let pump = self.pump(ListenTarget::Collection(Collection::Gigs), sink);
            *slot = Some(pump.handle.clone());
            pump
        };
        let handle = pump.handle.clone();
        Self::start(pump).await.map(|()| handle)
    }

    /// Open the subscription to one user document, or return the live one, together with
    /// the cell it writes into.
    pub async fn subscribe_user(
        &self,
        user_id: &str,
    ) -> Result<(SubscriptionHandle, Arc<UserRecordCell>), SubscriptionError> {
        let opening = self
            .user_openings
            .lock()
            .await
            .entry(user_id.to_string())
            .or_default()
            .clone();
        let _opening = opening.lock().await;

        let (pump, cell) = {
            let mut users = self.users.lock().await;
            if let Some((existing, cell)) = users.get(user_id) {
                if !existing.is_finished() {
                    return Ok((existing.clone(), cell.clone()));
                }
            }
            let cell = users
                .remove(user_id)
                .map(|(stale, cell)| {
                    stale.close();
                    cell
                })
                .unwrap_or_default();
            let sink = Sink::User {
                user_id: user_id.to_string(),
                cell: cell.clone(),
            };
            let pump = self.pump(ListenTarget::document(Collection::Users, user_id), sink);
            users.insert(user_id.to_string(), (pump.handle.clone(), cell.clone()));
            (pump, cell)
        };
        let handle = pump.handle.clone();
        Self::start(pump).await.map(|()| (handle, cell))
    }

    fn pump(&self, target: ListenTarget, sink: Sink) -> Pump<TStore> {
        let handle = SubscriptionHandle::new(target.clone());
        handle.set_state(SubscriptionState::Subscribing);
        Pump {
            store: self.store.clone(),
            target,
            sink,
            handle,
            retry: self.retry,
            subscribe_timeout: self.subscribe_timeout,
        }
    }

    /// Runs without any manager lock held. A failed handle stays registered, so its `Error`
    /// state stays visible.
    async fn start(pump: Pump<TStore>) -> Result<(), SubscriptionError> {
        match pump.establish().await {
            Ok(listener) => {
                tokio::spawn(pump.run(listener));
                Ok(())
            }
            Err(error) => {
                pump.handle.mark_finished();
                Err(error)
            }
        }
    }

    pub async fn events_state(&self) -> SubscriptionState {
        self.events
            .lock()
            .await
            .as_ref()
            .map(SubscriptionHandle::state)
            .unwrap_or(SubscriptionState::Unsubscribed)
    }

    pub async fn user_state(&self, user_id: &str) -> SubscriptionState {
        self.users
            .lock()
            .await
            .get(user_id)
            .map(|(handle, _)| handle.state())
            .unwrap_or(SubscriptionState::Unsubscribed)
    }

    /// Close every subscription this manager opened.
    pub async fn close_all(&self) {
        if let Some(handle) = self.events.lock().await.as_ref() {
            handle.close();
        }
        for (handle, _) in self.users.lock().await.values() {
            handle.close();
        }
    }
}
