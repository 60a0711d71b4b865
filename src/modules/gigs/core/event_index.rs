// In-process mirror of the `gigs` collection.
//
// Purpose
// - Single source of truth for which gigs exist right now.
//
// Responsibilities
// - Upsert by id, keeping the first-seen position of a record when it is merely updated.
// - Apply a batch of changes as one step: readers see the state before or after the whole
//   batch, never in between.
// - Hand out immutable snapshots that stay valid while later batches are applied.
//
// Concurrency
// - One writer (the subscription pump). Every other component holds an `IndexReader`.
// - Snapshots are copy-on-write over persistent collections: a batch clones the current
//   snapshot in constant time, applies its changes and swaps the result in.

use crate::modules::gigs::core::gig::GigRecord;
use im::{HashMap, Vector};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;

// Removed slots are compacted away once they outnumber the live records.
const COMPACT_MIN_TOMBSTONES: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum IndexChange {
    Upsert(GigRecord),
    Remove(String),
}

/// Snapshots share structure with their predecessor; building the next one costs only the
/// changed slots.
#[derive(Debug, Clone, Default)]
pub struct GigSnapshot {
    slots: Vector<Option<Arc<GigRecord>>>,
    positions: HashMap<String, usize>,
    live: usize,
    revision: u64,
}

impl GigSnapshot {
    pub fn iter(&self) -> impl Iterator<Item = &GigRecord> {
        self.slots.iter().filter_map(|slot| slot.as_deref())
    }

    pub fn get(&self, id: &str) -> Option<&GigRecord> {
        self.positions
            .get(id)
            .and_then(|&position| self.slots.get(position))
            .and_then(|slot| slot.as_deref())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of batches applied since the index was created.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn tombstones(&self) -> usize {
        self.slots.len() - self.live
    }

    fn next(&self, changes: Vec<IndexChange>) -> Self {
        let mut next = self.clone();
        let mut removed = HashSet::new();

        for change in changes {
            match change {
                IndexChange::Upsert(record) => next.put(record, &mut removed),
                IndexChange::Remove(id) => next.tombstone(id, &mut removed),
            }
        }

        // A removed id keeps its position until the batch ends, so a re-add inside the
        // same batch lands back in the original slot.
        for id in removed {
            next.positions.remove(&id);
        }
        if next.tombstones() > COMPACT_MIN_TOMBSTONES && next.tombstones() > next.live {
            next.compact();
        }
        next.revision += 1;
        next
    }

    fn put(&mut self, record: GigRecord, removed: &mut HashSet<String>) {
        match self.positions.get(&record.id).copied() {
            Some(position) => {
                if removed.remove(&record.id) {
                    self.live += 1;
                }
                self.slots.set(position, Some(Arc::new(record)));
            }
            None => {
                self.positions.insert(record.id.clone(), self.slots.len());
                self.slots.push_back(Some(Arc::new(record)));
                self.live += 1;
            }
        }
    }

    fn tombstone(&mut self, id: String, removed: &mut HashSet<String>) {
        let Some(position) = self.positions.get(&id).copied() else {
            return;
        };
        if self.slots.get(position).is_some_and(Option::is_some) {
            self.slots.set(position, None);
            self.live -= 1;
            removed.insert(id);
        }
    }

    fn compact(&mut self) {
        let slots: Vector<Option<Arc<GigRecord>>> =
            self.slots.iter().filter(|slot| slot.is_some()).cloned().collect();
        self.positions = slots
            .iter()
            .enumerate()
            .filter_map(|(position, slot)| slot.as_ref().map(|record| (record.id.clone(), position)))
            .collect();
        self.slots = slots;
    }
}

pub struct EventIndex {
    cell: watch::Sender<Arc<GigSnapshot>>,
}

impl Default for EventIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl EventIndex {
    pub fn new() -> Self {
        let (cell, _) = watch::channel(Arc::new(GigSnapshot::default()));
        Self { cell }
    }

    pub fn upsert(&self, record: GigRecord) -> u64 {
        self.apply(vec![IndexChange::Upsert(record)])
    }

    /// No-op when the id is absent.
    pub fn remove(&self, id: &str) -> u64 {
        self.apply(vec![IndexChange::Remove(id.to_string())])
    }

    /// Apply `changes` in order as one atomic step. Returns the resulting revision.
    pub fn apply(&self, changes: Vec<IndexChange>) -> u64 {
        let current = self.snapshot();
        if changes.is_empty() {
            return current.revision();
        }
        let next = current.next(changes);
        let revision = next.revision();
        self.cell.send_replace(Arc::new(next));
        revision
    }

    pub fn snapshot(&self) -> Arc<GigSnapshot> {
        self.cell.borrow().clone()
    }

    pub fn get_by_id(&self, id: &str) -> Option<GigRecord> {
        self.snapshot().get(id).cloned()
    }

    pub fn reader(&self) -> IndexReader {
        IndexReader {
            cell: self.cell.subscribe(),
        }
    }
}

/// Read-only handle on the index for aggregation and presentation code.
#[derive(Clone)]
pub struct IndexReader {
    cell: watch::Receiver<Arc<GigSnapshot>>,
}

impl IndexReader {
    pub fn snapshot(&self) -> Arc<GigSnapshot> {
        self.cell.borrow().clone()
    }

    pub fn get_by_id(&self, id: &str) -> Option<GigRecord> {
        self.snapshot().get(id).cloned()
    }

    /// Wait until at least `revision` batches have been applied.
    /// Returns `None` if the index was dropped first.
    pub async fn wait_for_revision(&self, revision: u64) -> Option<Arc<GigSnapshot>> {
        let mut cell = self.cell.clone();
        cell.wait_for(|snapshot| snapshot.revision() >= revision)
            .await
            .ok()
            .map(|snapshot| snapshot.clone())
    }
}
