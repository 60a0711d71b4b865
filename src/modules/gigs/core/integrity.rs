// Data-quality checks on mirrored gig records.
//
// Issues are never fatal: the record stays in the index and is only left out of the views
// that need the missing field. Each issue is logged and counted per kind the first time a
// record shows it; re-delivering an unchanged record is silent.

use crate::modules::gigs::core::gig::GigRecord;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataIntegrityIssue {
    #[error("gig {gig_id} is missing required field `{field}`")]
    MissingField { gig_id: String, field: &'static str },

    #[error("gig {gig_id} has no usable dateAndTime")]
    UnparseableTimestamp { gig_id: String },

    #[error("gig {gig_id} has no location")]
    MissingLocation { gig_id: String },

    #[error("document {id} could not be decoded: {reason}")]
    Malformed { id: String, reason: String },
}

/// All issues found on `record`, in a stable order.
pub fn audit(record: &GigRecord) -> Vec<DataIntegrityIssue> {
    let mut issues = Vec::new();
    for (field, value) in [("gigName", &record.gig_name), ("venue", &record.venue)] {
        if value.trim().is_empty() {
            issues.push(DataIntegrityIssue::MissingField {
                gig_id: record.id.clone(),
                field,
            });
        }
    }
    if record.starts_at().is_none() {
        issues.push(DataIntegrityIssue::UnparseableTimestamp {
            gig_id: record.id.clone(),
        });
    }
    if !record.is_mappable() {
        issues.push(DataIntegrityIssue::MissingLocation {
            gig_id: record.id.clone(),
        });
    }
    issues
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticCounts {
    pub missing_field: u64,
    pub unparseable_timestamp: u64,
    pub missing_location: u64,
    pub malformed: u64,
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    missing_field: AtomicU64,
    unparseable_timestamp: AtomicU64,
    missing_location: AtomicU64,
    malformed: AtomicU64,
    current: Mutex<HashMap<String, Vec<DataIntegrityIssue>>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, issue: &DataIntegrityIssue) {
        let counter = match issue {
            DataIntegrityIssue::MissingField { .. } => &self.missing_field,
            DataIntegrityIssue::UnparseableTimestamp { .. } => &self.unparseable_timestamp,
            DataIntegrityIssue::MissingLocation { .. } => &self.missing_location,
            DataIntegrityIssue::Malformed { .. } => &self.malformed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(%issue, "data integrity issue");
    }

    /// Replace the issues known for document `id`, recording only the ones it did not
    /// already have.
    pub fn observe(&self, id: &str, issues: Vec<DataIntegrityIssue>) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = current.remove(id).unwrap_or_default();
        for issue in issues.iter().filter(|issue| !previous.contains(issue)) {
            self.record(issue);
        }
        if !issues.is_empty() {
            current.insert(id.to_string(), issues);
        }
    }

    /// Drop what is known about a deleted document, so a later re-add is audited afresh.
    pub fn forget(&self, id: &str) {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }

    pub fn counts(&self) -> DiagnosticCounts {
        DiagnosticCounts {
            missing_field: self.missing_field.load(Ordering::Relaxed),
            unparseable_timestamp: self.unparseable_timestamp.load(Ordering::Relaxed),
            missing_location: self.missing_location.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
        }
    }
}
