// Local copy of one user record.
//
// Writers
// - The user subscription replaces the whole value on every notification.
// - The preference coordinator applies optimistic edits and reverts them on rejection.
//
// Readers take clones or watch for changes; they never see a half-applied edit.

use crate::modules::users::core::user::{PreferenceSet, UserRecord};
use tokio::sync::watch;

pub struct UserRecordCell {
    cell: watch::Sender<Option<UserRecord>>,
}

impl Default for UserRecordCell {
    fn default() -> Self {
        Self::new()
    }
}

impl UserRecordCell {
    pub fn new() -> Self {
        let (cell, _) = watch::channel(None);
        Self { cell }
    }

    pub fn current(&self) -> Option<UserRecord> {
        self.cell.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<UserRecord>> {
        self.cell.subscribe()
    }

    /// Wholesale replacement; no merge with the previous value.
    pub fn replace(&self, record: Option<UserRecord>) {
        self.cell.send_replace(record);
    }

    /// Force membership of `gig_id` in `set`. Returns the membership before the edit, or
    /// `None` when no record is loaded.
    pub fn set_membership(&self, set: PreferenceSet, gig_id: &str, present: bool) -> Option<bool> {
        let mut previous = None;
        self.cell.send_if_modified(|value| {
            let Some(record) = value.as_mut() else {
                return false;
            };
            let members = record.set_mut(set);
            let was_present = members.contains(gig_id);
            previous = Some(was_present);
            match (was_present, present) {
                (false, true) => members.insert(gig_id.to_string()),
                (true, false) => members.remove(gig_id),
                _ => false,
            }
        });
        previous
    }

    /// Flip membership of `gig_id` in `set` in one step. Returns the new membership, or
    /// `None` when no record is loaded.
    pub fn toggle_membership(&self, set: PreferenceSet, gig_id: &str) -> Option<bool> {
        let mut toggled = None;
        self.cell.send_if_modified(|value| {
            let Some(record) = value.as_mut() else {
                return false;
            };
            let members = record.set_mut(set);
            let present = if members.remove(gig_id) {
                false
            } else {
                members.insert(gig_id.to_string())
            };
            toggled = Some(present);
            true
        });
        toggled
    }

    /// Overwrite both names. Returns the previous pair, or `None` when no record is loaded.
    pub fn set_names(&self, first_name: &str, last_name: &str) -> Option<(String, String)> {
        let mut previous = None;
        self.cell.send_if_modified(|value| {
            let Some(record) = value.as_mut() else {
                return false;
            };
            let first = std::mem::replace(&mut record.first_name, first_name.to_string());
            let last = std::mem::replace(&mut record.last_name, last_name.to_string());
            let changed = first != record.first_name || last != record.last_name;
            previous = Some((first, last));
            changed
        });
        previous
    }
}
