// User record as mirrored from the `users` collection.
//
// `likedGigs` and `recommendedGigs` are sets: adding a present id or removing an absent one
// changes nothing.

use crate::shared::infrastructure::document_store::Fields;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferenceSet {
    Liked,
    Recommended,
}

impl PreferenceSet {
    /// Wire name of the backing field.
    pub fn field(&self) -> &'static str {
        match self {
            PreferenceSet::Liked => "likedGigs",
            PreferenceSet::Recommended => "recommendedGigs",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub liked_gigs: BTreeSet<String>,
    #[serde(default)]
    pub recommended_gigs: BTreeSet<String>,
}

impl UserRecord {
    pub fn from_document(id: &str, fields: Fields) -> Result<Self, serde_json::Error> {
        let mut record: UserRecord = serde_json::from_value(serde_json::Value::Object(fields))?;
        record.id = id.to_string();
        Ok(record)
    }

    pub fn display_name(&self) -> &str {
        &self.first_name
    }

    pub fn set(&self, set: PreferenceSet) -> &BTreeSet<String> {
        match set {
            PreferenceSet::Liked => &self.liked_gigs,
            PreferenceSet::Recommended => &self.recommended_gigs,
        }
    }

    pub fn set_mut(&mut self, set: PreferenceSet) -> &mut BTreeSet<String> {
        match set {
            PreferenceSet::Liked => &mut self.liked_gigs,
            PreferenceSet::Recommended => &mut self.recommended_gigs,
        }
    }

    pub fn has_liked(&self, gig_id: &str) -> bool {
        self.liked_gigs.contains(gig_id)
    }
}
