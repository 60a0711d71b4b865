// Gig record as mirrored from the `gigs` collection.
//
// Purpose
// - Typed view of one remote gig document. The process never originates these; it only
//   mirrors what the backend pushes.
//
// Notes
// - Wire names follow the backend (`gigName`, `gigName_subHeader`, `dateAndTime`, ...).
// - The document id is authoritative for `id`, whatever the document body says.

use crate::shared::core::timestamp::Timestamp;
use crate::shared::infrastructure::document_store::Fields;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TicketPrice {
    Amount(f64),
    Label(String),
}

impl fmt::Display for TicketPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketPrice::Amount(amount) => write!(f, "${amount}"),
            TicketPrice::Label(label) => f.write_str(label),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GigRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub gig_name: String,
    #[serde(
        default,
        rename = "gigName_subHeader",
        alias = "gigNameSubHeader",
        skip_serializing_if = "Option::is_none"
    )]
    pub gig_name_sub_header: Option<String>,
    #[serde(default)]
    pub venue: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub blurb: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_and_time: Option<Timestamp>,
    #[serde(default)]
    pub is_free: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_price: Option<TicketPrice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tickets: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub likes: u64,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub notified_users: BTreeSet<String>,
}

impl GigRecord {
    /// Decode a document body; the document id wins over any `id` field in the body.
    pub fn from_document(id: &str, fields: Fields) -> Result<Self, serde_json::Error> {
        let mut record: GigRecord = serde_json::from_value(serde_json::Value::Object(fields))?;
        record.id = id.to_string();
        Ok(record)
    }

    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        self.date_and_time.and_then(|ts| ts.to_instant())
    }

    pub fn is_mappable(&self) -> bool {
        self.location.is_some()
    }
}

/// Literal detail fields handed to a detail view, unchanged from the mirrored record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GigDetails {
    pub id: String,
    pub venue: String,
    pub gig_name: String,
    #[serde(rename = "gigName_subHeader", skip_serializing_if = "Option::is_none")]
    pub gig_name_sub_header: Option<String>,
    pub image: String,
    pub blurb: String,
    pub is_free: bool,
    pub genre: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_and_time: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tickets: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_price: Option<TicketPrice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<String>>,
}

impl From<GigRecord> for GigDetails {
    fn from(record: GigRecord) -> Self {
        Self {
            id: record.id,
            venue: record.venue,
            gig_name: record.gig_name,
            gig_name_sub_header: record.gig_name_sub_header,
            image: record.image,
            blurb: record.blurb,
            is_free: record.is_free,
            genre: record.genre,
            date_and_time: record.date_and_time,
            tickets: record.tickets,
            ticket_price: record.ticket_price,
            address: record.address,
            links: record.links,
        }
    }
}
