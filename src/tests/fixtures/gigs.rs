// Shared test fixture for gig records.
// Compiled into the crate only during tests (see the `tests` module in `src/lib.rs`).

use crate::modules::gigs::core::gig::{GeoPoint, GigRecord};
use crate::shared::core::timestamp::Timestamp;
use crate::shared::infrastructure::document_store::Fields;
use chrono::{DateTime, Utc};

const GIG_JSON: &str = include_str!("json/gig.json");

pub struct GigRecordBuilder {
    inner: GigRecord,
}

#[allow(dead_code)]
impl GigRecordBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        let fields: Fields = serde_json::from_str(GIG_JSON).unwrap();
        let id = id.into();
        Self {
            inner: GigRecord::from_document(&id, fields).unwrap(),
        }
    }

    pub fn gig_name(mut self, v: impl Into<String>) -> Self {
        self.inner.gig_name = v.into();
        self
    }

    pub fn venue(mut self, v: impl Into<String>) -> Self {
        self.inner.venue = v.into();
        self
    }

    pub fn starts_at(mut self, v: DateTime<Utc>) -> Self {
        self.inner.date_and_time = Some(Timestamp::from(v));
        self
    }

    pub fn timestamp(mut self, seconds: i64, nanoseconds: u32) -> Self {
        self.inner.date_and_time = Some(Timestamp::new(seconds, nanoseconds));
        self
    }

    pub fn free(mut self, v: bool) -> Self {
        self.inner.is_free = v;
        self
    }

    pub fn location(mut self, latitude: f64, longitude: f64) -> Self {
        self.inner.location = Some(GeoPoint {
            latitude,
            longitude,
        });
        self
    }

    pub fn likes(mut self, v: u64) -> Self {
        self.inner.likes = v;
        self
    }

    pub fn notified<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.notified_users = users.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> GigRecord {
        self.inner
    }

    /// The record as a backend document body.
    pub fn fields(self) -> Fields {
        to_fields(&self.inner)
    }
}

pub fn to_fields(record: &GigRecord) -> Fields {
    match serde_json::to_value(record).unwrap() {
        serde_json::Value::Object(map) => map,
        _ => unreachable!("gig records serialize to objects"),
    }
}

#[cfg(test)]
mod gig_record_builder_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn it_should_start_from_the_json_fixture() {
        let record = GigRecordBuilder::new("gig-1").build();
        assert_eq!(record.id, "gig-1");
        assert_eq!(record.gig_name, "Opening Night");
        assert_eq!(record.venue, "San Fran");
        assert_eq!(record.date_and_time, None);
        assert_eq!(record.location, None);
    }

    #[rstest]
    fn it_should_round_trip_through_document_fields() {
        let record = GigRecordBuilder::new("gig-2")
            .timestamp(1_709_622_000, 0)
            .location(-41.29, 174.77)
            .notified(["user-1"])
            .build();
        let decoded = GigRecord::from_document("gig-2", to_fields(&record)).unwrap();
        assert_eq!(decoded, record);
    }
}
