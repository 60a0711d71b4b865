// Wire representation of an absolute point in time.
//
// The backend stores instants as a (seconds, nanoseconds) pair since the Unix epoch.
// Convert to a `DateTime<Utc>` before doing any calendar work; never treat the pair as a
// local wall-clock value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const NANOS_PER_SECOND: u32 = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    #[serde(default)]
    pub nanoseconds: u32,
}

impl Timestamp {
    pub fn new(seconds: i64, nanoseconds: u32) -> Self {
        Self {
            seconds,
            nanoseconds,
        }
    }

    /// Returns `None` when the pair does not name a representable instant.
    pub fn to_instant(&self) -> Option<DateTime<Utc>> {
        if self.nanoseconds >= NANOS_PER_SECOND {
            return None;
        }
        DateTime::from_timestamp(self.seconds, self.nanoseconds)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(instant: DateTime<Utc>) -> Self {
        Self {
            seconds: instant.timestamp(),
            nanoseconds: instant.timestamp_subsec_nanos(),
        }
    }
}
