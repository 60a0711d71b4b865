// Day and week views over an index snapshot.
//
// Pure functions; no stored state. The observer's time zone travels with the reference
// instant (`DateTime<Tz>`), and every event instant is converted into that zone before its
// calendar day is compared.
//
// Events without a usable `dateAndTime` never match a calendar day. Map-bound views also
// drop events without a `location`; list-bound views keep them.

use crate::modules::gigs::core::gig::GigRecord;
use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, TimeZone, Weekday};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayBucket {
    pub day: NaiveDate,
    pub events: Vec<GigRecord>,
}

/// Calendar day of `record` in `zone`, if it has a representable instant.
pub fn calendar_day<Tz: TimeZone>(record: &GigRecord, zone: &Tz) -> Option<NaiveDate> {
    record
        .starts_at()
        .map(|instant| instant.with_timezone(zone).date_naive())
}

/// Events on the same local calendar day as `reference`, in chronological order.
pub fn filter_by_day<'a, Tz: TimeZone>(
    events: impl IntoIterator<Item = &'a GigRecord>,
    reference: &DateTime<Tz>,
) -> Vec<GigRecord> {
    let zone = reference.timezone();
    let day = reference.date_naive();
    let mut matching: Vec<GigRecord> = events
        .into_iter()
        .filter(|record| calendar_day(*record, &zone) == Some(day))
        .cloned()
        .collect();
    sort_chronologically(&mut matching);
    matching
}

/// First day of the week containing `day`.
pub fn week_start_of(day: NaiveDate, week_start: Weekday) -> NaiveDate {
    let offset = (day.weekday().num_days_from_monday() + 7 - week_start.num_days_from_monday()) % 7;
    day - Duration::days(i64::from(offset))
}

/// Events in the 7-day week containing `reference`, grouped per calendar day.
///
/// Only days with at least one event get a bucket. Buckets are ordered by day and events
/// inside a bucket chronologically.
pub fn filter_by_week<'a, Tz: TimeZone>(
    events: impl IntoIterator<Item = &'a GigRecord>,
    reference: &DateTime<Tz>,
    week_start: Weekday,
) -> Vec<DayBucket> {
    let zone = reference.timezone();
    let first = week_start_of(reference.date_naive(), week_start);

    let mut buckets: Vec<DayBucket> = (0..7)
        .map(|offset| DayBucket {
            day: first + Duration::days(offset),
            events: Vec::new(),
        })
        .collect();

    for record in events {
        let Some(day) = calendar_day(record, &zone) else {
            continue;
        };
        let offset = (day - first).num_days();
        if let Some(bucket) = usize::try_from(offset).ok().and_then(|i| buckets.get_mut(i)) {
            bucket.events.push(record.clone());
        }
    }

    buckets.retain(|bucket| !bucket.events.is_empty());
    for bucket in &mut buckets {
        sort_chronologically(&mut bucket.events);
    }
    buckets
}

pub fn filter_free(events: &[GigRecord]) -> Vec<GigRecord> {
    events.iter().filter(|record| record.is_free).cloned().collect()
}

/// Free filter applied per bucket; buckets left empty are dropped.
pub fn filter_free_buckets(buckets: Vec<DayBucket>) -> Vec<DayBucket> {
    buckets
        .into_iter()
        .map(|bucket| DayBucket {
            events: filter_free(&bucket.events),
            day: bucket.day,
        })
        .filter(|bucket| !bucket.events.is_empty())
        .collect()
}

/// Events that can be placed on a map.
pub fn filter_mappable(events: &[GigRecord]) -> Vec<GigRecord> {
    events.iter().filter(|record| record.is_mappable()).cloned().collect()
}

/// Move `reference` by `delta` calendar days, keeping the local wall-clock time.
///
/// An ambiguous local time resolves to the earlier instant. A local time skipped by a
/// daylight-saving jump moves forward one hour. Returns `None` when the result is out of
/// range.
pub fn add_days<Tz: TimeZone>(reference: &DateTime<Tz>, delta: i64) -> Option<DateTime<Tz>> {
    let local = reference.naive_local();
    let magnitude = Days::new(delta.unsigned_abs());
    let shifted = if delta >= 0 {
        local.checked_add_days(magnitude)?
    } else {
        local.checked_sub_days(magnitude)?
    };
    let zone = reference.timezone();
    zone.from_local_datetime(&shifted).earliest().or_else(|| {
        zone.from_local_datetime(&(shifted + Duration::hours(1)))
            .earliest()
    })
}

fn sort_chronologically(events: &mut [GigRecord]) {
    events.sort_by_key(|record| record.starts_at());
}
