// Day, week and map views for presentation.
//
// Purpose
// - Turn a calendar date picked by the user into a reference instant in the observer's
//   zone, and run the temporal filters over the current index snapshot.
//
// Notes
// - A date maps to local noon of that day, which exists on every calendar day.
// - Reads only; never blocks on the subscription.

use crate::modules::gigs::core::event_index::IndexReader;
use crate::modules::gigs::core::gig::{GigDetails, GigRecord};
use crate::modules::gigs::core::temporal::{
    DayBucket, add_days, filter_by_day, filter_by_week, filter_free, filter_free_buckets,
    filter_mappable,
};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrowseError {
    #[error("date {0} cannot be placed in the configured time zone")]
    UnrepresentableDate(NaiveDate),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayView {
    pub date: NaiveDate,
    pub previous: Option<NaiveDate>,
    pub next: Option<NaiveDate>,
    pub events: Vec<GigRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekView {
    pub date: NaiveDate,
    pub days: Vec<DayBucket>,
}

pub struct BrowseGigsHandler {
    index: IndexReader,
    zone: Tz,
    week_start: Weekday,
}

impl BrowseGigsHandler {
    pub fn new(index: IndexReader, zone: Tz, week_start: Weekday) -> Self {
        Self {
            index,
            zone,
            week_start,
        }
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Current calendar day in the observer's zone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.zone).date_naive()
    }

    pub fn reference_for(&self, date: NaiveDate) -> Result<DateTime<Tz>, BrowseError> {
        let noon = date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN));
        self.zone
            .from_local_datetime(&noon)
            .earliest()
            .ok_or(BrowseError::UnrepresentableDate(date))
    }

    pub fn events_for_day(&self, date: NaiveDate, free_only: bool) -> Result<DayView, BrowseError> {
        let reference = self.reference_for(date)?;
        let snapshot = self.index.snapshot();
        let mut events = filter_by_day(snapshot.iter(), &reference);
        if free_only {
            events = filter_free(&events);
        }
        Ok(DayView {
            date,
            previous: add_days(&reference, -1).map(|day| day.date_naive()),
            next: add_days(&reference, 1).map(|day| day.date_naive()),
            events,
        })
    }

    pub fn events_for_week(&self, date: NaiveDate, free_only: bool) -> Result<WeekView, BrowseError> {
        let reference = self.reference_for(date)?;
        let snapshot = self.index.snapshot();
        let mut days = filter_by_week(snapshot.iter(), &reference, self.week_start);
        if free_only {
            days = filter_free_buckets(days);
        }
        Ok(WeekView { date, days })
    }

    /// Day view restricted to gigs that can be placed on a map.
    pub fn map_for_day(&self, date: NaiveDate, free_only: bool) -> Result<DayView, BrowseError> {
        let mut view = self.events_for_day(date, free_only)?;
        view.events = filter_mappable(&view.events);
        Ok(view)
    }

    pub fn details(&self, gig_id: &str) -> Option<GigDetails> {
        self.index.get_by_id(gig_id).map(GigDetails::from)
    }
}
