use async_graphql::{Context, Object, Result as GqlResult};
use chrono::{DateTime, NaiveDate, Utc};

use crate::modules::gigs::core::gig::GigRecord;
use crate::modules::gigs::core::temporal::DayBucket;
use crate::modules::gigs::use_cases::browse_gigs::handler::{DayView, WeekView};
use crate::shell::state::AppState;

#[derive(async_graphql::SimpleObject, Clone)]
pub struct GqlGig {
    pub id: String,
    pub gig_name: String,
    pub gig_name_sub_header: Option<String>,
    pub venue: String,
    pub address: Option<String>,
    pub genre: String,
    pub blurb: String,
    pub image: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub is_free: bool,
    pub ticket_price: Option<String>,
    pub tickets: Option<String>,
    pub links: Option<Vec<String>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub likes: u64,
}

impl From<GigRecord> for GqlGig {
    fn from(r: GigRecord) -> Self {
        Self {
            starts_at: r.starts_at(),
            ticket_price: r.ticket_price.as_ref().map(ToString::to_string),
            latitude: r.location.map(|point| point.latitude),
            longitude: r.location.map(|point| point.longitude),
            id: r.id,
            gig_name: r.gig_name,
            gig_name_sub_header: r.gig_name_sub_header,
            venue: r.venue,
            address: r.address,
            genre: r.genre,
            blurb: r.blurb,
            image: r.image,
            is_free: r.is_free,
            tickets: r.tickets,
            links: r.links,
            likes: r.likes,
        }
    }
}

#[derive(async_graphql::SimpleObject, Clone)]
pub struct GqlDay {
    pub date: NaiveDate,
    pub previous: Option<NaiveDate>,
    pub next: Option<NaiveDate>,
    pub events: Vec<GqlGig>,
}

impl From<DayView> for GqlDay {
    fn from(v: DayView) -> Self {
        Self {
            date: v.date,
            previous: v.previous,
            next: v.next,
            events: v.events.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(async_graphql::SimpleObject, Clone)]
pub struct GqlDayBucket {
    pub day: NaiveDate,
    pub events: Vec<GqlGig>,
}

impl From<DayBucket> for GqlDayBucket {
    fn from(b: DayBucket) -> Self {
        Self {
            day: b.day,
            events: b.events.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(async_graphql::SimpleObject, Clone)]
pub struct GqlWeek {
    pub date: NaiveDate,
    pub days: Vec<GqlDayBucket>,
}

impl From<WeekView> for GqlWeek {
    fn from(v: WeekView) -> Self {
        Self {
            date: v.date,
            days: v.days.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Default)]
pub struct BrowseGigsQuery;

#[Object]
impl BrowseGigsQuery {
    async fn gigs_for_day(
        &self,
        context: &Context<'_>,
        date: Option<NaiveDate>,
        free_only: Option<bool>,
    ) -> GqlResult<GqlDay> {
        let state = context.data_unchecked::<AppState>();
        let date = date.unwrap_or_else(|| state.browse.today());
        let view = state
            .browse
            .events_for_day(date, free_only.unwrap_or(false))?;
        Ok(view.into())
    }

    async fn gigs_for_week(
        &self,
        context: &Context<'_>,
        date: Option<NaiveDate>,
        free_only: Option<bool>,
    ) -> GqlResult<GqlWeek> {
        let state = context.data_unchecked::<AppState>();
        let date = date.unwrap_or_else(|| state.browse.today());
        let view = state
            .browse
            .events_for_week(date, free_only.unwrap_or(false))?;
        Ok(view.into())
    }

    async fn gigs_on_map(
        &self,
        context: &Context<'_>,
        date: Option<NaiveDate>,
        free_only: Option<bool>,
    ) -> GqlResult<GqlDay> {
        let state = context.data_unchecked::<AppState>();
        let date = date.unwrap_or_else(|| state.browse.today());
        let view = state.browse.map_for_day(date, free_only.unwrap_or(false))?;
        Ok(view.into())
    }

    async fn gig(&self, context: &Context<'_>, id: String) -> Option<GqlGig> {
        let state = context.data_unchecked::<AppState>();
        state.subscriptions.index().get_by_id(&id).map(Into::into)
    }
}
