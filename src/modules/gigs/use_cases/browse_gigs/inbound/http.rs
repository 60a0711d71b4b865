use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::modules::gigs::use_cases::browse_gigs::handler::{BrowseError, BrowseGigsHandler};
use crate::shell::state::AppState;

#[derive(Deserialize)]
pub struct BrowseParams {
    pub date: Option<NaiveDate>,
    pub free: Option<bool>,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

fn date_or_today(browse: &BrowseGigsHandler, params: &BrowseParams) -> NaiveDate {
    params.date.unwrap_or_else(|| browse.today())
}

fn respond<T: Serialize>(result: Result<T, BrowseError>) -> Response {
    match result {
        Ok(view) => Json(view).into_response(),
        Err(error) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: error.to_string(),
            }),
        )
            .into_response(),
    }
}

pub async fn day(
    State(state): State<AppState>,
    Query(params): Query<BrowseParams>,
) -> impl IntoResponse {
    let date = date_or_today(&state.browse, &params);
    respond(
        state
            .browse
            .events_for_day(date, params.free.unwrap_or(false)),
    )
}

pub async fn week(
    State(state): State<AppState>,
    Query(params): Query<BrowseParams>,
) -> impl IntoResponse {
    let date = date_or_today(&state.browse, &params);
    respond(
        state
            .browse
            .events_for_week(date, params.free.unwrap_or(false)),
    )
}

pub async fn map(
    State(state): State<AppState>,
    Query(params): Query<BrowseParams>,
) -> impl IntoResponse {
    let date = date_or_today(&state.browse, &params);
    respond(state.browse.map_for_day(date, params.free.unwrap_or(false)))
}

pub async fn details(
    State(state): State<AppState>,
    Path(gig_id): Path<String>,
) -> impl IntoResponse {
    match state.browse.details(&gig_id) {
        Some(details) => Json(details).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
