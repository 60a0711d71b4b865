use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::modules::users::use_cases::manage_preferences::coordinator::MutationError;
use crate::shared::infrastructure::document_store::DocumentStoreError;
use crate::shell::state::AppState;

#[derive(Deserialize)]
pub struct UpdateProfileBody {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Serialize)]
pub struct MutationAccepted {
    pub mutation_id: String,
}

#[derive(Serialize)]
pub struct RecommendationCount {
    pub gig_id: String,
    pub likes: u64,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub fn status_for(error: &MutationError) -> StatusCode {
    match error {
        MutationError::SignedOut => StatusCode::UNAUTHORIZED,
        MutationError::NotSessionUser(_) | MutationError::UserNotLoaded(_) => StatusCode::CONFLICT,
        MutationError::UnknownGig(_) | MutationError::Store(DocumentStoreError::NotFound { .. }) => {
            StatusCode::NOT_FOUND
        }
        MutationError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        MutationError::Store(DocumentStoreError::PermissionDenied(_)) => StatusCode::FORBIDDEN,
        MutationError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn error_response(error: MutationError) -> Response {
    (
        status_for(&error),
        Json(ErrorBody {
            error: error.to_string(),
        }),
    )
        .into_response()
}

fn session_user(state: &AppState) -> Result<String, Response> {
    state
        .session
        .user_id()
        .map(str::to_string)
        .ok_or_else(|| error_response(MutationError::SignedOut))
}

pub async fn toggle_like(
    State(state): State<AppState>,
    Path(gig_id): Path<String>,
) -> impl IntoResponse {
    let user_id = match session_user(&state) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    match state.preferences.toggle_like(&user_id, &gig_id).await {
        Ok(toggled) => Json(toggled).into_response(),
        Err(error) => error_response(error),
    }
}

pub async fn recommend(
    State(state): State<AppState>,
    Path(gig_id): Path<String>,
) -> impl IntoResponse {
    match state.preferences.recommend_gig(&gig_id).await {
        Ok(likes) => Json(RecommendationCount { gig_id, likes }).into_response(),
        Err(error) => error_response(error),
    }
}

pub async fn recommendations(
    State(state): State<AppState>,
    Path(gig_id): Path<String>,
) -> impl IntoResponse {
    match state.preferences.recommendation_count(&gig_id).await {
        Ok(likes) => Json(RecommendationCount { gig_id, likes }).into_response(),
        Err(error) => error_response(error),
    }
}

pub async fn notify_me(
    State(state): State<AppState>,
    Path(gig_id): Path<String>,
) -> impl IntoResponse {
    let user_id = match session_user(&state) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    match state.preferences.notify_me(&user_id, &gig_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub async fn stop_notifying(
    State(state): State<AppState>,
    Path(gig_id): Path<String>,
) -> impl IntoResponse {
    let user_id = match session_user(&state) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    match state.preferences.stop_notifying(&user_id, &gig_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub async fn saved_gigs(State(state): State<AppState>) -> impl IntoResponse {
    let user_id = match session_user(&state) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    match state.preferences.saved_gigs(&user_id) {
        Ok(gigs) => Json(gigs).into_response(),
        Err(error) => error_response(error),
    }
}

pub async fn update_profile(
    State(state): State<AppState>,
    body: Result<Json<UpdateProfileBody>, JsonRejection>,
) -> impl IntoResponse {
    let Json(body) = match body {
        Ok(b) => b,
        Err(_) => return StatusCode::UNPROCESSABLE_ENTITY.into_response(),
    };
    let user_id = match session_user(&state) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };
    match state
        .preferences
        .update_profile(&user_id, &body.first_name, &body.last_name)
        .await
    {
        Ok(mutation_id) => Json(MutationAccepted {
            mutation_id: mutation_id.to_string(),
        })
        .into_response(),
        Err(error) => error_response(error),
    }
}
