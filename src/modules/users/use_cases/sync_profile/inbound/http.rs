use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;

use crate::shell::state::AppState;

#[derive(Serialize)]
pub struct DisplayNameResponse {
    pub signed_in: bool,
    pub display_name: String,
}

pub async fn handle(State(state): State<AppState>) -> impl IntoResponse {
    Json(DisplayNameResponse {
        signed_in: state.session.is_signed_in(),
        display_name: state.profile.current_display_name(),
    })
}
