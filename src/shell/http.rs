use axum::{
    Router,
    routing::{get, post, put},
};

use crate::modules::gigs::use_cases::browse_gigs::inbound::http as browse_http;
use crate::modules::sync::use_cases::mirror_documents::inbound::http as sync_http;
use crate::modules::users::use_cases::manage_preferences::inbound::http as preferences_http;
use crate::modules::users::use_cases::sync_profile::inbound::http as profile_http;
use crate::shell::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/gigs/day", get(browse_http::day))
        .route("/gigs/week", get(browse_http::week))
        .route("/gigs/map", get(browse_http::map))
        .route("/gigs/{id}", get(browse_http::details))
        .route("/gigs/{id}/like", post(preferences_http::toggle_like))
        .route("/gigs/{id}/recommend", post(preferences_http::recommend))
        .route(
            "/gigs/{id}/recommendations",
            get(preferences_http::recommendations),
        )
        .route(
            "/gigs/{id}/notify",
            post(preferences_http::notify_me).delete(preferences_http::stop_notifying),
        )
        .route("/me/saved-gigs", get(preferences_http::saved_gigs))
        .route("/me/profile", put(preferences_http::update_profile))
        .route("/me/display-name", get(profile_http::handle))
        .route("/sync/status", get(sync_http::handle))
        .with_state(state)
}
