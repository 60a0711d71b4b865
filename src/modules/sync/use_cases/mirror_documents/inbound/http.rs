use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;

use crate::modules::gigs::core::integrity::DiagnosticCounts;
use crate::modules::sync::core::state::SubscriptionState;
use crate::shell::state::AppState;

#[derive(Serialize)]
pub struct SyncStatus {
    pub events: SubscriptionState,
    pub user: Option<SubscriptionState>,
    pub indexed_gigs: usize,
    pub index_revision: u64,
    pub pending_mutations: usize,
    pub diagnostics: DiagnosticCounts,
}

pub async fn handle(State(state): State<AppState>) -> impl IntoResponse {
    let subscriptions = &state.subscriptions;
    let user = match state.session.user_id() {
        Some(user_id) => Some(subscriptions.user_state(user_id).await),
        None => None,
    };
    let snapshot = subscriptions.index().snapshot();
    Json(SyncStatus {
        events: subscriptions.events_state().await,
        user,
        indexed_gigs: snapshot.len(),
        index_revision: snapshot.revision(),
        pending_mutations: state.preferences.pending_mutations().await,
        diagnostics: subscriptions.diagnostics().counts(),
    })
}

#[cfg(test)]
mod mirror_documents_http_inbound_tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        routing::get,
    };
    use chrono::NaiveDate;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::shared::infrastructure::document_store::Collection;
    use crate::shell::state::AppState;
    use crate::tests::fixtures::gigs::GigRecordBuilder;
    use crate::tests::fixtures::state::{auckland, test_state};
    use crate::tests::fixtures::store::seeded_store;
    use crate::tests::fixtures::users::UserRecordBuilder;

    use super::handle;

    async fn status_of(state: AppState) -> Value {
        let response = Router::new()
            .route("/sync/status", get(handle))
            .with_state(state)
            .oneshot(Request::get("/sync/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn it_should_report_active_subscriptions_and_skipped_documents() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let store = seeded_store(
            vec![
                GigRecordBuilder::new("ok")
                    .starts_at(auckland(day, 20))
                    .location(-41.29, 174.77)
                    .build(),
            ],
            vec![UserRecordBuilder::new("user-1").build()],
        );
        let bad = match json!({ "gigName": "Broken", "likes": -1 }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        store.put(Collection::Gigs, "bad", bad).await;
        let state = test_state(store, Some("user-1")).await;

        let status = status_of(state).await;

        assert_eq!(status["events"], json!({ "state": "active" }));
        assert_eq!(status["user"], json!({ "state": "active" }));
        assert_eq!(status["indexed_gigs"], json!(1));
        assert_eq!(status["pending_mutations"], json!(0));
        assert_eq!(status["diagnostics"]["malformed"], json!(1));
        assert_eq!(status["diagnostics"]["missing_location"], json!(0));
    }

    #[tokio::test]
    async fn it_should_report_unsubscribed_after_shutdown() {
        let state = test_state(seeded_store(vec![], vec![]), None).await;
        state.shutdown().await;

        let status = status_of(state).await;

        assert_eq!(status["events"], json!({ "state": "unsubscribed" }));
        assert_eq!(status["user"], Value::Null);
    }
}
