use crate::shared::infrastructure::document_store::in_memory::InMemoryDocumentStore;
use crate::shared::infrastructure::document_store::{Collection, DocumentStore};
use crate::shell::http::router;
use crate::shell::state::AppState;
use crate::tests::fixtures::gigs::GigRecordBuilder;
use crate::tests::fixtures::state::{test_config, test_state};
use crate::tests::fixtures::store::seeded_store;
use crate::tests::fixtures::users::UserRecordBuilder;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
    let response = router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn post(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

async fn liked_gigs(store: &InMemoryDocumentStore, user_id: &str) -> Value {
    store
        .get(Collection::Users, user_id)
        .await
        .unwrap()
        .unwrap()["likedGigs"]
        .clone()
}

#[tokio::test]
async fn toggling_a_like_twice_returns_to_the_original_set() {
    let store = seeded_store(
        vec![GigRecordBuilder::new("gig1").build()],
        vec![UserRecordBuilder::new("u").build()],
    );
    let state = test_state(store.clone(), Some("u")).await;

    let (_, first) = send(&state, post("/gigs/gig1/like")).await;
    assert_eq!(first["liked"], json!(true));
    assert_eq!(liked_gigs(&store, "u").await, json!(["gig1"]));

    let (_, second) = send(&state, post("/gigs/gig1/like")).await;
    assert_eq!(second["liked"], json!(false));
    assert_eq!(liked_gigs(&store, "u").await, json!([]));
}

#[tokio::test]
async fn concurrent_recommendations_from_different_sessions_all_count() {
    let store = seeded_store(
        vec![GigRecordBuilder::new("gig1").likes(10).build()],
        vec![
            UserRecordBuilder::new("user-1").build(),
            UserRecordBuilder::new("user-2").build(),
        ],
    );
    let sessions = [Some("user-1"), Some("user-2"), None, None];
    let mut states = Vec::new();
    for user_id in sessions {
        states.push(test_state(store.clone(), user_id).await);
    }

    let mut tasks = Vec::new();
    for state in states.iter().cloned() {
        tasks.push(tokio::spawn(async move {
            state.preferences.recommend_gig("gig1").await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let (status, count) = send(&states[0], get("/gigs/gig1/recommendations")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(count["likes"], json!(14));
}

#[tokio::test]
async fn a_slow_write_times_out_and_rolls_back() {
    let store = seeded_store(
        vec![GigRecordBuilder::new("gig1").build()],
        vec![UserRecordBuilder::new("u").build()],
    );
    let config = crate::shell::config::AppConfig {
        write_timeout: Duration::from_millis(50),
        ..test_config(Some("u"))
    };
    let state = AppState::connect(&config, store.clone()).await.unwrap();
    store.set_write_delay_ms(500);

    let (status, body) = send(&state, post("/gigs/gig1/like")).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["error"], json!("remote write timed out after 50 ms"));
    let record = state.preferences.cell().current().unwrap();
    assert!(!record.has_liked("gig1"));
    assert_eq!(state.preferences.pending_mutations().await, 0);

    // Whether the abandoned write lands is up to the backend; its next notification wins.
    store
        .put(
            Collection::Users,
            "u",
            UserRecordBuilder::new("u").liked(["gig1"]).fields(),
        )
        .await;
    let mut records = state.preferences.cell().subscribe();
    tokio::time::timeout(
        Duration::from_secs(2),
        records.wait_for(|record| record.as_ref().is_some_and(|r| r.has_liked("gig1"))),
    )
    .await
    .unwrap()
    .unwrap();
}

#[tokio::test]
async fn saved_gigs_drop_a_gig_deleted_remotely() {
    let store: Arc<InMemoryDocumentStore> = seeded_store(
        vec![
            GigRecordBuilder::new("kept").build(),
            GigRecordBuilder::new("cancelled").build(),
        ],
        vec![UserRecordBuilder::new("u").liked(["kept", "cancelled"]).build()],
    );
    let state = test_state(store.clone(), Some("u")).await;
    let (_, saved) = send(&state, get("/me/saved-gigs")).await;
    assert_eq!(saved.as_array().unwrap().len(), 2);

    let reader = state.subscriptions.index();
    let seen = reader.snapshot().revision();
    store.delete(Collection::Gigs, "cancelled").await;
    tokio::time::timeout(Duration::from_secs(2), reader.wait_for_revision(seen + 1))
        .await
        .unwrap()
        .unwrap();

    let (_, saved) = send(&state, get("/me/saved-gigs")).await;
    assert_eq!(saved, json!([GigRecordBuilder::new("kept").build()]));
}

#[tokio::test]
async fn a_profile_edit_reaches_the_display_name() {
    let store = seeded_store(vec![], vec![UserRecordBuilder::new("u").build()]);
    let state = test_state(store, Some("u")).await;
    let mut names = state.profile.watch_display_name();

    let request = Request::put("/me/profile")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "first_name": "Mere", "last_name": "Parata" }).to_string(),
        ))
        .unwrap();
    let (status, _) = send(&state, request).await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::timeout(Duration::from_secs(2), names.wait_for(|name| name == "Mere"))
        .await
        .unwrap()
        .unwrap();
    let (_, body) = send(&state, get("/me/display-name")).await;
    assert_eq!(body["display_name"], json!("Mere"));
}
