use crate::shared::infrastructure::document_store::{Collection, RawChange};
use crate::shell::http::router;
use crate::shell::state::AppState;
use crate::tests::fixtures::gigs::GigRecordBuilder;
use crate::tests::fixtures::state::{auckland, test_state};
use crate::tests::fixtures::store::seeded_store;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;

fn march(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

async fn get_json(state: &AppState, uri: &str) -> (StatusCode, Value) {
    let response = router(state.clone())
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn event_ids(events: &Value) -> Vec<String> {
    events
        .as_array()
        .unwrap()
        .iter()
        .map(|event| event["id"].as_str().unwrap().to_string())
        .collect()
}

fn revision(state: &AppState) -> u64 {
    state.subscriptions.index().snapshot().revision()
}

async fn wait_past(state: &AppState, revision: u64) {
    let reader = state.subscriptions.index();
    tokio::time::timeout(Duration::from_secs(2), reader.wait_for_revision(revision + 1))
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn lists_an_evening_gig_on_its_own_local_day_only() {
    let store = seeded_store(
        vec![
            GigRecordBuilder::new("evening")
                .starts_at(auckland(march(5), 20))
                .build(),
        ],
        vec![],
    );
    let state = test_state(store, None).await;

    let (status, day) = get_json(&state, "/gigs/day?date=2024-03-05").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(event_ids(&day["events"]), vec!["evening"]);

    let (_, next_day) = get_json(&state, "/gigs/day?date=2024-03-06").await;
    assert!(event_ids(&next_day["events"]).is_empty());
}

#[tokio::test]
async fn puts_only_located_gigs_on_the_map() {
    let store = seeded_store(
        vec![
            GigRecordBuilder::new("a")
                .starts_at(auckland(march(5), 19))
                .build(),
            GigRecordBuilder::new("b")
                .starts_at(auckland(march(5), 21))
                .location(0.0, 0.0)
                .build(),
        ],
        vec![],
    );
    let state = test_state(store, None).await;

    let (_, list) = get_json(&state, "/gigs/day?date=2024-03-05").await;
    assert_eq!(event_ids(&list["events"]), vec!["a", "b"]);

    let (_, map) = get_json(&state, "/gigs/map?date=2024-03-05").await;
    assert_eq!(event_ids(&map["events"]), vec!["b"]);
}

#[tokio::test]
async fn keeps_the_slot_of_a_gig_removed_and_re_added_in_one_batch() {
    let store = seeded_store(
        vec![
            GigRecordBuilder::new("a").venue("San Fran").build(),
            GigRecordBuilder::new("b").venue("Meow").build(),
        ],
        vec![],
    );
    let state = test_state(store.clone(), None).await;
    let before: Vec<String> = state
        .subscriptions
        .index()
        .snapshot()
        .iter()
        .map(|record| record.id.clone())
        .collect();
    let seen = revision(&state);

    store
        .publish_batch(
            Collection::Gigs,
            vec![
                RawChange::removed("a"),
                RawChange::added("a", GigRecordBuilder::new("a").venue("Valhalla").fields()),
            ],
        )
        .await;
    wait_past(&state, seen).await;

    let (status, details) = get_json(&state, "/gigs/a").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["venue"], json!("Valhalla"));
    let after: Vec<String> = state
        .subscriptions
        .index()
        .snapshot()
        .iter()
        .map(|record| record.id.clone())
        .collect();
    assert_eq!(after, before);
}

#[tokio::test]
async fn shows_gigs_published_after_the_subscription_opened() {
    let store = seeded_store(vec![], vec![]);
    let state = test_state(store.clone(), None).await;
    let seen = revision(&state);

    store
        .put(
            Collection::Gigs,
            "late-addition",
            GigRecordBuilder::new("late-addition")
                .starts_at(auckland(march(8), 21))
                .free(true)
                .fields(),
        )
        .await;
    wait_past(&state, seen).await;

    let (_, week) = get_json(&state, "/gigs/week?date=2024-03-06&free=true").await;
    assert_eq!(week["days"][0]["day"], json!("2024-03-08"));
    assert_eq!(event_ids(&week["days"][0]["events"]), vec!["late-addition"]);

    let seen = revision(&state);
    store.delete(Collection::Gigs, "late-addition").await;
    wait_past(&state, seen).await;

    let (status, _) = get_json(&state, "/gigs/late-addition").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
