use crate::modules::sync::core::retry::RetryPolicy;
use crate::modules::sync::core::state::SubscriptionState;
use crate::modules::sync::use_cases::mirror_documents::manager::SubscriptionError;
use crate::shared::infrastructure::document_store::{Collection, DocumentStoreError};
use crate::shell::config::AppConfig;
use crate::shell::http::router;
use crate::shell::state::AppState;
use crate::tests::fixtures::gigs::GigRecordBuilder;
use crate::tests::fixtures::state::{test_config, test_state};
use crate::tests::fixtures::store::seeded_store;
use crate::tests::fixtures::users::UserRecordBuilder;
use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::future::Future;
use std::time::Duration;
use tower::ServiceExt;

async fn sync_status(state: &AppState) -> Value {
    let response = router(state.clone())
        .oneshot(Request::get("/sync/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn eventually<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn reconnects_after_a_channel_error_and_catches_up_on_missed_deletes() {
    let store = seeded_store(
        vec![
            GigRecordBuilder::new("a").build(),
            GigRecordBuilder::new("b").build(),
        ],
        vec![],
    );
    let config = AppConfig {
        retry: RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_millis(100),
        },
        ..test_config(None)
    };
    let state = AppState::connect(&config, store.clone()).await.unwrap();

    store
        .fail_listeners(DocumentStoreError::Backend("connection reset".into()))
        .await;
    store.delete(Collection::Gigs, "a").await;

    let index = state.subscriptions.index();
    eventually(|| {
        let index = index.clone();
        let state = state.clone();
        async move {
            state.subscriptions.events_state().await.is_active() && !index.snapshot().contains("a")
        }
    })
    .await;
    assert!(index.snapshot().contains("b"));
}

#[tokio::test]
async fn reports_the_error_when_retry_is_disabled() {
    let store = seeded_store(vec![GigRecordBuilder::new("a").build()], vec![]);
    let state = test_state(store.clone(), None).await;

    store
        .fail_listeners(DocumentStoreError::Backend("connection reset".into()))
        .await;

    eventually(|| {
        let state = state.clone();
        async move { state.subscriptions.events_state().await.is_error() }
    })
    .await;
    let status = sync_status(&state).await;
    assert_eq!(
        status["events"],
        json!({ "state": "error", "reason": "backend error: connection reset" })
    );
    assert!(state.subscriptions.index().snapshot().contains("a"));
}

#[tokio::test]
async fn clears_the_display_name_when_the_user_document_is_deleted() {
    let store = seeded_store(vec![], vec![UserRecordBuilder::new("u").build()]);
    let state = test_state(store.clone(), Some("u")).await;
    let mut names = state.profile.watch_display_name();
    tokio::time::timeout(Duration::from_secs(2), names.wait_for(|name| name == "Aroha"))
        .await
        .unwrap()
        .unwrap();

    store.delete(Collection::Users, "u").await;

    tokio::time::timeout(Duration::from_secs(2), names.wait_for(String::is_empty))
        .await
        .unwrap()
        .unwrap();
    assert!(state.preferences.cell().current().is_none());
}

#[tokio::test]
async fn shutdown_closes_every_channel() {
    let store = seeded_store(
        vec![GigRecordBuilder::new("a").build()],
        vec![UserRecordBuilder::new("u").build()],
    );
    let state = test_state(store.clone(), Some("u")).await;
    assert_eq!(store.listener_count().await, 2);

    state.shutdown().await;

    eventually(|| {
        let store = store.clone();
        async move { store.listener_count().await == 0 }
    })
    .await;
    assert_eq!(
        state.subscriptions.events_state().await,
        SubscriptionState::Unsubscribed
    );
    assert_eq!(state.profile.current_display_name(), "");
}

#[tokio::test]
async fn a_failed_connect_releases_the_channels_it_opened() {
    let store = seeded_store(
        vec![GigRecordBuilder::new("a").build()],
        vec![UserRecordBuilder::new("u").build()],
    );
    store.deny_listen(Collection::Users).await;

    let error = AppState::connect(&test_config(Some("u")), store.clone())
        .await
        .err()
        .unwrap();

    assert!(matches!(
        error,
        SubscriptionError::Store(DocumentStoreError::PermissionDenied(_))
    ));
    eventually(|| {
        let store = store.clone();
        async move { store.listener_count().await == 0 }
    })
    .await;
}
