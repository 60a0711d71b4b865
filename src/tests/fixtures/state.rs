// Fully wired application state over an in-memory store.

use crate::shared::infrastructure::document_store::in_memory::InMemoryDocumentStore;
use crate::shell::config::AppConfig;
use crate::shell::state::AppState;
use chrono::{NaiveDate, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;

pub fn test_config(user_id: Option<&str>) -> AppConfig {
    AppConfig {
        subscribe_timeout: Duration::from_secs(2),
        write_timeout: Duration::from_secs(2),
        retry: crate::modules::sync::core::retry::RetryPolicy::disabled(),
        user_id: user_id.map(str::to_string),
        ..AppConfig::default()
    }
}

pub async fn test_state(store: Arc<InMemoryDocumentStore>, user_id: Option<&str>) -> AppState {
    AppState::connect(&test_config(user_id), store).await.unwrap()
}

/// `hour`:00 on the given day in the default observer zone (Pacific/Auckland), as UTC.
pub fn auckland(date: NaiveDate, hour: u32) -> chrono::DateTime<Utc> {
    chrono_tz::Pacific::Auckland
        .from_local_datetime(&date.and_hms_opt(hour, 0, 0).unwrap())
        .unwrap()
        .with_timezone(&Utc)
}
