use serde::Serialize;
use std::fmt;

/// Lifecycle of one live subscription.
///
/// `Unsubscribed -> Subscribing -> Active`, `Active -> Error` on a channel failure,
/// `Error -> Subscribing` while retrying, and any state `-> Unsubscribed` on close.
/// Change batches are only applied while `Active`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubscriptionState {
    Unsubscribed,
    Subscribing,
    Active,
    Error { reason: String },
}

impl SubscriptionState {
    pub fn is_active(&self) -> bool {
        matches!(self, SubscriptionState::Active)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SubscriptionState::Error { .. })
    }
}

impl fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionState::Unsubscribed => f.write_str("unsubscribed"),
            SubscriptionState::Subscribing => f.write_str("subscribing"),
            SubscriptionState::Active => f.write_str("active"),
            SubscriptionState::Error { reason } => write!(f, "error: {reason}"),
        }
    }
}
