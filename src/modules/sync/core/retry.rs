use std::time::Duration;

/// Automatic resubscription after a channel failure.
///
/// Delays double from `initial_backoff` up to `max_backoff`. After `max_attempts` failed
/// reopen attempts the subscription stays in `Error` until it is subscribed again
/// explicitly. `max_attempts == 0` disables automatic resubscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_attempts > 0
    }

    /// Delay before reopen attempt number `attempt` (zero based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}
