// Process configuration read from the environment.
//
// `from_env` reads the real environment (after `.env` has been loaded by the binary);
// `from_lookup` takes any name -> value function so parsing can be tested without touching
// process state.

use crate::modules::sync::core::retry::RetryPolicy;
use crate::shared::core::session::Session;
use chrono::Weekday;
use chrono_tz::Tz;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const BIND_ADDR_ENV: &str = "GIGS_BIND_ADDR";
pub const TIMEZONE_ENV: &str = "GIGS_TIMEZONE";
pub const WEEK_START_ENV: &str = "GIGS_WEEK_START";
pub const SUBSCRIBE_TIMEOUT_ENV: &str = "GIGS_SUBSCRIBE_TIMEOUT_MS";
pub const WRITE_TIMEOUT_ENV: &str = "GIGS_WRITE_TIMEOUT_MS";
pub const RETRY_MAX_ATTEMPTS_ENV: &str = "GIGS_RETRY_MAX_ATTEMPTS";
pub const RETRY_INITIAL_BACKOFF_ENV: &str = "GIGS_RETRY_INITIAL_BACKOFF_MS";
pub const RETRY_MAX_BACKOFF_ENV: &str = "GIGS_RETRY_MAX_BACKOFF_MS";
pub const USER_ID_ENV: &str = "GIGS_USER_ID";
pub const SEED_FILE_ENV: &str = "GIGS_SEED_FILE";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value `{value}`: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub timezone: Tz,
    pub week_start: Weekday,
    pub subscribe_timeout: Duration,
    pub write_timeout: Duration,
    pub retry: RetryPolicy,
    pub user_id: Option<String>,
    pub seed_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            timezone: chrono_tz::Pacific::Auckland,
            week_start: Weekday::Mon,
            subscribe_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            user_id: None,
            seed_file: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let value = |name: &str| {
            lookup(name)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        Ok(Self {
            bind_addr: parse(BIND_ADDR_ENV, value(BIND_ADDR_ENV))?.unwrap_or(defaults.bind_addr),
            timezone: parse(TIMEZONE_ENV, value(TIMEZONE_ENV))?.unwrap_or(defaults.timezone),
            week_start: parse(WEEK_START_ENV, value(WEEK_START_ENV))?
                .unwrap_or(defaults.week_start),
            subscribe_timeout: millis(SUBSCRIBE_TIMEOUT_ENV, value(SUBSCRIBE_TIMEOUT_ENV))?
                .unwrap_or(defaults.subscribe_timeout),
            write_timeout: millis(WRITE_TIMEOUT_ENV, value(WRITE_TIMEOUT_ENV))?
                .unwrap_or(defaults.write_timeout),
            retry: RetryPolicy {
                max_attempts: parse(RETRY_MAX_ATTEMPTS_ENV, value(RETRY_MAX_ATTEMPTS_ENV))?
                    .unwrap_or(defaults.retry.max_attempts),
                initial_backoff: millis(RETRY_INITIAL_BACKOFF_ENV, value(RETRY_INITIAL_BACKOFF_ENV))?
                    .unwrap_or(defaults.retry.initial_backoff),
                max_backoff: millis(RETRY_MAX_BACKOFF_ENV, value(RETRY_MAX_BACKOFF_ENV))?
                    .unwrap_or(defaults.retry.max_backoff),
            },
            user_id: value(USER_ID_ENV),
            seed_file: value(SEED_FILE_ENV).map(PathBuf::from),
        })
    }

    pub fn session(&self) -> Session {
        match &self.user_id {
            Some(user_id) => Session::signed_in(user_id.clone()),
            None => Session::anonymous(),
        }
    }
}

fn parse<T>(name: &'static str, raw: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|raw| {
        raw.parse::<T>().map_err(|error| ConfigError::Invalid {
            name,
            reason: error.to_string(),
            value: raw,
        })
    })
    .transpose()
}

fn millis(name: &'static str, raw: Option<String>) -> Result<Option<Duration>, ConfigError> {
    Ok(parse::<u64>(name, raw)?.map(Duration::from_millis))
}
