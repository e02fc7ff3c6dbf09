//! Ledger configuration.

use crate::error::{Error, Result};
use chrono::Duration;
use std::env;
use std::fmt::Display;
use std::str::FromStr;

/// Default durable-storage key for the payment list.
pub const DEFAULT_STORAGE_KEY: &str = "delivery_kit.payments";

/// Restaurant label used when a payment is created without one.
pub const DEFAULT_RESTAURANT: &str = "Restaurante";

/// Hours between creation and due date.
pub const DEFAULT_DUE_HOURS: i64 = 24;

/// What to do when stored content cannot be parsed at load time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LoadPolicy {
    /// Refuse to open. The stored bytes stay untouched for inspection.
    #[default]
    FailFast,

    /// Log a warning and start empty. The next mutation overwrites the
    /// unreadable content.
    StartEmpty,
}

impl FromStr for LoadPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" | "fail_fast" => Ok(LoadPolicy::FailFast),
            "empty" | "start_empty" => Ok(LoadPolicy::StartEmpty),
            other => Err(Error::ConfigError(format!(
                "Unknown load policy '{}', expected 'fail' or 'empty'",
                other
            ))),
        }
    }
}

/// Configuration for [`PaymentLedger`](crate::ledger::PaymentLedger).
///
/// # Example
///
/// ```
/// use delivery_kit::config::{LedgerConfig, LoadPolicy};
/// use chrono::Duration;
///
/// let config = LedgerConfig::default()
///     .with_storage_key("pagamentos")
///     .with_due_after(Duration::hours(48))
///     .with_load_policy(LoadPolicy::StartEmpty);
///
/// assert_eq!(config.storage_key, "pagamentos");
/// ```
#[derive(Clone, Debug)]
pub struct LedgerConfig {
    /// Key under which the whole payment list is stored.
    pub storage_key: String,

    /// Restaurant label for payments created without one.
    pub default_restaurant: String,

    /// Offset from creation to due date.
    pub due_after: Duration,

    /// Handling of unparsable stored content.
    pub load_policy: LoadPolicy,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            default_restaurant: DEFAULT_RESTAURANT.to_string(),
            due_after: Duration::hours(DEFAULT_DUE_HOURS),
            load_policy: LoadPolicy::default(),
        }
    }
}

impl LedgerConfig {
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn with_default_restaurant(mut self, name: impl Into<String>) -> Self {
        self.default_restaurant = name.into();
        self
    }

    pub fn with_due_after(mut self, due_after: Duration) -> Self {
        self.due_after = due_after;
        self
    }

    pub fn with_load_policy(mut self, policy: LoadPolicy) -> Self {
        self.load_policy = policy;
        self
    }

    /// Load from environment variables, falling back to defaults.
    ///
    /// - `DELIVERY_LEDGER_KEY`
    /// - `DELIVERY_DEFAULT_RESTAURANT`
    /// - `DELIVERY_DUE_HOURS`
    /// - `DELIVERY_LEDGER_ON_CORRUPT` (`fail` or `empty`)
    ///
    /// # Errors
    /// Returns `Error::ConfigError` if a variable is set but invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let due_hours: i64 = try_load(&lookup, "DELIVERY_DUE_HOURS", DEFAULT_DUE_HOURS)?;
        if due_hours <= 0 {
            return Err(Error::ConfigError(format!(
                "DELIVERY_DUE_HOURS must be positive, got {}",
                due_hours
            )));
        }

        Ok(LedgerConfig {
            storage_key: try_load(&lookup, "DELIVERY_LEDGER_KEY", DEFAULT_STORAGE_KEY.to_string())?,
            default_restaurant: try_load(
                &lookup,
                "DELIVERY_DEFAULT_RESTAURANT",
                DEFAULT_RESTAURANT.to_string(),
            )?,
            due_after: Duration::hours(due_hours),
            load_policy: try_load(&lookup, "DELIVERY_LEDGER_ON_CORRUPT", LoadPolicy::default())?,
        })
    }
}

fn try_load<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr + std::fmt::Debug,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e| {
            warn!("Invalid {key} value: {e}");
            Error::ConfigError(format!("Invalid {key} value '{raw}': {e}"))
        }),
        None => {
            info!("{key} not set, using default: {default:?}");
            Ok(default)
        }
    }
}
