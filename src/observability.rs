//! Observability hooks for the ledger and the catalog cache.
//!
//! Two concerns live here:
//!
//! - **Metrics**: `LedgerMetrics` for payment lifecycle events and
//!   `CacheMetrics` for cached catalog queries. Both have log-backed default
//!   methods, so an implementation only overrides what it exports.
//! - **TTL policies**: `TtlPolicy` controls how long cached query results live.
//!
//! ```ignore
//! use delivery_kit::observability::LedgerMetrics;
//!
//! struct PrometheusLedgerMetrics;
//!
//! impl LedgerMetrics for PrometheusLedgerMetrics {
//!     fn record_created(&self, _id: &str, _amount: f64) {
//!         // counter!("payments_created").inc();
//!     }
//! }
//!
//! // let ledger = PaymentLedger::open(storage, config)?
//! //     .with_metrics(Box::new(PrometheusLedgerMetrics));
//! ```
//!
//! # TTL Policies
//!
//! | Policy | Use Case |
//! |--------|----------|
//! | `Default` | Let backend decide |
//! | `Fixed` | Uniform lifetime for every table |
//! | `Infinite` | Rely on mutation invalidation only |
//! | `PerType` | Restaurants change rarely, orders often |

use std::time::Duration;

/// Trait for payment ledger metrics.
pub trait LedgerMetrics: Send + Sync {
    /// A payment was created.
    fn record_created(&self, id: &str, amount: f64) {
        debug!("Ledger CREATE: {} amount {:.2}", id, amount);
    }

    /// A payment was confirmed.
    fn record_paid(&self, id: &str) {
        debug!("Ledger PAID: {}", id);
    }

    /// A confirmation targeted an unknown or terminal payment.
    fn record_rejected(&self, id: &str) {
        debug!("Ledger REJECTED mark-paid: {}", id);
    }

    /// Writing the payment list to durable storage failed.
    fn record_persist_error(&self, key: &str, error: &str) {
        warn!("Ledger PERSIST ERROR for {}: {}", key, error);
    }
}

/// Trait for catalog cache metrics collection.
pub trait CacheMetrics: Send + Sync {
    /// Record a cache hit.
    fn record_hit(&self, key: &str, duration: Duration) {
        debug!("Cache HIT: {} took {:?}", key, duration);
    }

    /// Record a cache miss.
    fn record_miss(&self, key: &str, duration: Duration) {
        debug!("Cache MISS: {} took {:?}", key, duration);
    }

    /// Record a cache set operation.
    fn record_set(&self, key: &str, duration: Duration) {
        debug!("Cache SET: {} took {:?}", key, duration);
    }

    /// Record a cache delete operation.
    fn record_delete(&self, key: &str, duration: Duration) {
        debug!("Cache DELETE: {} took {:?}", key, duration);
    }

    /// Record an error.
    fn record_error(&self, key: &str, error: &str) {
        warn!("Cache ERROR for {}: {}", key, error);
    }
}

/// Log-only metrics (the trait defaults).
#[derive(Clone, Default)]
pub struct LogMetrics;

impl LedgerMetrics for LogMetrics {}
impl CacheMetrics for LogMetrics {}

/// Metrics that record nothing.
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl LedgerMetrics for NoOpMetrics {
    fn record_created(&self, _id: &str, _amount: f64) {}
    fn record_paid(&self, _id: &str) {}
    fn record_rejected(&self, _id: &str) {}
    fn record_persist_error(&self, _key: &str, _error: &str) {}
}

impl CacheMetrics for NoOpMetrics {
    fn record_hit(&self, _key: &str, _duration: Duration) {}
    fn record_miss(&self, _key: &str, _duration: Duration) {}
    fn record_set(&self, _key: &str, _duration: Duration) {}
    fn record_delete(&self, _key: &str, _duration: Duration) {}
    fn record_error(&self, _key: &str, _error: &str) {}
}

/// TTL (Time-to-Live) policy for cached query results.
#[derive(Clone, Debug, Default)]
pub enum TtlPolicy {
    /// Use backend's default TTL
    #[default]
    Default,

    /// Fixed duration for all entries
    Fixed(Duration),

    /// No TTL (entries live until invalidated)
    Infinite,

    /// Custom per-table policy
    PerType(fn(&str) -> Duration),
}

impl TtlPolicy {
    /// Get TTL for a table.
    pub fn get_ttl(&self, table: &str) -> Option<Duration> {
        match self {
            TtlPolicy::Default => None,
            TtlPolicy::Fixed(d) => Some(*d),
            TtlPolicy::Infinite => None,
            TtlPolicy::PerType(f) => Some(f(table)),
        }
    }
}
