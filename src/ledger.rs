//! Simulated PIX payment ledger.
//!
//! The ledger keeps every payment in memory, in creation order, and mirrors
//! the complete list to one durable-storage key after each mutation.
//!
//! # Persistence
//!
//! - **Load**: once at [`PaymentLedger::open`] (and on [`PaymentLedger::reload`]).
//!   A missing key means an empty ledger. Unparsable content follows the
//!   configured [`LoadPolicy`]. Read failures are returned.
//! - **Save**: the whole list, after every mutation. Write failures are logged
//!   and reported to [`LedgerMetrics`], never returned; the in-memory state
//!   stays authoritative for the rest of the session.
//!
//! # Multiple instances
//!
//! Two ledgers opened on the same storage key do not coordinate. Each one
//! overwrites the key with its own view, so the last writer wins. Call
//! [`PaymentLedger::reload`] to pick up another writer's list.
//!
//! # Example
//!
//! ```
//! use delivery_kit::{LedgerConfig, PaymentLedger, PaymentStatus};
//! use delivery_kit::storage::InMemoryStorage;
//!
//! # fn main() -> delivery_kit::Result<()> {
//! let mut ledger = PaymentLedger::open(InMemoryStorage::new(), LedgerConfig::default())?;
//!
//! let payment = ledger.create("Plano Ouro", 99.90, None);
//! assert_eq!(payment.status, PaymentStatus::Pending);
//!
//! assert!(ledger.mark_paid(&payment.id));
//! assert_eq!(ledger.list_by_status(PaymentStatus::Paid).len(), 1);
//! # Ok(())
//! # }
//! ```

use crate::clock::{Clock, SystemClock};
use crate::config::{LedgerConfig, LoadPolicy};
use crate::error::{Error, Result};
use crate::observability::{LedgerMetrics, NoOpMetrics};
use crate::payment::{IdGenerator, PaymentRecord, PaymentStatus};
use crate::pix;
use crate::storage::DurableStorage;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;

/// In-memory payment list mirrored to durable storage.
pub struct PaymentLedger<S: DurableStorage> {
    storage: S,
    config: LedgerConfig,
    clock: Arc<dyn Clock>,
    metrics: Box<dyn LedgerMetrics>,
    payments: Vec<PaymentRecord>,
    ids: IdGenerator,
}

impl<S: DurableStorage> PaymentLedger<S> {
    /// Open a ledger on `storage` using the wall clock.
    ///
    /// # Errors
    ///
    /// - `Error::StorageError`: the storage key could not be read
    /// - `Error::DeserializationError`: stored content is not a payment list
    ///   and the load policy is `FailFast`
    pub fn open(storage: S, config: LedgerConfig) -> Result<Self> {
        Self::open_with_clock(storage, config, Arc::new(SystemClock))
    }

    /// Open a ledger with an explicit time source.
    ///
    /// # Errors
    ///
    /// Same as [`open`](Self::open).
    pub fn open_with_clock(storage: S, config: LedgerConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let payments = load(&storage, &config)?;
        let ids = IdGenerator::seeded(payments.iter().map(|p| p.id.as_str()));

        info!(
            "✓ Payment ledger opened on '{}' with {} payments",
            config.storage_key,
            payments.len()
        );

        Ok(PaymentLedger {
            storage,
            config,
            clock,
            metrics: Box::new(NoOpMetrics),
            payments,
            ids,
        })
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Box<dyn LedgerMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Create a pending PIX payment and persist the ledger.
    ///
    /// Never fails. `amount` is stored as given unless it is NaN or
    /// infinite, which JSON cannot hold; those are stored as `0.0`.
    /// `restaurant` falls back to the configured placeholder.
    pub fn create(&mut self, plan: &str, amount: f64, restaurant: Option<&str>) -> PaymentRecord {
        let amount = if amount.is_finite() {
            amount
        } else {
            warn!("⚠ Non-finite amount {} for '{}' stored as 0.00", amount, plan);
            0.0
        };
        let created_at = truncate_to_millis(self.clock.now());
        let restaurant = restaurant
            .unwrap_or(&self.config.default_restaurant)
            .to_string();

        let record = PaymentRecord {
            id: self.ids.next_id(created_at),
            plan: plan.to_string(),
            amount,
            pix_code: pix::generate(amount, &restaurant),
            restaurant,
            status: PaymentStatus::Pending,
            created_at,
            due_at: created_at + self.config.due_after,
        };

        self.payments.push(record.clone());
        self.persist();

        info!(
            "✓ Payment {} created: '{}' {:.2} for {}",
            record.id, record.plan, record.amount, record.restaurant
        );
        self.metrics.record_created(&record.id, record.amount);
        record
    }

    /// Mark the payment `id` as paid.
    ///
    /// Returns `true` when the payment exists and is now paid (including when
    /// it already was). Returns `false`, leaving everything untouched, when no
    /// payment has this id or the payment is in the terminal failed state.
    pub fn mark_paid(&mut self, id: &str) -> bool {
        let Some(record) = self.payments.iter_mut().find(|p| p.id == id) else {
            debug!("mark_paid: payment {} not found", id);
            self.metrics.record_rejected(id);
            return false;
        };

        if !record.status.can_transition_to(PaymentStatus::Paid) {
            warn!(
                "mark_paid: payment {} is {} and cannot become {}",
                id,
                record.status,
                PaymentStatus::Paid
            );
            self.metrics.record_rejected(id);
            return false;
        }

        record.status = PaymentStatus::Paid;
        self.persist();

        info!("✓ Payment {} marked as paid", id);
        self.metrics.record_paid(id);
        true
    }

    /// All payments in creation order.
    pub fn list_all(&self) -> Vec<PaymentRecord> {
        self.payments.clone()
    }

    /// Payments with exactly `status`, in creation order.
    pub fn list_by_status(&self, status: PaymentStatus) -> Vec<PaymentRecord> {
        self.payments
            .iter()
            .filter(|p| p.status == status)
            .cloned()
            .collect()
    }

    /// Look up one payment.
    pub fn get(&self, id: &str) -> Option<PaymentRecord> {
        self.payments.iter().find(|p| p.id == id).cloned()
    }

    /// Pending payments whose due date has passed.
    pub fn overdue(&self) -> Vec<PaymentRecord> {
        let now = self.clock.now();
        self.payments
            .iter()
            .filter(|p| p.is_overdue(now))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.payments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payments.is_empty()
    }

    /// Replace the in-memory list with what storage currently holds.
    ///
    /// # Errors
    ///
    /// Same as [`open`](Self::open). On error the current list is kept.
    pub fn reload(&mut self) -> Result<()> {
        let payments = load(&self.storage, &self.config)?;
        let seeded = IdGenerator::seeded(payments.iter().map(|p| p.id.as_str()));
        if seeded.last_issued() > self.ids.last_issued() {
            self.ids = seeded;
        }
        debug!(
            "Ledger reloaded from '{}': {} -> {} payments",
            self.config.storage_key,
            self.payments.len(),
            payments.len()
        );
        self.payments = payments;
        Ok(())
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Write the full list. Failures are swallowed.
    fn persist(&self) {
        let key = &self.config.storage_key;

        let json = match serde_json::to_string(&self.payments) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize payment ledger: {}", e);
                self.metrics.record_persist_error(key, &e.to_string());
                return;
            }
        };

        if let Err(e) = self.storage.set_item(key, &json) {
            warn!("⚠ Payment ledger not saved to '{}': {}", key, e);
            self.metrics.record_persist_error(key, &e.to_string());
        }
    }
}

/// Read and decode the stored payment list.
fn load<S: DurableStorage>(storage: &S, config: &LedgerConfig) -> Result<Vec<PaymentRecord>> {
    let key = &config.storage_key;

    let Some(raw) = storage.get_item(key)? else {
        debug!("No stored payments under '{}', starting empty", key);
        return Ok(Vec::new());
    };

    let payments: Vec<PaymentRecord> = match serde_json::from_str(&raw) {
        Ok(payments) => payments,
        Err(e) => match config.load_policy {
            LoadPolicy::FailFast => {
                error!("Stored payments under '{}' are unreadable: {}", key, e);
                return Err(Error::DeserializationError(format!(
                    "Stored payments under '{}' are unreadable: {}",
                    key, e
                )));
            }
            LoadPolicy::StartEmpty => {
                warn!(
                    "⚠ Stored payments under '{}' are unreadable ({}), starting empty",
                    key, e
                );
                return Ok(Vec::new());
            }
        },
    };

    Ok(dedupe(payments))
}

/// Keep the first record for each id.
fn dedupe(payments: Vec<PaymentRecord>) -> Vec<PaymentRecord> {
    let mut seen = HashSet::with_capacity(payments.len());
    let before = payments.len();
    let unique: Vec<PaymentRecord> = payments
        .into_iter()
        .filter(|p| seen.insert(p.id.clone()))
        .collect();

    if unique.len() != before {
        warn!(
            "⚠ Dropped {} stored payments with duplicate ids",
            before - unique.len()
        );
    }
    unique
}

/// Stored timestamps carry milliseconds; keep memory identical to storage.
fn truncate_to_millis(instant: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(instant.timestamp_millis()).unwrap_or(instant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::InMemoryStorage;
    use chrono::{Duration, TimeZone};
    use std::sync::Mutex;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn ledger_with_clock() -> (PaymentLedger<InMemoryStorage>, ManualClock) {
        let clock = ManualClock::new(start());
        let ledger = PaymentLedger::open_with_clock(
            InMemoryStorage::new(),
            LedgerConfig::default(),
            Arc::new(clock.clone()),
        )
        .expect("Failed to open ledger");
        (ledger, clock)
    }

    /// Storage whose writes always fail.
    struct ReadOnlyStorage(InMemoryStorage);

    impl DurableStorage for ReadOnlyStorage {
        fn get_item(&self, key: &str) -> Result<Option<String>> {
            self.0.get_item(key)
        }

        fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
            Err(Error::StorageError("quota exceeded".to_string()))
        }

        fn remove_item(&self, _key: &str) -> Result<()> {
            Err(Error::StorageError("quota exceeded".to_string()))
        }
    }

    /// Storage whose reads always fail.
    struct BrokenStorage;

    impl DurableStorage for BrokenStorage {
        fn get_item(&self, _key: &str) -> Result<Option<String>> {
            Err(Error::StorageError("storage disabled".to_string()))
        }

        fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
            Ok(())
        }

        fn remove_item(&self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct CountingMetrics {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl LedgerMetrics for CountingMetrics {
        fn record_created(&self, id: &str, _amount: f64) {
            self.events.lock().unwrap().push(format!("created:{}", id));
        }

        fn record_paid(&self, id: &str) {
            self.events.lock().unwrap().push(format!("paid:{}", id));
        }

        fn record_rejected(&self, id: &str) {
            self.events.lock().unwrap().push(format!("rejected:{}", id));
        }

        fn record_persist_error(&self, key: &str, _error: &str) {
            self.events.lock().unwrap().push(format!("persist_error:{}", key));
        }
    }

    #[test]
    fn test_create_defaults() {
        let (mut ledger, _clock) = ledger_with_clock();

        let payment = ledger.create("Plano Ouro", 99.90, None);

        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.plan, "Plano Ouro");
        assert_eq!(payment.amount, 99.90);
        assert_eq!(payment.restaurant, "Restaurante");
        assert_eq!(payment.created_at, start());
        assert_eq!(payment.due_at - payment.created_at, Duration::hours(24));
        assert_eq!(payment.id, start().timestamp_millis().to_string());
        assert!(payment.pix_code.contains("BR.GOV.BCB.PIX"));
    }

    #[test]
    fn test_create_with_restaurant_persists_immediately() {
        let (mut ledger, _clock) = ledger_with_clock();

        let payment = ledger.create("Plano Prata", 49.5, Some("Sabor Mineiro"));

        let stored = ledger
            .storage()
            .get_item(&ledger.config().storage_key)
            .unwrap()
            .expect("Ledger should be persisted after create");
        let stored: Vec<PaymentRecord> = serde_json::from_str(&stored).unwrap();
        assert_eq!(stored, vec![payment.clone()]);
        assert_eq!(payment.restaurant, "Sabor Mineiro");
    }

    #[test]
    fn test_create_does_not_validate() {
        let (mut ledger, _clock) = ledger_with_clock();

        let payment = ledger.create("", -10.0, Some(""));

        assert_eq!(payment.plan, "");
        assert_eq!(payment.amount, -10.0);
        assert_eq!(payment.restaurant, "");
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_non_finite_amount_keeps_ledger_readable() {
        let storage = InMemoryStorage::new();
        let mut ledger = PaymentLedger::open(storage.clone(), LedgerConfig::default()).unwrap();

        let gold = ledger.create("Plano Ouro", 99.90, None);
        let nan = ledger.create("Plano X", f64::NAN, None);
        let inf = ledger.create("Plano Y", f64::NEG_INFINITY, None);
        assert_eq!(nan.amount, 0.0);
        assert_eq!(inf.amount, 0.0);

        let reopened = PaymentLedger::open(storage, LedgerConfig::default())
            .expect("Ledger should stay readable after a non-finite amount");
        assert_eq!(reopened.list_all(), vec![gold, nan, inf]);
    }

    #[test]
    fn test_id_generator_survives_maximal_stored_id() {
        let storage = InMemoryStorage::new();
        storage
            .set_item(
                crate::config::DEFAULT_STORAGE_KEY,
                &format!(
                    r#"[{{"id":"{}","plano":"P","valor":1.0,"restaurante":"R","status":"pago",
                    "dataCriacao":"2024-06-01T12:00:00.000Z","dataVencimento":"2024-06-02T12:00:00.000Z",
                    "pixCode":"x"}}]"#,
                    i64::MAX
                ),
            )
            .unwrap();
        let mut ledger = PaymentLedger::open(storage.clone(), LedgerConfig::default()).unwrap();

        let first = ledger.create("next", 1.0, None);
        let second = ledger.create("after", 1.0, None);

        assert_ne!(first.id, i64::MAX.to_string());
        assert_ne!(first.id, second.id);
        assert!(!first.id.starts_with('-'));
        let reopened = PaymentLedger::open(storage, LedgerConfig::default()).unwrap();
        assert_eq!(reopened.len(), 3);
    }

    #[test]
    fn test_created_at_truncated_to_millis() {
        let clock = ManualClock::new(start() + Duration::nanoseconds(1_234_567));
        let mut ledger = PaymentLedger::open_with_clock(
            InMemoryStorage::new(),
            LedgerConfig::default(),
            Arc::new(clock),
        )
        .unwrap();

        let payment = ledger.create("Plano", 1.0, None);

        assert_eq!(payment.created_at, start() + Duration::milliseconds(1));
    }

    #[test]
    fn test_rapid_creates_have_unique_ids() {
        let (mut ledger, _clock) = ledger_with_clock();

        let ids: HashSet<String> = (0..500)
            .map(|i| ledger.create(&format!("Plano {}", i), 1.0, None).id)
            .collect();

        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn test_mark_paid_transitions_and_is_idempotent() {
        let (mut ledger, _clock) = ledger_with_clock();
        let payment = ledger.create("Plano Ouro", 99.90, None);

        assert!(ledger.mark_paid(&payment.id));
        assert_eq!(
            ledger.get(&payment.id).unwrap().status,
            PaymentStatus::Paid
        );

        assert!(ledger.mark_paid(&payment.id));
        assert_eq!(
            ledger.get(&payment.id).unwrap().status,
            PaymentStatus::Paid
        );
    }

    #[test]
    fn test_mark_paid_unknown_id_leaves_state_unchanged() {
        let (mut ledger, _clock) = ledger_with_clock();
        ledger.create("Plano Ouro", 99.90, None);
        let before = ledger.list_all();

        assert!(!ledger.mark_paid("does-not-exist"));

        assert_eq!(ledger.list_all(), before);
    }

    #[test]
    fn test_mark_paid_rejects_failed_payment() {
        let storage = InMemoryStorage::new();
        let raw = r#"[{"id":"7","plano":"Plano","valor":5.0,"restaurante":"R","status":"falhou",
            "dataCriacao":"2024-06-01T12:00:00.000Z","dataVencimento":"2024-06-02T12:00:00.000Z",
            "pixCode":"x"}]"#;
        storage
            .set_item(crate::config::DEFAULT_STORAGE_KEY, raw)
            .unwrap();
        let mut ledger = PaymentLedger::open(storage, LedgerConfig::default()).unwrap();

        assert!(!ledger.mark_paid("7"));
        assert_eq!(ledger.get("7").unwrap().status, PaymentStatus::Failed);
    }

    #[test]
    fn test_list_all_is_a_copy() {
        let (mut ledger, _clock) = ledger_with_clock();
        ledger.create("Plano", 10.0, None);

        let mut copy = ledger.list_all();
        copy[0].status = PaymentStatus::Paid;
        copy.clear();

        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.list_all()[0].status, PaymentStatus::Pending);
    }

    #[test]
    fn test_list_by_status_preserves_order() {
        let (mut ledger, clock) = ledger_with_clock();
        let a = ledger.create("A", 1.0, None);
        clock.advance(Duration::seconds(1));
        let b = ledger.create("B", 2.0, None);
        clock.advance(Duration::seconds(1));
        let c = ledger.create("C", 3.0, None);

        ledger.mark_paid(&b.id);

        let pending: Vec<String> = ledger
            .list_by_status(PaymentStatus::Pending)
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(pending, vec![a.id, c.id]);
        assert_eq!(ledger.list_by_status(PaymentStatus::Paid).len(), 1);
        assert!(ledger.list_by_status(PaymentStatus::Failed).is_empty());
    }

    #[test]
    fn test_overdue() {
        let (mut ledger, clock) = ledger_with_clock();
        let late = ledger.create("Late", 1.0, None);
        let paid = ledger.create("Paid", 1.0, None);
        ledger.mark_paid(&paid.id);

        assert!(ledger.overdue().is_empty());

        clock.advance(Duration::hours(25));
        let overdue: Vec<String> = ledger.overdue().into_iter().map(|p| p.id).collect();
        assert_eq!(overdue, vec![late.id]);
    }

    #[test]
    fn test_open_absent_key_is_empty() {
        let ledger = PaymentLedger::open(InMemoryStorage::new(), LedgerConfig::default()).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_open_malformed_fail_fast() {
        let storage = InMemoryStorage::new();
        storage
            .set_item(crate::config::DEFAULT_STORAGE_KEY, "{not json")
            .unwrap();

        let result = PaymentLedger::open(storage.clone(), LedgerConfig::default());

        assert!(matches!(result, Err(Error::DeserializationError(_))));
        assert_eq!(
            storage
                .get_item(crate::config::DEFAULT_STORAGE_KEY)
                .unwrap()
                .as_deref(),
            Some("{not json")
        );
    }

    #[test]
    fn test_open_malformed_start_empty() {
        let storage = InMemoryStorage::new();
        storage
            .set_item(crate::config::DEFAULT_STORAGE_KEY, "[{\"id\": 3}]")
            .unwrap();

        let ledger = PaymentLedger::open(
            storage,
            LedgerConfig::default().with_load_policy(LoadPolicy::StartEmpty),
        )
        .unwrap();

        assert!(ledger.is_empty());
    }

    #[test]
    fn test_open_read_error_propagates() {
        let result = PaymentLedger::open(BrokenStorage, LedgerConfig::default());
        assert!(matches!(result, Err(Error::StorageError(_))));
    }

    #[test]
    fn test_write_failures_are_swallowed() {
        let metrics = CountingMetrics::default();
        let mut ledger = PaymentLedger::open(
            ReadOnlyStorage(InMemoryStorage::new()),
            LedgerConfig::default(),
        )
        .unwrap()
        .with_metrics(Box::new(metrics.clone()));

        let payment = ledger.create("Plano", 10.0, None);
        assert!(ledger.mark_paid(&payment.id));

        assert_eq!(ledger.len(), 1);
        let events = metrics.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                format!("persist_error:{}", crate::config::DEFAULT_STORAGE_KEY),
                format!("created:{}", payment.id),
                format!("persist_error:{}", crate::config::DEFAULT_STORAGE_KEY),
                format!("paid:{}", payment.id),
            ]
        );
    }

    #[test]
    fn test_metrics_record_rejection() {
        let metrics = CountingMetrics::default();
        let mut ledger = PaymentLedger::open(InMemoryStorage::new(), LedgerConfig::default())
            .unwrap()
            .with_metrics(Box::new(metrics.clone()));

        ledger.mark_paid("ghost");

        assert_eq!(
            metrics.events.lock().unwrap().clone(),
            vec!["rejected:ghost".to_string()]
        );
    }

    #[test]
    fn test_duplicate_stored_ids_keep_first() {
        let storage = InMemoryStorage::new();
        let record = |status: &str| {
            format!(
                r#"{{"id":"1","plano":"P","valor":1.0,"restaurante":"R","status":"{}",
                "dataCriacao":"2024-06-01T12:00:00.000Z","dataVencimento":"2024-06-02T12:00:00.000Z",
                "pixCode":"x"}}"#,
                status
            )
        };
        storage
            .set_item(
                crate::config::DEFAULT_STORAGE_KEY,
                &format!("[{},{}]", record("pendente"), record("pago")),
            )
            .unwrap();

        let ledger = PaymentLedger::open(storage, LedgerConfig::default()).unwrap();

        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.get("1").unwrap().status, PaymentStatus::Pending);
    }

    #[test]
    fn test_reload_picks_up_other_writer() {
        let storage = InMemoryStorage::new();
        let clock = ManualClock::new(start());
        let mut first = PaymentLedger::open_with_clock(
            storage.clone(),
            LedgerConfig::default(),
            Arc::new(clock.clone()),
        )
        .unwrap();
        let mut second = PaymentLedger::open_with_clock(
            storage,
            LedgerConfig::default(),
            Arc::new(clock.clone()),
        )
        .unwrap();

        let payment = second.create("Plano", 10.0, None);
        assert!(first.get(&payment.id).is_none());

        first.reload().unwrap();
        assert_eq!(first.get(&payment.id), Some(payment.clone()));

        // same millisecond: the reloaded generator must not reuse the id
        let next = first.create("Outro", 5.0, None);
        assert_ne!(next.id, payment.id);
    }
}
