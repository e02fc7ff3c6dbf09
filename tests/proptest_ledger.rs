//! Property-based tests for the payment ledger.
//!
//! Random sequences of creations and payments are applied to a ledger whose
//! clock rarely moves, so many payments share a millisecond.
//!
//! # Properties Tested
//!
//! 1. **Partition**: pending ∪ paid ∪ failed == list_all, no duplicates
//! 2. **Unique ids**: every created payment has its own id
//! 3. **Reload**: a fresh ledger on the same storage sees an identical list
//! 4. **Unknown ids**: marking an unknown id changes nothing
//! 5. **Idempotence**: paying twice equals paying once

use chrono::{Duration, TimeZone, Utc};
use delivery_kit::clock::ManualClock;
use delivery_kit::storage::InMemoryStorage;
use delivery_kit::{LedgerConfig, PaymentLedger, PaymentRecord, PaymentStatus};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

// ============================================================================
// Operations
// ============================================================================

#[derive(Clone, Debug)]
enum Op {
    Create { plan: String, cents: u32, restaurant: Option<String> },
    PayNth(usize),
    PayUnknown(String),
    Tick(i64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => ("[A-Za-z ]{1,20}", 0u32..1_000_000, proptest::option::of("[A-Za-zÀ-ú ]{0,30}"))
            .prop_map(|(plan, cents, restaurant)| Op::Create { plan, cents, restaurant }),
        3 => (0usize..64).prop_map(Op::PayNth),
        1 => "x[0-9]{1,5}".prop_map(Op::PayUnknown),
        1 => (0i64..3).prop_map(Op::Tick),
    ]
}

struct Harness {
    storage: InMemoryStorage,
    clock: ManualClock,
    ledger: PaymentLedger<InMemoryStorage>,
}

fn harness() -> Harness {
    let storage = InMemoryStorage::new();
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 7, 1, 8, 0, 0).unwrap());
    let ledger = PaymentLedger::open_with_clock(
        storage.clone(),
        LedgerConfig::default(),
        Arc::new(clock.clone()),
    )
    .expect("open");
    Harness {
        storage,
        clock,
        ledger,
    }
}

fn apply(h: &mut Harness, op: &Op) {
    match op {
        Op::Create {
            plan,
            cents,
            restaurant,
        } => {
            h.ledger
                .create(plan, f64::from(*cents) / 100.0, restaurant.as_deref());
        }
        Op::PayNth(n) => {
            let all = h.ledger.list_all();
            if !all.is_empty() {
                let id = all[n % all.len()].id.clone();
                assert!(h.ledger.mark_paid(&id));
            }
        }
        Op::PayUnknown(id) => {
            let before = h.ledger.list_all();
            assert!(!h.ledger.mark_paid(id));
            assert_eq!(h.ledger.list_all(), before);
        }
        Op::Tick(ms) => h.clock.advance(Duration::milliseconds(*ms)),
    }
}

fn ids(records: &[PaymentRecord]) -> Vec<String> {
    records.iter().map(|p| p.id.clone()).collect()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_status_lists_partition_ledger(ops in prop::collection::vec(op_strategy(), 0..80)) {
        let mut h = harness();
        for op in &ops {
            apply(&mut h, op);
        }

        let all = h.ledger.list_all();
        let mut union: Vec<String> = PaymentStatus::ALL
            .iter()
            .flat_map(|status| ids(&h.ledger.list_by_status(*status)))
            .collect();
        union.sort();
        let mut expected = ids(&all);
        expected.sort();

        prop_assert_eq!(union, expected);
        prop_assert!(h.ledger.list_by_status(PaymentStatus::Failed).is_empty());
    }

    #[test]
    fn prop_ids_are_unique(ops in prop::collection::vec(op_strategy(), 0..80)) {
        let mut h = harness();
        for op in &ops {
            apply(&mut h, op);
        }

        let all = h.ledger.list_all();
        let distinct: HashSet<&str> = all.iter().map(|p| p.id.as_str()).collect();
        prop_assert_eq!(distinct.len(), all.len());
    }

    #[test]
    fn prop_reload_reproduces_ledger(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let mut h = harness();
        for op in &ops {
            apply(&mut h, op);
        }

        let reopened = PaymentLedger::open(h.storage.clone(), LedgerConfig::default())
            .expect("reopen");
        prop_assert_eq!(reopened.list_all(), h.ledger.list_all());
    }

    #[test]
    fn prop_mark_paid_is_idempotent(count in 1usize..20, pick in 0usize..20) {
        let mut h = harness();
        for i in 0..count {
            h.ledger.create(&format!("Plano {}", i), 10.0, None);
        }
        let id = h.ledger.list_all()[pick % count].id.clone();

        prop_assert!(h.ledger.mark_paid(&id));
        let once = h.ledger.list_all();
        prop_assert!(h.ledger.mark_paid(&id));
        prop_assert_eq!(h.ledger.list_all(), once);
        prop_assert_eq!(h.ledger.list_by_status(PaymentStatus::Paid).len(), 1);
    }

    #[test]
    fn prop_due_is_creation_plus_window(cents in 0u32..10_000_000, tick in 0i64..100_000) {
        let mut h = harness();
        h.clock.advance(Duration::milliseconds(tick));

        let payment = h.ledger.create("Plano", f64::from(cents) / 100.0, None);
        prop_assert_eq!(payment.due_at - payment.created_at, Duration::hours(24));
        prop_assert_eq!(payment.status, PaymentStatus::Pending);
    }
}
