//! # delivery-kit
//!
//! Payments and catalog data access for a food-delivery marketplace.
//!
//! ## Features
//!
//! - **Payment ledger:** simulated PIX payments (pending, paid, failed) with
//!   synthetic copy-and-paste codes, mirrored to durable key-value storage
//! - **Storage agnostic:** in-memory and file-backed storage, or any
//!   [`DurableStorage`] implementation
//! - **Cached catalog:** restaurants, products and orders read through a query
//!   cache keyed by query parameters and invalidated after every mutation
//! - **Backend agnostic:** plug any [`QueryClient`] and [`CacheBackend`]
//! - **Production ready:** logging through `log`, metrics hooks, one error type
//!
//! ## Quick Start
//!
//! ### Payments
//!
//! ```
//! use delivery_kit::{LedgerConfig, PaymentLedger, PaymentStatus};
//! use delivery_kit::storage::InMemoryStorage;
//!
//! # fn main() -> delivery_kit::Result<()> {
//! let storage = InMemoryStorage::new();
//! let mut ledger = PaymentLedger::open(storage.clone(), LedgerConfig::default())?;
//!
//! let payment = ledger.create("Plano Ouro", 99.90, Some("Cantina da Nonna"));
//! assert!(payment.pix_code.starts_with("000201"));
//! assert!(ledger.mark_paid(&payment.id));
//!
//! // A new session sees the same ledger.
//! let reopened = PaymentLedger::open(storage, LedgerConfig::default())?;
//! assert_eq!(reopened.list_by_status(PaymentStatus::Paid).len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ### Catalog
//!
//! ```
//! use delivery_kit::backend::InMemoryBackend;
//! use delivery_kit::client::InMemoryClient;
//! use delivery_kit::{CatalogService, FetchStrategy};
//! use serde_json::json;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let client = InMemoryClient::new();
//! client.seed("restaurants", vec![json!({ "id": "r1", "name": "Cantina" })]);
//! client.seed("products", vec![
//!     json!({ "id": "p1", "restaurant_id": "r1", "name": "Lasanha", "price": 42.0 }),
//! ]);
//!
//! let catalog = CatalogService::new(client, InMemoryBackend::new());
//! let menu = catalog.restaurant_menu("r1", FetchStrategy::Refresh).await.unwrap();
//! assert_eq!(menu.map(|m| m.products.len()), Some(1));
//! # });
//! ```

#[macro_use]
extern crate log;

pub mod backend;
pub mod catalog;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod key;
pub mod ledger;
pub mod observability;
pub mod payment;
pub mod pix;
pub mod query;
pub mod serialization;
pub mod service;
pub mod storage;
pub mod strategy;

// Re-exports for convenience
pub use backend::CacheBackend;
pub use catalog::CatalogEntity;
pub use client::QueryClient;
pub use config::{LedgerConfig, LoadPolicy};
pub use error::{Error, Result};
pub use ledger::PaymentLedger;
pub use payment::{PaymentRecord, PaymentStatus};
pub use query::Query;
pub use service::CatalogService;
pub use storage::DurableStorage;
pub use strategy::FetchStrategy;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
