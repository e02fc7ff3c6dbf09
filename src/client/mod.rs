//! Clients for the hosted relational backend.
//!
//! The `QueryClient` trait decouples the catalog service from a specific
//! backend. A production implementation would talk to the hosted Postgres
//! service over its REST interface; `InMemoryClient` is provided for tests,
//! demos and offline development.
//!
//! # Error Handling
//!
//! Implementations return `Error::RepositoryError` for backend failures
//! (connectivity, unknown table, constraint violations) and
//! `Error::ValidationError` for requests the client refuses to send.

use crate::error::Result;
use crate::query::Query;
use serde_json::Value;

pub mod inmemory;

pub use inmemory::InMemoryClient;

/// Trait for query backend implementations.
#[allow(async_fn_in_trait)]
pub trait QueryClient: Send + Sync {
    /// Rows matching the query's filters, ordered, limited and projected.
    ///
    /// # Errors
    /// Returns `Err` if the backend is unavailable or rejects the query
    async fn select(&self, query: &Query) -> Result<Vec<Value>>;

    /// Insert one row into `table` and return it as stored.
    ///
    /// # Errors
    /// Returns `Err` on backend failure or constraint violation
    async fn insert(&self, table: &str, row: Value) -> Result<Value>;

    /// Merge `patch` into every row matching the query's filters and return
    /// the updated rows.
    ///
    /// # Errors
    /// Returns `Err` on backend failure, or if the query has no filters
    async fn update(&self, query: &Query, patch: Value) -> Result<Vec<Value>>;

    /// Health check for readiness probes.
    ///
    /// # Errors
    /// Returns `Err` if the backend is not accessible
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
