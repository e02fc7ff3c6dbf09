//! In-memory query client for tests, demos and offline development.

use super::QueryClient;
use crate::error::{Error, Result};
use crate::query::Query;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Tables of JSON rows held in a `DashMap`.
///
/// Clones share the same tables, so a test can keep a handle for seeding and
/// inspection while the catalog service owns another.
///
/// # Example
///
/// ```
/// use delivery_kit::client::{InMemoryClient, QueryClient};
/// use delivery_kit::query::Query;
/// use serde_json::json;
///
/// # block_on(async {
/// let client = InMemoryClient::new();
/// client.seed("restaurants", vec![json!({ "id": "r1", "name": "Cantina" })]);
///
/// let rows = client.select(&Query::from("restaurants").eq("id", "r1")).await.unwrap();
/// assert_eq!(rows.len(), 1);
/// # });
/// # fn block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone, Default)]
pub struct InMemoryClient {
    tables: Arc<DashMap<String, Vec<Value>>>,
    unavailable: Arc<AtomicBool>,
    selects: Arc<AtomicUsize>,
}

impl InMemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append rows to `table`, creating it if needed.
    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        self.tables
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    /// Snapshot of every row in `table`.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .get(table)
            .map(|rows| rows.clone())
            .unwrap_or_default()
    }

    /// Simulate an outage. While set, every call fails with a repository error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `select` calls served so far.
    pub fn select_calls(&self) -> usize {
        self.selects.load(Ordering::SeqCst)
    }

    fn ensure_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::RepositoryError("Backend unavailable".to_string()));
        }
        Ok(())
    }
}

fn into_object(value: Value, what: &str) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::ValidationError(format!(
            "{} must be a JSON object, got {}",
            what, other
        ))),
    }
}

impl QueryClient for InMemoryClient {
    async fn select(&self, query: &Query) -> Result<Vec<Value>> {
        self.ensure_available()?;
        self.selects.fetch_add(1, Ordering::SeqCst);

        let matched: Vec<Value> = match self.tables.get(query.table()) {
            Some(rows) => rows.iter().filter(|row| query.matches(row)).cloned().collect(),
            None => Vec::new(),
        };

        debug!(
            "select {} matched {} rows",
            query.fingerprint(),
            matched.len()
        );
        Ok(query.shape(matched))
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value> {
        self.ensure_available()?;
        let mut row = into_object(row, "Inserted row")?;

        let missing_id = row.get("id").map_or(true, Value::is_null);
        if missing_id {
            row.insert(
                "id".to_string(),
                Value::String(uuid::Uuid::now_v7().to_string()),
            );
        }
        let row = Value::Object(row);

        let mut rows = self.tables.entry(table.to_string()).or_default();
        if rows.iter().any(|existing| existing.get("id") == row.get("id")) {
            return Err(Error::RepositoryError(format!(
                "Duplicate key in {}: {}",
                table, row["id"]
            )));
        }
        rows.push(row.clone());

        debug!("insert into {} ({} rows)", table, rows.len());
        Ok(row)
    }

    async fn update(&self, query: &Query, patch: Value) -> Result<Vec<Value>> {
        self.ensure_available()?;
        if query.filters().is_empty() {
            return Err(Error::ValidationError(format!(
                "Refusing unfiltered update of {}",
                query.table()
            )));
        }
        let patch = into_object(patch, "Update patch")?;

        let mut updated = Vec::new();
        if let Some(mut rows) = self.tables.get_mut(query.table()) {
            for row in rows.iter_mut().filter(|row| query.matches(row)) {
                if let Value::Object(fields) = row {
                    for (column, value) in &patch {
                        fields.insert(column.clone(), value.clone());
                    }
                }
                updated.push(row.clone());
            }
        }

        debug!("update {} touched {} rows", query.fingerprint(), updated.len());
        Ok(updated)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.unavailable.load(Ordering::SeqCst))
    }
}
