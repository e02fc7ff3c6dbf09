//! Cache keys for catalog queries.

use crate::query::Query;
use dashmap::DashMap;
use std::collections::HashSet;

/// Builder for cache keys.
pub struct CacheKeyBuilder;

impl CacheKeyBuilder {
    /// `"{table}:{fingerprint}"`. Equal queries give equal keys.
    pub fn build(query: &Query) -> String {
        format!("{}:{}", query.table(), query.fingerprint())
    }

    /// Table namespace of a key built by [`build`](Self::build).
    pub fn table_of(key: &str) -> &str {
        key.split_once(':').map_or(key, |(table, _)| table)
    }
}

/// Keys currently cached per table, so a mutation can drop exactly its
/// table's entries on any backend.
#[derive(Default)]
pub struct KeyRegistry {
    keys: DashMap<String, HashSet<String>>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember that `key` holds a result, under the key's table.
    pub fn register(&self, key: &str) {
        self.keys
            .entry(CacheKeyBuilder::table_of(key).to_string())
            .or_default()
            .insert(key.to_string());
    }

    /// Forget `key`.
    pub fn forget(&self, key: &str) {
        if let Some(mut keys) = self.keys.get_mut(CacheKeyBuilder::table_of(key)) {
            keys.remove(key);
        }
    }

    /// Remove and return every key for `table`.
    pub fn take(&self, table: &str) -> Vec<String> {
        self.keys
            .remove(table)
            .map(|(_, keys)| keys.into_iter().collect())
            .unwrap_or_default()
    }

    /// Number of keys tracked for `table`.
    pub fn tracked(&self, table: &str) -> usize {
        self.keys.get(table).map_or(0, |keys| keys.len())
    }
}
