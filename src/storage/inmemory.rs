//! In-memory durable storage (default, shared between clones).
//!
//! Uses DashMap so clones of one storage handle see the same keys, which is
//! how two browser tabs on one profile see one local store.

use super::DurableStorage;
use crate::error::Result;
use dashmap::DashMap;
use std::sync::Arc;

/// Shared in-memory key-value store.
///
/// Contents live as long as any clone does; nothing survives the process.
///
/// # Example
///
/// ```
/// use delivery_kit::storage::{DurableStorage, InMemoryStorage};
///
/// let storage = InMemoryStorage::new();
/// storage.set_item("greeting", "olá").unwrap();
///
/// let other_tab = storage.clone();
/// assert_eq!(other_tab.get_item("greeting").unwrap().as_deref(), Some("olá"));
/// ```
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    store: Arc<DashMap<String, String>>,
}

impl InMemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        InMemoryStorage {
            store: Arc::new(DashMap::new()),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Total bytes held in values.
    pub fn total_bytes(&self) -> usize {
        self.store.iter().map(|entry| entry.value().len()).sum()
    }
}

impl DurableStorage for InMemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let value = self.store.get(key).map(|entry| entry.value().clone());
        debug!(
            "✓ InMemory GET {} -> {}",
            key,
            if value.is_some() { "HIT" } else { "MISS" }
        );
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.store.insert(key.to_string(), value.to_string());
        debug!("✓ InMemory SET {} ({} bytes)", key, value.len());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.store.remove(key);
        debug!("✓ InMemory REMOVE {}", key);
        Ok(())
    }

    fn contains_key(&self, key: &str) -> Result<bool> {
        Ok(self.store.contains_key(key))
    }
}
