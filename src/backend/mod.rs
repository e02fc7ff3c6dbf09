//! Cache backends for catalog query results.

use crate::error::Result;
use std::time::Duration;

pub mod inmemory;

pub use inmemory::{CacheStats, InMemoryBackend};

/// Trait for cache backend implementations.
///
/// Stores opaque, already-enveloped bytes under string keys. The catalog
/// service decides keys, TTLs and invalidation; a backend only stores.
///
/// All methods take `&self`. Backends use interior mutability or external
/// storage so one backend can serve concurrent requests.
#[allow(async_fn_in_trait)]
pub trait CacheBackend: Send + Sync + Clone {
    /// Retrieve value by key.
    ///
    /// # Returns
    /// - `Ok(Some(bytes))` - Value found and not expired
    /// - `Ok(None)` - Miss
    ///
    /// # Errors
    /// Returns `Err` if the backend is unreachable
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store value with optional TTL. `None` means no expiry.
    ///
    /// # Errors
    /// Returns `Err` if the backend is unreachable
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()>;

    /// Remove value.
    ///
    /// # Errors
    /// Returns `Err` if the backend is unreachable
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if key exists.
    ///
    /// # Errors
    /// Returns `Err` if the backend is unreachable
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Bulk delete. Default calls `delete()` per key.
    ///
    /// # Errors
    /// Returns `Err` if the backend is unreachable
    async fn mdelete(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.delete(key).await?;
        }
        Ok(())
    }

    /// Health check for readiness probes.
    ///
    /// # Errors
    /// Returns `Err` if the backend is not accessible
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    /// Drop every entry.
    ///
    /// # Errors
    /// Returns `Err` if not supported by this backend
    async fn clear_all(&self) -> Result<()> {
        Err(crate::error::Error::NotImplemented(
            "clear_all not implemented for this backend".to_string(),
        ))
    }
}
