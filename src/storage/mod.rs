//! Durable key-value storage for the payment ledger.

use crate::error::Result;

pub mod file;
pub mod inmemory;

pub use file::FileStorage;
pub use inmemory::InMemoryStorage;

/// Trait for durable storage implementations.
///
/// Models browser-local storage: string keys, string values, synchronous
/// access. The ledger stores its whole payment list under one key.
///
/// All methods take `&self`. Implementations use interior mutability or
/// external storage, so two handles on the same underlying store observe
/// each other's writes (last writer wins).
pub trait DurableStorage {
    /// Read the value stored under `key`.
    ///
    /// # Returns
    /// - `Ok(Some(value))` - Key present
    /// - `Ok(None)` - Key absent
    ///
    /// # Errors
    /// Returns `Err` if the store cannot be read
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns `Err` if the store cannot be written
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    /// Returns `Err` if the store cannot be written
    fn remove_item(&self, key: &str) -> Result<()>;

    /// Check whether `key` is present.
    ///
    /// # Errors
    /// Returns `Err` if the store cannot be read
    fn contains_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_item(key)?.is_some())
    }
}

impl<S: DurableStorage + ?Sized> DurableStorage for &S {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        (**self).remove_item(key)
    }
}
