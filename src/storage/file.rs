//! Directory-backed durable storage.
//!
//! One file per key. Keys are percent-encoded into file names so any key is
//! safe on disk. Writes land in a temporary sibling first and are renamed into
//! place, so a reader never sees a half-written value.

use super::DurableStorage;
use crate::error::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const VALUE_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";

/// Durable storage rooted at a directory.
///
/// Survives process restarts. Two `FileStorage` values opened on the same
/// directory share contents with last-writer-wins semantics.
#[derive(Clone, Debug)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open (and create if needed) a storage directory.
    ///
    /// # Errors
    /// Returns `Error::StorageError` if the directory cannot be created or
    /// the path exists but is not a directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            Error::StorageError(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        if !root.is_dir() {
            return Err(Error::StorageError(format!(
                "Storage root {} is not a directory",
                root.display()
            )));
        }

        debug!("✓ FileStorage opened at {}", root.display());
        Ok(FileStorage { root })
    }

    /// Root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", encode_key(key), VALUE_EXTENSION))
    }
}

impl DurableStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(value) => {
                debug!("✓ File GET {} -> HIT", key);
                Ok(Some(value))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("✓ File GET {} -> MISS", key);
                Ok(None)
            }
            Err(e) => Err(Error::StorageError(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let temp = path.with_extension(TEMP_EXTENSION);

        fs::write(&temp, value).map_err(|e| {
            Error::StorageError(format!("Failed to write {}: {}", temp.display(), e))
        })?;
        fs::rename(&temp, &path).map_err(|e| {
            Error::StorageError(format!(
                "Failed to move {} into place: {}",
                path.display(),
                e
            ))
        })?;

        debug!("✓ File SET {} ({} bytes)", key, value.len());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("✓ File REMOVE {}", key);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::StorageError(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn contains_key(&self, key: &str) -> Result<bool> {
        Ok(self.path_for(key).is_file())
    }
}

/// Percent-encode everything outside `[A-Za-z0-9._-]`.
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'_' | b'-' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    // "." and ".." would name directories
    if encoded.chars().all(|c| c == '.') {
        encoded = encoded.replace('.', "%2E");
    }
    encoded
}
