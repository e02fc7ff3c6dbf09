//! Versioned postcard envelopes for cached query results.
//!
//! Every cache entry has this layout:
//! ```text
//! ┌─────────────────┬─────────────────┬──────────────────────────┐
//! │  MAGIC (4 bytes)│VERSION (4 bytes)│POSTCARD PAYLOAD (N bytes)│
//! └─────────────────┴─────────────────┴──────────────────────────┘
//!   "DKIT"              u32 (varint)       postcard::to_allocvec(T)
//! ```
//!
//! A wrong magic or version is rejected rather than decoded, so changing a
//! catalog struct only costs a cache miss after deploy.
//!
//! Durable payment storage does not use this format; it is plain JSON.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Magic header for cache entries.
pub const CACHE_MAGIC: [u8; 4] = *b"DKIT";

/// Current schema version.
///
/// Bump when a cached catalog type changes shape (fields added, removed,
/// reordered or retyped).
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Versioned envelope wrapping a cached payload.
///
/// ```rust
/// use delivery_kit::serialization::CacheEnvelope;
///
/// let envelope = CacheEnvelope::new("rows");
/// assert_eq!(envelope.magic, *b"DKIT");
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CacheEnvelope<T> {
    pub magic: [u8; 4],
    pub version: u32,
    pub payload: T,
}

impl<T> CacheEnvelope<T> {
    pub fn new(payload: T) -> Self {
        Self {
            magic: CACHE_MAGIC,
            version: CURRENT_SCHEMA_VERSION,
            payload,
        }
    }
}

/// Serialize a value inside an envelope.
///
/// # Errors
///
/// Returns `Error::SerializationError` if postcard rejects the value.
pub fn serialize_for_cache<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    postcard::to_allocvec(&CacheEnvelope::new(value)).map_err(|e| {
        error!("Cache serialization failed: {}", e);
        Error::SerializationError(e.to_string())
    })
}

/// Deserialize a value, checking magic then version.
///
/// # Errors
///
/// - `Error::DeserializationError`: truncated or corrupted bytes
/// - `Error::InvalidCacheEntry`: magic is not `b"DKIT"`
/// - `Error::VersionMismatch`: written by another schema version
pub fn deserialize_from_cache<'de, T: Deserialize<'de>>(bytes: &'de [u8]) -> Result<T> {
    let envelope: CacheEnvelope<T> = postcard::from_bytes(bytes).map_err(|e| {
        debug!("Cache deserialization failed: {}", e);
        Error::DeserializationError(e.to_string())
    })?;

    if envelope.magic != CACHE_MAGIC {
        warn!(
            "Invalid cache entry: expected magic {:?}, got {:?}",
            CACHE_MAGIC, envelope.magic
        );
        return Err(Error::InvalidCacheEntry(format!(
            "Invalid magic: expected {:?}, got {:?}",
            CACHE_MAGIC, envelope.magic
        )));
    }

    if envelope.version != CURRENT_SCHEMA_VERSION {
        warn!(
            "Cache version mismatch: expected {}, got {}",
            CURRENT_SCHEMA_VERSION, envelope.version
        );
        return Err(Error::VersionMismatch {
            expected: CURRENT_SCHEMA_VERSION,
            found: envelope.version,
        });
    }

    Ok(envelope.payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
    struct Row {
        id: String,
        name: String,
        price: f64,
        tags: Vec<String>,
        note: Option<String>,
    }

    fn row() -> Row {
        Row {
            id: "p1".to_string(),
            name: "Coxinha".to_string(),
            price: 7.5,
            tags: vec!["salgado".to_string()],
            note: None,
        }
    }

    #[test]
    fn test_roundtrip_rows() {
        let rows = vec![row(), row()];
        let bytes = serialize_for_cache(&rows).unwrap();
        let back: Vec<Row> = deserialize_from_cache(&bytes).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn test_invalid_magic_rejected() {
        let envelope = CacheEnvelope {
            magic: *b"XXXX",
            version: CURRENT_SCHEMA_VERSION,
            payload: row(),
        };
        let bytes = postcard::to_allocvec(&envelope).unwrap();

        match deserialize_from_cache::<Row>(&bytes) {
            Err(Error::InvalidCacheEntry(_)) => {}
            other => panic!("Expected InvalidCacheEntry, got {:?}", other),
        }
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut envelope = CacheEnvelope::new(row());
        envelope.version = 999;
        let bytes = postcard::to_allocvec(&envelope).unwrap();

        match deserialize_from_cache::<Row>(&bytes) {
            Err(Error::VersionMismatch { expected, found }) => {
                assert_eq!(expected, CURRENT_SCHEMA_VERSION);
                assert_eq!(found, 999);
            }
            other => panic!("Expected VersionMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let mut bytes = serialize_for_cache(&row()).unwrap();
        bytes.truncate(bytes.len() / 2);

        assert!(matches!(
            deserialize_from_cache::<Row>(&bytes),
            Err(Error::DeserializationError(_))
        ));
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(
            serialize_for_cache(&row()).unwrap(),
            serialize_for_cache(&row()).unwrap()
        );
    }
}
