//! Error types for the delivery kit.

use std::fmt;

/// Result type for delivery-kit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the ledger and the catalog data-access layer.
///
/// Ledger mutations never return these: "not found" is a `false` from
/// `PaymentLedger::mark_paid` and storage write failures are swallowed.
/// Errors surface from construction, reload, configuration and the
/// catalog layer.
#[derive(Debug, Clone)]
pub enum Error {
    /// Serialization failed when converting a value to JSON or cache bytes.
    SerializationError(String),

    /// Deserialization failed when reading stored or cached bytes.
    ///
    /// Common causes:
    /// - Durable storage holds something other than a JSON array of payments
    /// - Cache entry was corrupted or truncated
    /// - Backend row does not match the entity shape
    DeserializationError(String),

    /// Validation failed for a query, a row or an entity.
    ValidationError(String),

    /// Durable storage (local key-value store) failed to read or write.
    ///
    /// **Recovery:** Reads fail construction; writes are logged and dropped.
    StorageError(String),

    /// Cache backend error.
    BackendError(String),

    /// Query backend error (the hosted database client).
    ///
    /// Common causes:
    /// - Backend unreachable
    /// - Unknown table or column
    /// - A single-row fetch matched more than one row
    RepositoryError(String),

    /// Configuration error, usually from environment variables.
    ConfigError(String),

    /// Feature not implemented by this backend or client.
    NotImplemented(String),

    /// Invalid cache entry: corrupted envelope or bad magic.
    ///
    /// **Recovery:** Evict the cache entry and recompute.
    InvalidCacheEntry(String),

    /// Schema version mismatch between code and cached data.
    VersionMismatch {
        /// Expected schema version (from compiled code)
        expected: u32,
        /// Found schema version (from cached entry)
        found: u32,
    },

    /// Generic error with custom message.
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            Error::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Error::StorageError(msg) => write!(f, "Storage error: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::RepositoryError(msg) => write!(f, "Repository error: {}", msg),
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
            Error::NotImplemented(msg) => write!(f, "Not implemented: {}", msg),
            Error::InvalidCacheEntry(msg) => {
                write!(f, "Invalid cache entry: {}", msg)
            }
            Error::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Cache version mismatch: expected {}, found {}",
                    expected, found
                )
            }
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::StorageError(e.to_string())
        } else if e.is_syntax() || e.is_data() || e.is_eof() {
            Error::DeserializationError(e.to_string())
        } else {
            Error::SerializationError(e.to_string())
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::StorageError(e.to_string())
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::StorageError("disk full".to_string());
        assert_eq!(err.to_string(), "Storage error: disk full");
    }

    #[test]
    fn test_error_from_string() {
        let err: Error = "test error".into();
        assert!(matches!(err, Error::Other(_)));
    }

    #[test]
    fn test_error_from_json_syntax() {
        let parse: std::result::Result<Vec<u32>, _> = serde_json::from_str("[1, 2");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::DeserializationError(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(matches!(err, Error::StorageError(_)));
    }
}
