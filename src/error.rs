//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for every cache backend and the manager layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key absent, or present but already expired
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Stored value is not a base-10 integer
    #[error("Value is not an integer: {0}")]
    NotInteger(String),

    /// Stored bytes could not be decoded into the requested type
    #[error("Decode error: {0}")]
    Decode(String),

    /// Value could not be encoded for storage
    #[error("Encode error: {0}")]
    Encode(String),

    /// No cacher registered under this name
    #[error("Unknown cacher: {0}")]
    UnknownCacher(String),

    /// Backend did not answer a ping
    #[error("Cacher unavailable: {0}")]
    Unavailable(String),

    /// Several backends failed during a fan-out operation
    #[error("{} cacher(s) failed: {}", .0.len(), join_errors(.0))]
    Aggregate(Vec<CacheError>),
}

impl CacheError {
    /// True for misses, including lazily expired entries.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }

    /// Collapses fan-out failures: empty is success, a single error is returned as-is.
    pub(crate) fn aggregate(mut errors: Vec<CacheError>) -> Result<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(CacheError::Aggregate(errors)),
        }
    }
}

fn join_errors(errors: &[CacheError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_empty_is_ok() {
        assert!(CacheError::aggregate(Vec::new()).is_ok());
    }

    #[test]
    fn test_aggregate_single_is_unwrapped() {
        let result = CacheError::aggregate(vec![CacheError::NotFound("k".to_string())]);
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[test]
    fn test_aggregate_message_lists_all() {
        let err = CacheError::aggregate(vec![
            CacheError::Unavailable("redis".to_string()),
            CacheError::Unavailable("memcached".to_string()),
        ])
        .unwrap_err();

        let message = err.to_string();
        assert!(message.starts_with("2 cacher(s) failed"));
        assert!(message.contains("redis"));
        assert!(message.contains("memcached"));
    }

    #[test]
    fn test_is_not_found() {
        assert!(CacheError::NotFound("a".to_string()).is_not_found());
        assert!(!CacheError::NotInteger("a".to_string()).is_not_found());
    }
}
