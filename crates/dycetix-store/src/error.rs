//! Error types for Dycetix storage

use std::fmt;

/// Storage failure
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Row or blob does not exist
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// Uniqueness violated
    #[error("conflict: {0}")]
    Conflict(String),

    /// Blob key escapes the store root or is empty
    #[error("invalid blob key: {0}")]
    InvalidKey(String),

    /// SQLite failure
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Filesystem failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Column or blob could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Anything else the backend reports
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Create a not-found error
    #[inline]
    pub fn not_found(entity: &'static str, key: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Check if this is a not-found error
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a uniqueness conflict
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_entity() {
        let err = StoreError::not_found("requirement", 42);
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "requirement not found: 42");
    }
}
