//! Error types for Dycetix services
//!
//! [`ServiceError`] is what a request fails with. [`AttachmentError`] never
//! fails a request: intake records it per file and carries on.

use dycetix_core::{IdentityError, ValidationError};
use dycetix_store::StoreError;

/// Request-level failure
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Missing or invalid field
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Unknown (or invisible) entity
    #[error("{0}")]
    NotFound(String),

    /// No valid session
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed
    #[error("{0}")]
    Forbidden(String),

    /// Body is not the JSON we expect
    #[error("Invalid JSON data")]
    MalformedPayload(String),

    /// Admin identity could not be built
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Uniqueness violated (e.g. admin email taken)
    #[error("{0}")]
    Conflict(String),

    /// Unexpected storage failure
    #[error("persistence failure: {0}")]
    Persistence(#[source] StoreError),
}

impl ServiceError {
    /// Requirement missing or hidden from the caller
    pub(crate) fn requirement_not_found() -> Self {
        Self::NotFound("Client requirement not found".to_string())
    }

    /// Missing, unknown or expired session
    pub(crate) fn authentication_required() -> Self {
        Self::Unauthorized("Authentication required".to_string())
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, key } => Self::NotFound(format!("{entity} not found: {key}")),
            StoreError::Conflict(message) => Self::Conflict(message),
            other => Self::Persistence(other),
        }
    }
}

/// Why one uploaded file was skipped
#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    /// File entry is not an object with the expected keys
    #[error("malformed file entry: {0}")]
    Malformed(String),

    /// No usable file name
    #[error("file name is empty")]
    EmptyName,

    /// Content is not valid base64
    #[error("invalid base64 content: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// Decoded content exceeds the per-file limit
    #[error("file is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },

    /// Beyond the per-submission file count
    #[error("at most {limit} files are accepted per submission")]
    TooManyFiles { limit: usize },

    /// Blob or row could not be written
    #[error("storage failed: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_service_errors() {
        let err: ServiceError = StoreError::not_found("admin", 4).into();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err: ServiceError = StoreError::Conflict("taken".to_string()).into();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let err: ServiceError = StoreError::Backend("disk full".to_string()).into();
        assert!(matches!(err, ServiceError::Persistence(_)));
    }

    #[test]
    fn malformed_payload_hides_detail() {
        let err = ServiceError::MalformedPayload("expected value at line 1".to_string());
        assert_eq!(err.to_string(), "Invalid JSON data");
    }
}
