//! HTTP error mapping
//!
//! Every failure leaves as `{"success": false, "error": "..."}`. Storage
//! failures are logged in full and answered with a generic message.

use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dycetix_service::ServiceError;
use serde_json::json;

/// Body sent for unexpected server-side failures
pub const GENERIC_ERROR: &str = "An unexpected error occurred";

/// Handler error
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Request could not be interpreted (bad query string, bad path)
    #[error("{0}")]
    BadRequest(String),

    /// Body could not be read (over the size limit, aborted upload)
    #[error("{message}")]
    Body { status: StatusCode, message: String },
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        Self::Body {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl ApiError {
    /// Status code this error is answered with
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Body { status, .. } => *status,
            Self::Service(err) => match err {
                ServiceError::Validation(_)
                | ServiceError::MalformedPayload(_)
                | ServiceError::Identity(_) => StatusCode::BAD_REQUEST,
                ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::Conflict(_) => StatusCode::CONFLICT,
                ServiceError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Service(ServiceError::Persistence(source)) => {
                tracing::error!("Request failed in storage: {}", source);
                json!({ "success": false, "error": GENERIC_ERROR })
            }
            Self::Service(ServiceError::Validation(err)) => {
                json!({ "success": false, "error": err.to_string(), "field": err.field() })
            }
            Self::Service(ServiceError::MalformedPayload(detail)) => {
                tracing::debug!("Rejected malformed JSON: {}", detail);
                json!({ "success": false, "error": self.to_string() })
            }
            _ => json!({ "success": false, "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dycetix_core::ValidationError;
    use dycetix_store::StoreError;

    #[test]
    fn statuses_follow_the_taxonomy() {
        let cases = [
            (ServiceError::from(ValidationError::missing("email")), StatusCode::BAD_REQUEST),
            (ServiceError::MalformedPayload("eof".into()), StatusCode::BAD_REQUEST),
            (ServiceError::Unauthorized("no".into()), StatusCode::UNAUTHORIZED),
            (ServiceError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (ServiceError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (ServiceError::Conflict("taken".into()), StatusCode::CONFLICT),
            (
                ServiceError::Persistence(StoreError::Backend("boom".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn body_errors_keep_their_status() {
        let err = ApiError::Body {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: "length limit exceeded".into(),
        };
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.to_string(), "length limit exceeded");
    }
}
