//! Bearer-session authentication

use crate::error::ApiError;
use crate::state::AppState;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use dycetix_core::{Actor, AdminUser};
use dycetix_service::ServiceError;

/// The admin behind a valid `Authorization: Bearer <session key>` header
#[derive(Debug, Clone)]
pub struct Authenticated(pub AdminUser);

impl Authenticated {
    /// Acting identity for triage calls
    #[inline]
    #[must_use]
    pub fn actor(&self) -> Actor {
        self.0.actor()
    }
}

/// Session key from an `Authorization` header value
pub(crate) fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| ServiceError::Unauthorized("Authentication required".to_string()))?;
        let admin = state.directory.authenticate(token).await?;
        Ok(Self(admin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bearer_header() {
        assert_eq!(bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(bearer_token("bearer   abc123 "), Some("abc123"));
        assert_eq!(bearer_token("Basic abc123"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc123"), None);
    }
}
