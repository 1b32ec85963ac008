//! Normalized email addresses
//!
//! Emails are the login key for admins and the contact key for requirements.
//! Both paths store them trimmed and lowercased.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static email pattern"));

/// Trimmed, lowercased email address with a `local@domain.tld` shape
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Normalize and check a raw address
    ///
    /// Returns `None` when the trimmed value is empty, and `Some(Err(raw))`
    /// when it is present but malformed.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Result<Self, String>> {
        let normalized = normalize(raw);
        if normalized.is_empty() {
            return None;
        }
        if EMAIL_SHAPE.is_match(&normalized) {
            Some(Ok(Self(normalized)))
        } else {
            Some(Err(raw.trim().to_string()))
        }
    }

    /// Borrow as `&str`
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the inner string
    #[inline]
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Trim and lowercase, without shape checks
#[inline]
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_case_and_whitespace() {
        let email = EmailAddress::parse("  Jane.Doe@Example.COM ").unwrap().unwrap();
        assert_eq!(email.as_str(), "jane.doe@example.com");
    }

    #[test]
    fn parse_blank_is_none() {
        assert!(EmailAddress::parse("   ").is_none());
    }

    #[test]
    fn parse_rejects_malformed() {
        assert_eq!(
            EmailAddress::parse("not-an-email"),
            Some(Err("not-an-email".to_string()))
        );
        assert!(EmailAddress::parse("a@b").unwrap().is_err());
        assert!(EmailAddress::parse("a b@c.com").unwrap().is_err());
    }
}
