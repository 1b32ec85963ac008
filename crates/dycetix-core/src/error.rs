//! Error types for the domain model
//!
//! Provides error handling for:
//! - Intake form validation (missing or invalid fields)
//! - Triage patch parsing
//! - Admin identity construction

/// Validation failure for a single field of an inbound payload
///
/// Every variant names the offending field via [`ValidationError::field`],
/// so callers can report it without parsing the message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Required field absent or blank after trimming
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    /// No service selected at all
    #[error("Missing required field: services (select at least one service)")]
    NoServiceSelected,

    /// `other` selected without describing it
    #[error("Missing required field: other_service (required when \"other\" is selected)")]
    OtherServiceRequired,

    /// Service code outside the catalogue
    #[error("Invalid value for services: unknown service code '{code}'")]
    UnknownService { code: String },

    /// Email without a `local@domain.tld` shape
    #[error("Invalid value for email: '{value}' is not an email address")]
    InvalidEmail { value: String },

    /// Value outside an enumerated choice set
    #[error("Invalid value for {field}: '{value}'")]
    InvalidChoice { field: &'static str, value: String },

    /// Payload is not shaped as expected (e.g. not a JSON object)
    #[error("Malformed payload: {reason}")]
    Malformed { reason: String },
}

impl ValidationError {
    /// Name of the field this error refers to
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingField { field } | Self::InvalidChoice { field, .. } => field,
            Self::NoServiceSelected | Self::UnknownService { .. } => "services",
            Self::OtherServiceRequired => "other_service",
            Self::InvalidEmail { .. } => "email",
            Self::Malformed { .. } => "body",
        }
    }

    /// Create a missing-field error
    #[inline]
    #[must_use]
    pub fn missing(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    /// Create an invalid-choice error
    #[inline]
    pub fn invalid_choice(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidChoice {
            field,
            value: value.into(),
        }
    }
}

/// Errors raised while constructing admin identities
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// Email blank
    #[error("the email must be set")]
    EmptyEmail,

    /// Email present but malformed
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    /// Privileged account requested with a flag explicitly disabled
    #[error("superuser must have {flag}=true")]
    PrivilegeFlagDisabled { flag: &'static str },

    /// The super_admin role is reserved for privileged accounts
    #[error("role super_admin requires a superuser account")]
    SuperAdminRoleRequiresSuperuser,

    /// Role code outside the catalogue
    #[error("unknown admin role: {0}")]
    UnknownRole(String),
}
