//! Core identifiers and enumerations
//!
//! Defines:
//! - Surrogate ids for requirements, attachments and admin users
//! - The service catalogue
//! - Triage status and priority choices

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Surrogate id of a client requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequirementId(pub i64);

impl RequirementId {
    /// Raw integer value
    #[inline]
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RequirementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Surrogate id of a form attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentId(pub i64);

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Surrogate id of an admin user
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdminUserId(pub i64);

impl AdminUserId {
    /// Raw integer value
    #[inline]
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for AdminUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Services a prospective client can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    /// Software development
    Software,
    /// Design
    Design,
    /// IT support (`it` is accepted as an alias)
    #[serde(alias = "it")]
    ItSupport,
    /// Photography
    Photography,
    /// Videography
    Videography,
    /// Anything else, described in `other_service`
    Other,
}

impl ServiceType {
    /// Whole catalogue, in display order
    pub const ALL: [ServiceType; 6] = [
        ServiceType::Software,
        ServiceType::Design,
        ServiceType::ItSupport,
        ServiceType::Photography,
        ServiceType::Videography,
        ServiceType::Other,
    ];

    /// Wire code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            ServiceType::Software => "software",
            ServiceType::Design => "design",
            ServiceType::ItSupport => "it_support",
            ServiceType::Photography => "photography",
            ServiceType::Videography => "videography",
            ServiceType::Other => "other",
        }
    }

    /// Human-readable label
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            ServiceType::Software => "Software Development",
            ServiceType::Design => "Design",
            ServiceType::ItSupport => "IT Support",
            ServiceType::Photography => "Photography",
            ServiceType::Videography => "Videography",
            ServiceType::Other => "Other",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ServiceType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "software" => Ok(ServiceType::Software),
            "design" => Ok(ServiceType::Design),
            "it" | "it_support" => Ok(ServiceType::ItSupport),
            "photography" => Ok(ServiceType::Photography),
            "videography" => Ok(ServiceType::Videography),
            "other" => Ok(ServiceType::Other),
            _ => Err(ValidationError::UnknownService {
                code: s.to_string(),
            }),
        }
    }
}

/// Triage lifecycle of a requirement
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RequirementStatus {
    /// Freshly submitted
    #[default]
    New,
    /// Staff reached out
    Contacted,
    /// Quote sent
    Quoted,
    /// Became a customer
    Converted,
    /// Soft-deleted
    Archived,
}

impl RequirementStatus {
    /// Every status, in lifecycle order
    pub const ALL: [RequirementStatus; 5] = [
        RequirementStatus::New,
        RequirementStatus::Contacted,
        RequirementStatus::Quoted,
        RequirementStatus::Converted,
        RequirementStatus::Archived,
    ];

    /// Wire code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            RequirementStatus::New => "new",
            RequirementStatus::Contacted => "contacted",
            RequirementStatus::Quoted => "quoted",
            RequirementStatus::Converted => "converted",
            RequirementStatus::Archived => "archived",
        }
    }

    /// Human-readable label
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            RequirementStatus::New => "New",
            RequirementStatus::Contacted => "Contacted",
            RequirementStatus::Quoted => "Quoted",
            RequirementStatus::Converted => "Converted",
            RequirementStatus::Archived => "Archived",
        }
    }
}

impl fmt::Display for RequirementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for RequirementStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequirementStatus::ALL
            .into_iter()
            .find(|status| status.code() == s.trim())
            .ok_or_else(|| ValidationError::invalid_choice("status", s))
    }
}

/// Triage priority
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Low
    Low,
    /// Medium (default)
    #[default]
    Medium,
    /// High
    High,
}

impl Priority {
    /// Wire code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Human-readable label
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(ValidationError::invalid_choice("priority", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_type_parse_accepts_alias() {
        assert_eq!("it".parse::<ServiceType>().unwrap(), ServiceType::ItSupport);
        assert_eq!(
            " IT_SUPPORT ".parse::<ServiceType>().unwrap(),
            ServiceType::ItSupport
        );
        assert!("catering".parse::<ServiceType>().is_err());
    }

    #[test]
    fn service_type_serde_uses_codes() {
        let json = serde_json::to_string(&ServiceType::ItSupport).unwrap();
        assert_eq!(json, "\"it_support\"");
        let parsed: ServiceType = serde_json::from_str("\"it\"").unwrap();
        assert_eq!(parsed, ServiceType::ItSupport);
    }

    #[test]
    fn status_defaults_and_parse() {
        assert_eq!(RequirementStatus::default(), RequirementStatus::New);
        assert_eq!(
            "contacted".parse::<RequirementStatus>().unwrap(),
            RequirementStatus::Contacted
        );
        let err = "closed".parse::<RequirementStatus>().unwrap_err();
        assert_eq!(err.field(), "status");
    }

    #[test]
    fn priority_defaults_and_parse() {
        assert_eq!(Priority::default(), Priority::Medium);
        assert_eq!("high".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(Priority::Low.label(), "Low");
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn ids_display_raw_value() {
        assert_eq!(RequirementId(42).to_string(), "42");
        assert_eq!(AdminUserId(7).to_string(), "7");
    }
}
