//! Client requirement records
//!
//! A [`ClientRequirement`] is a prospective customer's intake submission plus
//! the triage fields staff maintain on it. New records only come out of
//! [`NewRequirement::validate`], so every persisted row satisfies the intake
//! invariants (required fields present, `other_service` set when `other` is
//! selected, email normalized).

use crate::email::EmailAddress;
use crate::error::ValidationError;
use crate::types::{AdminUserId, Priority, RequirementId, RequirementStatus, ServiceType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default `source` when the form does not say where it was submitted from
pub const DEFAULT_SOURCE: &str = "website";

/// Persisted client requirement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRequirement {
    pub id: RequirementId,

    // Contact
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,

    // Project
    pub services: BTreeSet<ServiceType>,
    pub other_service: Option<String>,
    pub project_description: String,
    pub budget_range: Option<String>,
    pub timeline: Option<String>,

    // Tracking, immutable after creation
    pub source: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,

    // Triage
    pub status: RequirementStatus,
    pub priority: Priority,
    pub assigned_to: Option<AdminUserId>,
    pub internal_notes: Option<String>,
    pub admin_response: Option<String>,
    pub response_sent_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClientRequirement {
    /// "First Last"
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Comma-separated service labels, with `other` rendered as its description
    #[must_use]
    pub fn selected_services(&self) -> String {
        self.services
            .iter()
            .map(|service| match (service, self.other_service.as_deref()) {
                (ServiceType::Other, Some(other)) => other.to_string(),
                _ => service.label().to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Creation time as `YYYY-MM-DD HH:MM`
    #[must_use]
    pub fn created_at_formatted(&self) -> String {
        self.created_at.format("%Y-%m-%d %H:%M").to_string()
    }

    /// Check whether a service was requested
    #[inline]
    #[must_use]
    pub fn requests(&self, service: ServiceType) -> bool {
        self.services.contains(&service)
    }

    /// Stamp a mutation
    #[inline]
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

/// Raw intake form, as typed by the visitor
///
/// Nothing here is trusted; feed it to [`NewRequirement::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub services: Vec<String>,
    pub other_service: String,
    pub project_description: String,
    pub budget_range: Option<String>,
    pub timeline: Option<String>,
    pub source: Option<String>,
}

/// Request metadata captured alongside a submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMeta {
    /// Create metadata from optional ip and user agent
    #[inline]
    #[must_use]
    pub fn new(ip_address: Option<String>, user_agent: Option<String>) -> Self {
        Self {
            ip_address: ip_address.and_then(non_blank),
            user_agent: user_agent.and_then(non_blank),
        }
    }
}

/// Validated, not-yet-persisted requirement
///
/// Fields are private: the only way to obtain one is [`NewRequirement::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewRequirement {
    first_name: String,
    last_name: String,
    email: EmailAddress,
    phone: Option<String>,
    company: Option<String>,
    services: BTreeSet<ServiceType>,
    other_service: Option<String>,
    project_description: String,
    budget_range: Option<String>,
    timeline: Option<String>,
    source: String,
    meta: RequestMeta,
}

impl NewRequirement {
    /// Validate and normalize a raw form
    ///
    /// # Checks (in order)
    /// 1. `first_name`, `last_name`, `email`, `project_description` present after trimming
    /// 2. email has a valid shape (stored lowercase)
    /// 3. at least one service, every code known
    /// 4. `other_service` present when `other` is selected
    ///
    /// # Errors
    /// The first failing check, naming its field.
    pub fn validate(form: RequirementForm, meta: RequestMeta) -> Result<Self, ValidationError> {
        let first_name = required("first_name", &form.first_name)?;
        let last_name = required("last_name", &form.last_name)?;
        if form.email.trim().is_empty() {
            return Err(ValidationError::missing("email"));
        }
        let project_description = required("project_description", &form.project_description)?;
        let email = match EmailAddress::parse(&form.email) {
            None => return Err(ValidationError::missing("email")),
            Some(Err(value)) => return Err(ValidationError::InvalidEmail { value }),
            Some(Ok(email)) => email,
        };

        let codes: Vec<&str> = form
            .services
            .iter()
            .map(|code| code.trim())
            .filter(|code| !code.is_empty())
            .collect();
        if codes.is_empty() {
            return Err(ValidationError::NoServiceSelected);
        }
        let services = codes
            .into_iter()
            .map(str::parse::<ServiceType>)
            .collect::<Result<BTreeSet<_>, _>>()?;

        let other_service = non_blank(form.other_service);
        if services.contains(&ServiceType::Other) && other_service.is_none() {
            return Err(ValidationError::OtherServiceRequired);
        }

        Ok(Self {
            first_name,
            last_name,
            email,
            phone: non_blank(form.phone),
            company: non_blank(form.company),
            services,
            other_service,
            project_description,
            budget_range: form.budget_range.and_then(non_blank),
            timeline: form.timeline.and_then(non_blank),
            source: form
                .source
                .and_then(non_blank)
                .unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            meta,
        })
    }

    /// Normalized email
    #[inline]
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Selected services
    #[inline]
    #[must_use]
    pub fn services(&self) -> &BTreeSet<ServiceType> {
        &self.services
    }

    /// Request metadata
    #[inline]
    #[must_use]
    pub fn meta(&self) -> &RequestMeta {
        &self.meta
    }

    /// Materialize as a stored record with triage defaults
    #[must_use]
    pub fn into_record(self, id: RequirementId, created_at: DateTime<Utc>) -> ClientRequirement {
        ClientRequirement {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email.into_string(),
            phone: self.phone,
            company: self.company,
            services: self.services,
            other_service: self.other_service,
            project_description: self.project_description,
            budget_range: self.budget_range,
            timeline: self.timeline,
            source: Some(self.source),
            ip_address: self.meta.ip_address,
            user_agent: self.meta.user_agent,
            status: RequirementStatus::default(),
            priority: Priority::default(),
            assigned_to: None,
            internal_notes: None,
            admin_response: None,
            response_sent_at: None,
            created_at,
            updated_at: created_at,
        }
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::missing(field))
    } else {
        Ok(trimmed.to_string())
    }
}

pub(crate) fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
