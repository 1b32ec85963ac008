//! Requirement queries
//!
//! [`RequirementFilter`] combines the optional list filters with the
//! caller's [`Visibility`]. [`RequirementFilter::matches`] is the reference
//! predicate; stores may push it down into SQL but must return the same rows.

use crate::requirement::ClientRequirement;
use crate::types::{AdminUserId, RequirementStatus, ServiceType};
use crate::visibility::Visibility;
use serde::{Deserialize, Serialize};

/// Default page size for list queries
pub const DEFAULT_PAGE_LIMIT: usize = 50;

/// Largest page a caller may request
pub const MAX_PAGE_LIMIT: usize = 200;

/// Case-insensitive free-text search term
///
/// Matches when any of first name, last name, email, company or project
/// description contains the term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm(String);

impl SearchTerm {
    /// Build from user input; blank input yields `None`
    #[must_use]
    pub fn new(raw: &str) -> Option<Self> {
        let term = raw.trim();
        if term.is_empty() {
            None
        } else {
            Some(Self(term.to_lowercase()))
        }
    }

    /// Lowercased term
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check a requirement against the term
    #[must_use]
    pub fn matches(&self, requirement: &ClientRequirement) -> bool {
        let fields = [
            Some(requirement.first_name.as_str()),
            Some(requirement.last_name.as_str()),
            Some(requirement.email.as_str()),
            requirement.company.as_deref(),
            Some(requirement.project_description.as_str()),
        ];
        fields
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&self.0))
    }
}

/// Filters for listing requirements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementFilter {
    pub status: Option<RequirementStatus>,
    pub assigned_to: Option<AdminUserId>,
    pub service: Option<ServiceType>,
    pub search: Option<SearchTerm>,
    pub visibility: Visibility,
}

impl RequirementFilter {
    /// Unfiltered, unrestricted
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With status filter
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: RequirementStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// With assignee filter
    #[inline]
    #[must_use]
    pub fn with_assigned_to(mut self, admin: AdminUserId) -> Self {
        self.assigned_to = Some(admin);
        self
    }

    /// With service filter
    #[inline]
    #[must_use]
    pub fn with_service(mut self, service: ServiceType) -> Self {
        self.service = Some(service);
        self
    }

    /// With free-text search (blank input is ignored)
    #[inline]
    #[must_use]
    pub fn with_search(mut self, raw: &str) -> Self {
        self.search = SearchTerm::new(raw);
        self
    }

    /// With row-level visibility
    #[inline]
    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Reference predicate
    #[must_use]
    pub fn matches(&self, requirement: &ClientRequirement) -> bool {
        self.status.map_or(true, |s| requirement.status == s)
            && self
                .assigned_to
                .map_or(true, |a| requirement.assigned_to == Some(a))
            && self.service.map_or(true, |s| requirement.requests(s))
            && self.search.as_ref().map_or(true, |t| t.matches(requirement))
            && self.visibility.admits(requirement.assigned_to)
    }
}

/// Offset pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub limit: usize,
    pub offset: usize,
}

impl PageRequest {
    /// Build a page, clamping the limit into `1..=MAX_PAGE_LIMIT`
    #[must_use]
    pub fn new(limit: Option<usize>, offset: Option<usize>) -> Self {
        Self {
            limit: limit
                .unwrap_or(DEFAULT_PAGE_LIMIT)
                .clamp(1, MAX_PAGE_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus the total number of matching rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub limit: usize,
    pub offset: usize,
}

impl<T> Page<T> {
    /// Transform the items, keeping paging metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirement::{NewRequirement, RequestMeta, RequirementForm};
    use crate::types::RequirementId;
    use chrono::Utc;
    use proptest::prelude::*;

    fn requirement(first: &str, company: &str, description: &str) -> ClientRequirement {
        let form = RequirementForm {
            first_name: first.to_string(),
            last_name: "Smith".to_string(),
            email: "lead@example.com".to_string(),
            company: company.to_string(),
            services: vec!["software".to_string()],
            project_description: description.to_string(),
            ..RequirementForm::default()
        };
        NewRequirement::validate(form, RequestMeta::default())
            .unwrap()
            .into_record(RequirementId(1), Utc::now())
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let term = SearchTerm::new("ACME").unwrap();
        assert!(term.matches(&requirement("Jo", "acme corp", "site")));
        assert!(term.matches(&requirement("Jo", "", "rebuild the Acme portal")));
        assert!(!term.matches(&requirement("Jo", "Globex", "site")));
    }

    #[test]
    fn blank_search_is_ignored() {
        assert!(SearchTerm::new("   ").is_none());
        let filter = RequirementFilter::new().with_search("  ");
        assert!(filter.matches(&requirement("Jo", "", "x")));
    }

    #[test]
    fn filter_combines_with_and() {
        let mut r = requirement("Jo", "Acme", "x");
        r.status = RequirementStatus::Quoted;
        r.assigned_to = Some(AdminUserId(3));

        assert!(RequirementFilter::new()
            .with_status(RequirementStatus::Quoted)
            .with_assigned_to(AdminUserId(3))
            .with_service(ServiceType::Software)
            .matches(&r));
        assert!(!RequirementFilter::new()
            .with_status(RequirementStatus::New)
            .matches(&r));
        assert!(!RequirementFilter::new()
            .with_service(ServiceType::Design)
            .matches(&r));
        assert!(!RequirementFilter::new()
            .with_visibility(Visibility::OwnOrUnassigned(AdminUserId(4)))
            .matches(&r));
    }

    #[test]
    fn page_request_clamps_limit() {
        assert_eq!(PageRequest::new(None, None).limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(PageRequest::new(Some(0), None).limit, 1);
        assert_eq!(PageRequest::new(Some(10_000), Some(5)).limit, MAX_PAGE_LIMIT);
        assert_eq!(PageRequest::new(Some(10), Some(5)).offset, 5);
    }

    proptest! {
        #[test]
        fn search_matches_iff_some_field_contains_term(
            company in "[a-zA-Z ]{0,12}",
            description in "[a-zA-Z][a-zA-Z ]{0,23}",
            term in "[a-zA-Z]{1,4}",
        ) {
            let r = requirement("Jo", &company, &description);
            let needle = term.to_lowercase();
            let expected = [
                r.first_name.clone(),
                r.last_name.clone(),
                r.email.clone(),
                r.company.clone().unwrap_or_default(),
                r.project_description.clone(),
            ]
            .iter()
            .any(|f| f.to_lowercase().contains(&needle));

            let search = SearchTerm::new(&term).unwrap();
            prop_assert_eq!(search.matches(&r), expected);
        }
    }
}
