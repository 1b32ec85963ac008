//! Triage service
//!
//! The authenticated read/update surface over client requirements. Every
//! read and write goes through the caller's [`Visibility`]: a row the
//! caller may not see is reported as not found.

use crate::error::ServiceError;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use dycetix_core::{
    Actor, AdminUserId, AssigneeChange, ClientRequirement, DashboardStats, FormAttachment,
    ListCounts, PageRequest, Priority, RequirementFilter, RequirementId, RequirementStats,
    RequirementStatus, ServiceType, SidebarStats, TriagePatch, ValidationError, Visibility,
};
use dycetix_store::{AdminStore, RequirementStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Window of the recent listing
pub const RECENT_WINDOW_DAYS: i64 = 7;

/// Rows returned by the recent listing
pub const RECENT_LIMIT: usize = 10;

/// Raw list query parameters; blank values are ignored
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub status: Option<String>,
    pub assigned_to: Option<String>,
    pub service: Option<String>,
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ListQuery {
    /// Build the store filter for this query as seen by `actor`
    ///
    /// # Errors
    /// `InvalidChoice` / `UnknownService` for unparseable filter values.
    pub fn to_filter(&self, actor: &Actor) -> Result<RequirementFilter, ValidationError> {
        let mut filter = RequirementFilter::new().with_visibility(Visibility::for_actor(actor));
        if let Some(status) = given(self.status.as_deref()) {
            filter = filter.with_status(status.parse::<RequirementStatus>()?);
        }
        if let Some(raw) = given(self.assigned_to.as_deref()) {
            let id = raw
                .parse::<i64>()
                .map_err(|_| ValidationError::invalid_choice("assigned_to", raw))?;
            filter = filter.with_assigned_to(AdminUserId(id));
        }
        if let Some(service) = given(self.service.as_deref()) {
            filter = filter.with_service(service.parse::<ServiceType>()?);
        }
        if let Some(search) = given(self.search.as_deref()) {
            filter = filter.with_search(search);
        }
        Ok(filter)
    }

    /// Requested page, clamped
    #[must_use]
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.limit, self.offset)
    }
}

fn given(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// One row of the listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequirementSummary {
    pub id: RequirementId,
    pub full_name: String,
    pub email: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    /// Display string of the selected services
    pub services: String,
    pub project_description: String,
    pub status: RequirementStatus,
    pub status_display: &'static str,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub created_at_formatted: String,
    /// Assignee display name
    pub assigned_to: Option<String>,
    pub attachments_count: u64,
}

impl RequirementSummary {
    fn new(record: &ClientRequirement, assignee: Option<String>, attachments_count: u64) -> Self {
        Self {
            id: record.id,
            full_name: record.full_name(),
            email: record.email.clone(),
            company: record.company.clone(),
            phone: record.phone.clone(),
            services: record.selected_services(),
            project_description: record.project_description.clone(),
            status: record.status,
            status_display: record.status.label(),
            priority: record.priority,
            created_at: record.created_at,
            created_at_formatted: record.created_at_formatted(),
            assigned_to: assignee,
            attachments_count,
        }
    }
}

/// A page of the listing plus the global counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequirementListing {
    pub items: Vec<RequirementSummary>,
    /// Matching rows across all pages
    pub total: u64,
    pub limit: usize,
    pub offset: usize,
    pub counts: ListCounts,
}

/// Attachment as shown in the detail view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttachmentView {
    pub id: i64,
    pub filename: String,
    pub url: String,
    pub size_mb: f64,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<&FormAttachment> for AttachmentView {
    fn from(attachment: &FormAttachment) -> Self {
        Self {
            id: attachment.id.0,
            filename: attachment.original_filename.clone(),
            url: attachment.url.clone(),
            size_mb: attachment.file_size_mb(),
            mime_type: attachment.mime_type.clone(),
            uploaded_at: attachment.created_at,
        }
    }
}

/// Full requirement with its attachments
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequirementDetail {
    #[serde(flatten)]
    pub requirement: ClientRequirement,
    pub full_name: String,
    pub selected_services: String,
    pub status_display: &'static str,
    pub priority_display: &'static str,
    pub created_at_formatted: String,
    /// Assignee display name
    pub assigned_to_name: Option<String>,
    pub attachments: Vec<AttachmentView>,
    pub attachments_count: usize,
}

/// Echo of an applied update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateSummary {
    pub id: RequirementId,
    pub status: RequirementStatus,
    pub status_display: &'static str,
    pub priority: Priority,
    /// Assignee display name
    pub assigned_to: Option<String>,
    pub assigned_to_id: Option<AdminUserId>,
}

/// Result of the health probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub database: &'static str,
    pub timestamp: DateTime<Utc>,
}

impl HealthReport {
    /// Check if the database answered
    #[inline]
    #[must_use]
    pub fn database_connected(&self) -> bool {
        self.database == "connected"
    }
}

/// Triage service
#[derive(Clone)]
pub struct TriageService {
    requirements: Arc<dyn RequirementStore>,
    admins: Arc<dyn AdminStore>,
}

impl std::fmt::Debug for TriageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriageService").finish_non_exhaustive()
    }
}

impl TriageService {
    /// Create a triage service over the given stores
    #[must_use]
    pub fn new(requirements: Arc<dyn RequirementStore>, admins: Arc<dyn AdminStore>) -> Self {
        Self {
            requirements,
            admins,
        }
    }

    /// Filtered, paginated listing, newest first
    ///
    /// # Errors
    /// - `Validation` for unparseable filter values
    /// - `Persistence` on storage failure
    pub async fn list(
        &self,
        actor: &Actor,
        query: &ListQuery,
    ) -> Result<RequirementListing, ServiceError> {
        self.list_at(actor, query, Utc::now()).await
    }

    /// [`TriageService::list`] with an explicit clock for the `today` counter
    ///
    /// # Errors
    /// See [`TriageService::list`].
    pub async fn list_at(
        &self,
        actor: &Actor,
        query: &ListQuery,
        now: DateTime<Utc>,
    ) -> Result<RequirementListing, ServiceError> {
        let filter = query.to_filter(actor)?;
        let page = self
            .requirements
            .list_requirements(&filter, query.page())
            .await?;

        let ids: Vec<RequirementId> = page.items.iter().map(|r| r.id).collect();
        let attachment_counts = self.requirements.attachment_counts(&ids).await?;
        let names = self
            .assignee_names(page.items.iter().filter_map(|r| r.assigned_to))
            .await?;
        let counts = self.requirements.stats(now.date_naive()).await?.list_counts();

        tracing::debug!(
            actor = %actor.user_id,
            total = page.total,
            returned = page.items.len(),
            "Listed client requirements"
        );

        let page = page.map(|record| {
            let assignee = record.assigned_to.and_then(|id| names.get(&id).cloned());
            let attachments = attachment_counts.get(&record.id).copied().unwrap_or(0);
            RequirementSummary::new(&record, assignee, attachments)
        });
        Ok(RequirementListing {
            items: page.items,
            total: page.total,
            limit: page.limit,
            offset: page.offset,
            counts,
        })
    }

    /// One requirement with its attachments
    ///
    /// # Errors
    /// `NotFound` when the row is missing or not visible to `actor`.
    pub async fn detail(
        &self,
        actor: &Actor,
        id: RequirementId,
    ) -> Result<RequirementDetail, ServiceError> {
        let requirement = self.visible(actor, id).await?;
        let attachments: Vec<AttachmentView> = self
            .requirements
            .attachments_for(id)
            .await?
            .iter()
            .map(AttachmentView::from)
            .collect();
        let assigned_to_name = match requirement.assigned_to {
            Some(admin) => self.admins.get_admin(admin).await?.map(|a| a.display_name()),
            None => None,
        };

        Ok(RequirementDetail {
            full_name: requirement.full_name(),
            selected_services: requirement.selected_services(),
            status_display: requirement.status.label(),
            priority_display: requirement.priority.label(),
            created_at_formatted: requirement.created_at_formatted(),
            assigned_to_name,
            attachments_count: attachments.len(),
            attachments,
            requirement,
        })
    }

    /// Apply a partial update from a raw JSON body
    ///
    /// # Errors
    /// - `Validation` for a non-object body or unusable values
    /// - see [`TriageService::update`]
    pub async fn update_json(
        &self,
        actor: &Actor,
        id: RequirementId,
        body: &Value,
    ) -> Result<UpdateSummary, ServiceError> {
        let patch = TriagePatch::from_json(body)?;
        self.update_at(actor, id, patch, Utc::now()).await
    }

    /// Apply a partial update
    ///
    /// # Errors
    /// See [`TriageService::update_at`].
    pub async fn update(
        &self,
        actor: &Actor,
        id: RequirementId,
        patch: TriagePatch,
    ) -> Result<UpdateSummary, ServiceError> {
        self.update_at(actor, id, patch, Utc::now()).await
    }

    /// Apply a partial update at `now`
    ///
    /// An assignee id naming no admin is dropped from the patch; the rest
    /// still applies. Moving an unowned row to `contacted` assigns it to
    /// `actor`.
    ///
    /// # Errors
    /// - `NotFound` when the row is missing or not visible to `actor`
    /// - `Persistence` on storage failure
    pub async fn update_at(
        &self,
        actor: &Actor,
        id: RequirementId,
        mut patch: TriagePatch,
        now: DateTime<Utc>,
    ) -> Result<UpdateSummary, ServiceError> {
        let mut requirement = self.visible(actor, id).await?;

        if let Some(AssigneeChange::AssignTo(admin)) = patch.assignee {
            if self.admins.get_admin(admin).await?.is_none() {
                tracing::warn!(
                    requirement_id = %id,
                    assignee = %admin,
                    "Ignoring assignment to unknown admin"
                );
                patch.assignee = None;
            }
        }

        let auto_assigned = patch.apply(&mut requirement, actor, now);
        self.requirements.save_requirement(&requirement).await?;
        tracing::info!(
            requirement_id = %id,
            actor = %actor.user_id,
            status = requirement.status.code(),
            auto_assigned,
            "Client requirement updated"
        );

        let assigned_to = match requirement.assigned_to {
            Some(admin) => self.admins.get_admin(admin).await?.map(|a| a.display_name()),
            None => None,
        };
        Ok(UpdateSummary {
            id,
            status: requirement.status,
            status_display: requirement.status.label(),
            priority: requirement.priority,
            assigned_to,
            assigned_to_id: requirement.assigned_to,
        })
    }

    /// Live aggregate counts
    ///
    /// # Errors
    /// `Persistence` on storage failure.
    pub async fn stats(&self) -> Result<RequirementStats, ServiceError> {
        self.stats_at(Utc::now().date_naive()).await
    }

    /// [`TriageService::stats`] for an explicit reference day
    ///
    /// # Errors
    /// `Persistence` on storage failure.
    pub async fn stats_at(&self, today: NaiveDate) -> Result<RequirementStats, ServiceError> {
        Ok(self.requirements.stats(today).await?)
    }

    /// Newest visible requirements of the last week
    ///
    /// # Errors
    /// `Persistence` on storage failure.
    pub async fn recent(&self, actor: &Actor) -> Result<Vec<RequirementSummary>, ServiceError> {
        self.recent_at(actor, Utc::now()).await
    }

    /// [`TriageService::recent`] relative to `now`
    ///
    /// # Errors
    /// `Persistence` on storage failure.
    pub async fn recent_at(
        &self,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Vec<RequirementSummary>, ServiceError> {
        let since = now - Duration::days(RECENT_WINDOW_DAYS);
        let rows = self
            .requirements
            .recent_requirements(since, RECENT_LIMIT, Visibility::for_actor(actor))
            .await?;
        let ids: Vec<RequirementId> = rows.iter().map(|r| r.id).collect();
        let attachment_counts = self.requirements.attachment_counts(&ids).await?;
        let names = self
            .assignee_names(rows.iter().filter_map(|r| r.assigned_to))
            .await?;
        Ok(rows
            .iter()
            .map(|record| {
                RequirementSummary::new(
                    record,
                    record.assigned_to.and_then(|id| names.get(&id).cloned()),
                    attachment_counts.get(&record.id).copied().unwrap_or(0),
                )
            })
            .collect())
    }

    /// Dashboard counters
    ///
    /// # Errors
    /// `Persistence` on storage failure.
    pub async fn dashboard(&self) -> Result<DashboardStats, ServiceError> {
        Ok(self.stats().await?.dashboard())
    }

    /// Sidebar counters
    ///
    /// # Errors
    /// `Persistence` on storage failure.
    pub async fn sidebar(&self) -> Result<SidebarStats, ServiceError> {
        Ok(self.stats().await?.sidebar())
    }

    /// Probe the database; never fails
    pub async fn health(&self) -> HealthReport {
        let database = match self.requirements.ping().await {
            Ok(()) => "connected",
            Err(err) => {
                tracing::error!("Database health check failed: {}", err);
                "disconnected"
            }
        };
        HealthReport {
            status: "ok",
            database,
            timestamp: Utc::now(),
        }
    }

    /// Unread notifications; there is no notification feed yet
    #[must_use]
    pub fn unread_count(&self) -> u64 {
        0
    }

    async fn visible(
        &self,
        actor: &Actor,
        id: RequirementId,
    ) -> Result<ClientRequirement, ServiceError> {
        let requirement = self
            .requirements
            .get_requirement(id)
            .await?
            .ok_or_else(ServiceError::requirement_not_found)?;
        if Visibility::for_actor(actor).admits(requirement.assigned_to) {
            Ok(requirement)
        } else {
            tracing::debug!(requirement_id = %id, actor = %actor.user_id, "Requirement not visible");
            Err(ServiceError::requirement_not_found())
        }
    }

    async fn assignee_names(
        &self,
        ids: impl Iterator<Item = AdminUserId>,
    ) -> Result<BTreeMap<AdminUserId, String>, ServiceError> {
        let mut names = BTreeMap::new();
        for id in ids.collect::<BTreeSet<_>>() {
            if let Some(admin) = self.admins.get_admin(id).await? {
                names.insert(id, admin.display_name());
            }
        }
        Ok(names)
    }
}
