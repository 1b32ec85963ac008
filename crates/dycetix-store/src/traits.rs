//! Storage seams
//!
//! Services hold these as `Arc<dyn ...>` so backends can be swapped without
//! touching intake or triage logic.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dycetix_core::{
    AdminSession, AdminUser, AdminUserId, ClientRequirement, FormAttachment, NewAdminUser,
    NewAttachment, NewRequirement, Page, PageRequest, RequirementFilter, RequirementId,
    RequirementStats, Visibility,
};
use std::collections::BTreeMap;

/// Requirement and attachment rows
///
/// Each method is one atomic write or one consistent read. Listing orders
/// newest first (`created_at`, then id, descending).
#[async_trait]
pub trait RequirementStore: Send + Sync {
    /// Persist a validated requirement with triage defaults
    async fn insert_requirement(
        &self,
        draft: NewRequirement,
        now: DateTime<Utc>,
    ) -> Result<ClientRequirement, StoreError>;

    /// Fetch one requirement
    async fn get_requirement(
        &self,
        id: RequirementId,
    ) -> Result<Option<ClientRequirement>, StoreError>;

    /// Filtered, paginated listing
    async fn list_requirements(
        &self,
        filter: &RequirementFilter,
        page: PageRequest,
    ) -> Result<Page<ClientRequirement>, StoreError>;

    /// Overwrite the triage fields and `updated_at` of an existing requirement
    ///
    /// Last write wins. Fails with `NotFound` if the row is gone.
    async fn save_requirement(&self, record: &ClientRequirement) -> Result<(), StoreError>;

    /// Newest requirements created at or after `since`
    async fn recent_requirements(
        &self,
        since: DateTime<Utc>,
        limit: usize,
        visibility: Visibility,
    ) -> Result<Vec<ClientRequirement>, StoreError>;

    /// Live aggregate counts, `today` being the reference day
    async fn stats(&self, today: NaiveDate) -> Result<RequirementStats, StoreError>;

    /// Delete a requirement and its attachment rows
    ///
    /// Returns whether a row was removed.
    async fn delete_requirement(&self, id: RequirementId) -> Result<bool, StoreError>;

    /// Persist attachment metadata
    async fn insert_attachment(
        &self,
        draft: NewAttachment,
        now: DateTime<Utc>,
    ) -> Result<FormAttachment, StoreError>;

    /// Attachments of one requirement, oldest first
    async fn attachments_for(&self, id: RequirementId) -> Result<Vec<FormAttachment>, StoreError>;

    /// Number of attachments per requirement (ids without attachments are absent)
    async fn attachment_counts(
        &self,
        ids: &[RequirementId],
    ) -> Result<BTreeMap<RequirementId, u64>, StoreError>;

    /// Cheap liveness probe
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Admin accounts and their sessions
#[async_trait]
pub trait AdminStore: Send + Sync {
    /// Persist a new account; `Conflict` if the email is taken
    async fn insert_admin(
        &self,
        draft: NewAdminUser,
        now: DateTime<Utc>,
    ) -> Result<AdminUser, StoreError>;

    /// Fetch by id
    async fn get_admin(&self, id: AdminUserId) -> Result<Option<AdminUser>, StoreError>;

    /// Fetch by email, case-insensitively
    async fn find_admin_by_email(&self, email: &str) -> Result<Option<AdminUser>, StoreError>;

    /// All accounts, by id
    async fn list_admins(&self) -> Result<Vec<AdminUser>, StoreError>;

    /// Record a successful login
    async fn record_login(
        &self,
        id: AdminUserId,
        ip: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Enable or disable an account
    async fn set_active(
        &self,
        id: AdminUserId,
        active: bool,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Persist a session
    async fn insert_session(&self, session: &AdminSession) -> Result<(), StoreError>;

    /// Fetch a session by key
    async fn find_session(&self, key: &str) -> Result<Option<AdminSession>, StoreError>;

    /// Remove a session; returns whether it existed
    async fn delete_session(&self, key: &str) -> Result<bool, StoreError>;

    /// Remove sessions expired at `now`; returns how many
    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Blob written to a [`BlobStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub key: String,
    /// Public url the blob is served under
    pub url: String,
    pub size: u64,
}

/// Byte storage for uploaded files
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `data` under `key`, replacing any previous blob
    async fn put(&self, key: &str, data: &[u8]) -> Result<StoredBlob, StoreError>;

    /// Read a blob
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Delete a blob (missing keys are not an error)
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Check if a blob exists
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Public url for a key
    fn url_for(&self, key: &str) -> String;
}
