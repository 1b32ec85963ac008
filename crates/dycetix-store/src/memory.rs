//! In-memory backend
//!
//! One `RwLock` guards every table, so each trait call is atomic with respect
//! to the others. Used by default and throughout the tests.

use crate::error::StoreError;
use crate::traits::{AdminStore, RequirementStore};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dycetix_core::{
    normalize_email, AdminSession, AdminUser, AdminUserId, AttachmentId, ClientRequirement,
    FormAttachment, NewAdminUser, NewAttachment, NewRequirement, Page, PageRequest,
    RequirementFilter, RequirementId, RequirementStats, StatsAccumulator, Visibility,
};
use parking_lot::RwLock;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
struct Tables {
    requirements: BTreeMap<RequirementId, ClientRequirement>,
    attachments: BTreeMap<AttachmentId, FormAttachment>,
    admins: BTreeMap<AdminUserId, AdminUser>,
    sessions: HashMap<String, AdminSession>,
    next_requirement: i64,
    next_attachment: i64,
    next_admin: i64,
}

impl Tables {
    fn newest_first<'a>(
        &'a self,
        keep: impl Fn(&ClientRequirement) -> bool,
    ) -> Vec<&'a ClientRequirement> {
        let mut rows: Vec<_> = self.requirements.values().filter(|r| keep(r)).collect();
        rows.sort_by_key(|r| Reverse((r.created_at, r.id)));
        rows
    }
}

/// Store keeping every table in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequirementStore for MemoryStore {
    async fn insert_requirement(
        &self,
        draft: NewRequirement,
        now: DateTime<Utc>,
    ) -> Result<ClientRequirement, StoreError> {
        let mut tables = self.tables.write();
        tables.next_requirement += 1;
        let id = RequirementId(tables.next_requirement);
        let record = draft.into_record(id, now);
        tables.requirements.insert(id, record.clone());
        Ok(record)
    }

    async fn get_requirement(
        &self,
        id: RequirementId,
    ) -> Result<Option<ClientRequirement>, StoreError> {
        Ok(self.tables.read().requirements.get(&id).cloned())
    }

    async fn list_requirements(
        &self,
        filter: &RequirementFilter,
        page: PageRequest,
    ) -> Result<Page<ClientRequirement>, StoreError> {
        let tables = self.tables.read();
        let rows = tables.newest_first(|r| filter.matches(r));
        let total = rows.len() as u64;
        let items = rows
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .cloned()
            .collect();
        Ok(Page {
            items,
            total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    async fn save_requirement(&self, record: &ClientRequirement) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let slot = tables
            .requirements
            .get_mut(&record.id)
            .ok_or_else(|| StoreError::not_found("requirement", record.id))?;
        slot.status = record.status;
        slot.priority = record.priority;
        slot.assigned_to = record.assigned_to;
        slot.internal_notes.clone_from(&record.internal_notes);
        slot.admin_response.clone_from(&record.admin_response);
        slot.response_sent_at = record.response_sent_at;
        slot.updated_at = record.updated_at;
        Ok(())
    }

    async fn recent_requirements(
        &self,
        since: DateTime<Utc>,
        limit: usize,
        visibility: Visibility,
    ) -> Result<Vec<ClientRequirement>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .newest_first(|r| r.created_at >= since && visibility.admits(r.assigned_to))
            .into_iter()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn stats(&self, today: NaiveDate) -> Result<RequirementStats, StoreError> {
        let tables = self.tables.read();
        Ok(StatsAccumulator::from_records(
            today,
            tables.requirements.values(),
        ))
    }

    async fn delete_requirement(&self, id: RequirementId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        let removed = tables.requirements.remove(&id).is_some();
        if removed {
            tables
                .attachments
                .retain(|_, a| a.client_requirement != Some(id));
        }
        Ok(removed)
    }

    async fn insert_attachment(
        &self,
        draft: NewAttachment,
        now: DateTime<Utc>,
    ) -> Result<FormAttachment, StoreError> {
        let mut tables = self.tables.write();
        if let Some(owner) = draft.client_requirement {
            if !tables.requirements.contains_key(&owner) {
                return Err(StoreError::not_found("requirement", owner));
            }
        }
        tables.next_attachment += 1;
        let id = AttachmentId(tables.next_attachment);
        let record = draft.into_record(id, now);
        tables.attachments.insert(id, record.clone());
        Ok(record)
    }

    async fn attachments_for(&self, id: RequirementId) -> Result<Vec<FormAttachment>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .attachments
            .values()
            .filter(|a| a.client_requirement == Some(id))
            .cloned()
            .collect())
    }

    async fn attachment_counts(
        &self,
        ids: &[RequirementId],
    ) -> Result<BTreeMap<RequirementId, u64>, StoreError> {
        let tables = self.tables.read();
        let mut counts = BTreeMap::new();
        for owner in tables.attachments.values().filter_map(|a| a.client_requirement) {
            if ids.contains(&owner) {
                *counts.entry(owner).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl AdminStore for MemoryStore {
    async fn insert_admin(
        &self,
        draft: NewAdminUser,
        now: DateTime<Utc>,
    ) -> Result<AdminUser, StoreError> {
        let mut tables = self.tables.write();
        if tables.admins.values().any(|a| a.email == draft.email()) {
            return Err(StoreError::Conflict(format!(
                "admin email already registered: {}",
                draft.email()
            )));
        }
        if let Some(creator) = draft.creator() {
            if !tables.admins.contains_key(&creator) {
                return Err(StoreError::not_found("admin", creator));
            }
        }
        tables.next_admin += 1;
        let id = AdminUserId(tables.next_admin);
        let record = draft.into_record(id, now);
        tables.admins.insert(id, record.clone());
        Ok(record)
    }

    async fn get_admin(&self, id: AdminUserId) -> Result<Option<AdminUser>, StoreError> {
        Ok(self.tables.read().admins.get(&id).cloned())
    }

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<AdminUser>, StoreError> {
        let wanted = normalize_email(email);
        let tables = self.tables.read();
        Ok(tables.admins.values().find(|a| a.email == wanted).cloned())
    }

    async fn list_admins(&self) -> Result<Vec<AdminUser>, StoreError> {
        Ok(self.tables.read().admins.values().cloned().collect())
    }

    async fn record_login(
        &self,
        id: AdminUserId,
        ip: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let admin = tables
            .admins
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("admin", id))?;
        admin.last_login = Some(at);
        if ip.is_some() {
            admin.last_ip = ip;
        }
        admin.updated_at = at;
        Ok(())
    }

    async fn set_active(
        &self,
        id: AdminUserId,
        active: bool,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let admin = tables
            .admins
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("admin", id))?;
        admin.is_active = active;
        admin.updated_at = now;
        Ok(())
    }

    async fn insert_session(&self, session: &AdminSession) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        if !tables.admins.contains_key(&session.user_id) {
            return Err(StoreError::not_found("admin", session.user_id));
        }
        if tables.sessions.contains_key(&session.session_key) {
            return Err(StoreError::Conflict("session key already issued".to_string()));
        }
        tables
            .sessions
            .insert(session.session_key.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, key: &str) -> Result<Option<AdminSession>, StoreError> {
        Ok(self.tables.read().sessions.get(key).cloned())
    }

    async fn delete_session(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.tables.write().sessions.remove(key).is_some())
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tables = self.tables.write();
        let before = tables.sessions.len();
        tables.sessions.retain(|_, s| !s.is_expired(now));
        Ok((before - tables.sessions.len()) as u64)
    }
}
