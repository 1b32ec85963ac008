//! Admin directory
//!
//! Account creation and bearer sessions. Sessions are opaque random keys
//! with a fixed lifetime; resolving one yields the acting [`AdminUser`].

use crate::error::ServiceError;
use chrono::{DateTime, Duration, Utc};
use dycetix_core::{AdminSession, AdminUser, AdminUserId, NewAdminUser};
use dycetix_store::AdminStore;
use std::sync::Arc;

/// Default session lifetime in hours
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 12;

/// Admin accounts and their sessions
#[derive(Clone)]
pub struct AdminDirectory {
    store: Arc<dyn AdminStore>,
    session_ttl: Duration,
}

impl std::fmt::Debug for AdminDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminDirectory")
            .field("session_ttl", &self.session_ttl)
            .finish_non_exhaustive()
    }
}

impl AdminDirectory {
    /// Create a directory with the default session lifetime
    #[must_use]
    pub fn new(store: Arc<dyn AdminStore>) -> Self {
        Self {
            store,
            session_ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
        }
    }

    /// With a custom session lifetime
    #[inline]
    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Persist a new account built by [`NewAdminUser::staff`] or
    /// [`NewAdminUser::superuser`]
    ///
    /// # Errors
    /// - `Conflict` when the email is already registered
    /// - `NotFound` when `created_by` names no admin
    pub async fn register(&self, draft: NewAdminUser) -> Result<AdminUser, ServiceError> {
        let admin = self.store.insert_admin(draft, Utc::now()).await?;
        tracing::info!(
            admin_id = %admin.id,
            role = admin.role.code(),
            superuser = admin.is_superuser,
            "Admin account created"
        );
        Ok(admin)
    }

    /// Look up an account by email, case-insensitively
    ///
    /// # Errors
    /// `Persistence` on storage failure.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<AdminUser>, ServiceError> {
        Ok(self.store.find_admin_by_email(email).await?)
    }

    /// All accounts, by id
    ///
    /// # Errors
    /// `Persistence` on storage failure.
    pub async fn list(&self) -> Result<Vec<AdminUser>, ServiceError> {
        Ok(self.store.list_admins().await?)
    }

    /// Enable or disable an account
    ///
    /// # Errors
    /// `NotFound` for an unknown id.
    pub async fn set_active(&self, id: AdminUserId, active: bool) -> Result<(), ServiceError> {
        self.store.set_active(id, active, Utc::now()).await?;
        tracing::info!(admin_id = %id, active, "Admin activation changed");
        Ok(())
    }

    /// Issue a bearer session for an admin, recording the login
    ///
    /// # Errors
    /// - `NotFound` for an unknown id
    /// - `Forbidden` for an inactive account
    pub async fn open_session(
        &self,
        id: AdminUserId,
        ip: Option<String>,
    ) -> Result<AdminSession, ServiceError> {
        self.open_session_at(id, ip, Utc::now()).await
    }

    /// [`AdminDirectory::open_session`] at `now`
    ///
    /// # Errors
    /// See [`AdminDirectory::open_session`].
    pub async fn open_session_at(
        &self,
        id: AdminUserId,
        ip: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<AdminSession, ServiceError> {
        let admin = self
            .store
            .get_admin(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("admin not found: {id}")))?;
        if !admin.is_active {
            return Err(ServiceError::Forbidden("Account is disabled".to_string()));
        }

        let session = AdminSession {
            session_key: uuid::Uuid::new_v4().simple().to_string(),
            user_id: id,
            created_at: now,
            expires_at: now + self.session_ttl,
        };
        self.store.insert_session(&session).await?;
        self.store.record_login(id, ip, now).await?;
        tracing::info!(admin_id = %id, expires_at = %session.expires_at, "Session opened");
        Ok(session)
    }

    /// Resolve a bearer key to its active admin
    ///
    /// # Errors
    /// `Unauthorized` when the session is unknown or expired, or the account
    /// is gone or disabled.
    pub async fn authenticate(&self, key: &str) -> Result<AdminUser, ServiceError> {
        self.authenticate_at(key, Utc::now()).await
    }

    /// [`AdminDirectory::authenticate`] at `now`
    ///
    /// # Errors
    /// See [`AdminDirectory::authenticate`].
    pub async fn authenticate_at(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<AdminUser, ServiceError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ServiceError::authentication_required());
        }
        let Some(session) = self.store.find_session(key).await? else {
            return Err(ServiceError::authentication_required());
        };
        if session.is_expired(now) {
            self.store.delete_session(key).await?;
            tracing::debug!(admin_id = %session.user_id, "Expired session rejected");
            return Err(ServiceError::authentication_required());
        }
        match self.store.get_admin(session.user_id).await? {
            Some(admin) if admin.is_active => Ok(admin),
            _ => Err(ServiceError::authentication_required()),
        }
    }

    /// Revoke a session; returns whether it existed
    ///
    /// # Errors
    /// `Persistence` on storage failure.
    pub async fn revoke(&self, key: &str) -> Result<bool, ServiceError> {
        Ok(self.store.delete_session(key).await?)
    }

    /// Drop every session expired at `now`
    ///
    /// # Errors
    /// `Persistence` on storage failure.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, ServiceError> {
        let purged = self.store.purge_expired_sessions(now).await?;
        if purged > 0 {
            tracing::info!(purged, "Expired sessions purged");
        }
        Ok(purged)
    }
}
