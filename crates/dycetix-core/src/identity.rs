//! Admin identities
//!
//! Defines the email-keyed [`AdminUser`], its [`AdminRole`], the acting
//! [`Actor`] consumed by triage, and bearer [`AdminSession`]s.
//!
//! Accounts are only built through [`NewAdminUser`], whose constructors keep
//! role and privilege flags consistent:
//! - [`NewAdminUser::staff`] never yields a superuser and refuses `super_admin`
//! - [`NewAdminUser::superuser`] forces `is_staff`, `is_superuser` and
//!   `super_admin`, and refuses an explicit `false` for either flag

use crate::email::EmailAddress;
use crate::error::IdentityError;
use crate::requirement::non_blank;
use crate::types::AdminUserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Back-office role
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// Full access, reserved for superusers
    SuperAdmin,
    /// Day-to-day triage (default)
    #[default]
    Operations,
    /// Website content
    Content,
    /// Billing
    Finance,
}

impl AdminRole {
    /// Wire code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            AdminRole::SuperAdmin => "super_admin",
            AdminRole::Operations => "operations",
            AdminRole::Content => "content",
            AdminRole::Finance => "finance",
        }
    }

    /// Human-readable label
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            AdminRole::SuperAdmin => "Super Admin",
            AdminRole::Operations => "Operations",
            AdminRole::Content => "Content",
            AdminRole::Finance => "Finance",
        }
    }
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for AdminRole {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "super_admin" => Ok(AdminRole::SuperAdmin),
            "operations" => Ok(AdminRole::Operations),
            "content" => Ok(AdminRole::Content),
            "finance" => Ok(AdminRole::Finance),
            other => Err(IdentityError::UnknownRole(other.to_string())),
        }
    }
}

/// Persisted admin account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: AdminUserId,
    /// Login key, unique and lowercase
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: AdminRole,
    /// Opaque hash owned by the authentication layer
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub avatar_url: Option<String>,
    pub two_factor_enabled: bool,
    pub last_ip: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_by: Option<AdminUserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdminUser {
    /// "First Last", trimmed (empty when no name is set)
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Full name, or the email when no name is set
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = self.full_name();
        if name.is_empty() {
            self.email.clone()
        } else {
            name
        }
    }

    /// Acting identity for authorization checks
    #[inline]
    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.id,
            is_superuser: self.is_superuser,
        }
    }
}

/// Identity of the admin performing a triage action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: AdminUserId,
    pub is_superuser: bool,
}

impl Actor {
    /// Regular (visibility-restricted) actor
    #[inline]
    #[must_use]
    pub fn staff(user_id: AdminUserId) -> Self {
        Self {
            user_id,
            is_superuser: false,
        }
    }

    /// Superuser actor
    #[inline]
    #[must_use]
    pub fn superuser(user_id: AdminUserId) -> Self {
        Self {
            user_id,
            is_superuser: true,
        }
    }
}

/// Explicit privilege flags supplied when creating a superuser
///
/// `None` means "not specified" and is forced to `true`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrivilegeFlags {
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
}

/// Validated, not-yet-persisted admin account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAdminUser {
    email: EmailAddress,
    first_name: String,
    last_name: String,
    role: AdminRole,
    password_hash: Option<String>,
    is_staff: bool,
    is_superuser: bool,
    avatar_url: Option<String>,
    created_by: Option<AdminUserId>,
}

impl NewAdminUser {
    /// Regular account with the given role
    ///
    /// # Errors
    /// - `EmptyEmail` / `InvalidEmail` for a bad email
    /// - `SuperAdminRoleRequiresSuperuser` for `AdminRole::SuperAdmin`
    pub fn staff(email: &str, role: AdminRole) -> Result<Self, IdentityError> {
        if role == AdminRole::SuperAdmin {
            return Err(IdentityError::SuperAdminRoleRequiresSuperuser);
        }
        Ok(Self {
            email: parse_email(email)?,
            first_name: String::new(),
            last_name: String::new(),
            role,
            password_hash: None,
            is_staff: true,
            is_superuser: false,
            avatar_url: None,
            created_by: None,
        })
    }

    /// Privileged account: staff, superuser, `super_admin`
    ///
    /// # Errors
    /// - `EmptyEmail` / `InvalidEmail` for a bad email
    /// - `PrivilegeFlagDisabled` when either flag is explicitly `false`
    pub fn superuser(email: &str, flags: PrivilegeFlags) -> Result<Self, IdentityError> {
        if flags.is_staff == Some(false) {
            return Err(IdentityError::PrivilegeFlagDisabled { flag: "is_staff" });
        }
        if flags.is_superuser == Some(false) {
            return Err(IdentityError::PrivilegeFlagDisabled {
                flag: "is_superuser",
            });
        }
        Ok(Self {
            email: parse_email(email)?,
            first_name: String::new(),
            last_name: String::new(),
            role: AdminRole::SuperAdmin,
            password_hash: None,
            is_staff: true,
            is_superuser: true,
            avatar_url: None,
            created_by: None,
        })
    }

    /// With display name
    #[must_use]
    pub fn with_name(mut self, first_name: &str, last_name: &str) -> Self {
        self.first_name = first_name.trim().to_string();
        self.last_name = last_name.trim().to_string();
        self
    }

    /// With password hash produced by the authentication layer
    #[must_use]
    pub fn with_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    /// With avatar url
    #[must_use]
    pub fn with_avatar_url(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = non_blank(url.into());
        self
    }

    /// Record the admin who created this account
    #[must_use]
    pub fn created_by(mut self, creator: AdminUserId) -> Self {
        self.created_by = Some(creator);
        self
    }

    /// Normalized email
    #[inline]
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Role
    #[inline]
    #[must_use]
    pub fn role(&self) -> AdminRole {
        self.role
    }

    /// Superuser flag
    #[inline]
    #[must_use]
    pub fn is_superuser(&self) -> bool {
        self.is_superuser
    }

    /// Admin who created this account, if recorded
    #[inline]
    #[must_use]
    pub fn creator(&self) -> Option<AdminUserId> {
        self.created_by
    }

    /// Materialize as a stored row
    #[must_use]
    pub fn into_record(self, id: AdminUserId, created_at: DateTime<Utc>) -> AdminUser {
        AdminUser {
            id,
            email: self.email.into_string(),
            first_name: self.first_name,
            last_name: self.last_name,
            role: self.role,
            password_hash: self.password_hash,
            is_active: true,
            is_staff: self.is_staff,
            is_superuser: self.is_superuser,
            avatar_url: self.avatar_url,
            two_factor_enabled: false,
            last_ip: None,
            last_login: None,
            created_by: self.created_by,
            created_at,
            updated_at: created_at,
        }
    }
}

fn parse_email(raw: &str) -> Result<EmailAddress, IdentityError> {
    match EmailAddress::parse(raw) {
        None => Err(IdentityError::EmptyEmail),
        Some(Err(value)) => Err(IdentityError::InvalidEmail(value)),
        Some(Ok(email)) => Ok(email),
    }
}

/// Bearer session issued to an admin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSession {
    pub session_key: String,
    pub user_id: AdminUserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AdminSession {
    /// Check expiry at `now`
    #[inline]
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
