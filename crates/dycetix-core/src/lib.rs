//! Dycetix Core
//!
//! Domain model for client requirement intake and admin triage.
//!
//! # Core Concepts
//!
//! - [`ClientRequirement`]: a prospective customer's submission plus triage fields
//! - [`NewRequirement`]: validated intake form; the only way to create a record
//! - [`FormAttachment`]: metadata for an uploaded file, keyed to a blob
//! - [`AdminUser`] / [`NewAdminUser`]: email-keyed accounts with a guarded
//!   privileged constructor
//! - [`Visibility`]: row-level visibility predicate (superuser vs. own-or-unassigned)
//! - [`TriagePatch`]: partial triage update with the contacted auto-assign rule
//! - [`StatsAccumulator`]: live aggregate counts
//!
//! # Example
//!
//! ```rust,ignore
//! use dycetix_core::prelude::*;
//!
//! let draft = NewRequirement::validate(form, RequestMeta::default())?;
//! let mut record = draft.into_record(RequirementId(1), Utc::now());
//!
//! let patch = TriagePatch::from_json(&body)?;
//! patch.apply(&mut record, &admin.actor(), Utc::now());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod attachment;
mod checksum;
mod email;
mod error;
mod identity;
mod query;
mod requirement;
mod stats;
mod types;
mod update;
mod visibility;

pub use attachment::{
    attachment_storage_key, sanitize_filename, FormAttachment, NewAttachment, ATTACHMENT_PREFIX,
};
pub use checksum::{BlobChecksum, ChecksumError};
pub use email::{normalize as normalize_email, EmailAddress};
pub use error::{IdentityError, ValidationError};
pub use identity::{Actor, AdminRole, AdminSession, AdminUser, NewAdminUser, PrivilegeFlags};
pub use query::{
    Page, PageRequest, RequirementFilter, SearchTerm, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
pub use requirement::{
    ClientRequirement, NewRequirement, RequestMeta, RequirementForm, DEFAULT_SOURCE,
};
pub use stats::{
    DashboardStats, ListCounts, RequirementStats, SidebarStats, StatsAccumulator, SYSTEM_ONLINE,
};
pub use types::{AdminUserId, AttachmentId, Priority, RequirementId, RequirementStatus, ServiceType};
pub use update::{AssigneeChange, TriagePatch, PATCHABLE_FIELDS};
pub use visibility::Visibility;

/// Commonly used items
pub mod prelude {
    pub use crate::{
        Actor, AdminRole, AdminUser, AdminUserId, ClientRequirement, FormAttachment,
        NewAdminUser, NewRequirement, Page, PageRequest, Priority, RequestMeta,
        RequirementFilter, RequirementForm, RequirementId, RequirementStatus, ServiceType,
        TriagePatch, ValidationError, Visibility,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
