//! Dycetix Service
//!
//! The workflows on top of the stores: public intake, admin triage and the
//! admin directory.
//!
//! # Core Concepts
//!
//! - [`IntakeService`]: validates a submission, persists it, stores its files
//!   one by one (a bad file is skipped, never fatal)
//! - [`TriageService`]: visibility-aware list, detail, update, stats and recent
//! - [`AdminDirectory`]: admin accounts and bearer sessions
//!
//! # Example
//!
//! ```rust,ignore
//! use dycetix_service::{IntakeService, SubmissionPayload, TriageService};
//!
//! let intake = IntakeService::new(store.clone(), blobs);
//! let receipt = intake.submit(payload, meta).await?;
//!
//! let triage = TriageService::new(store, admins);
//! let listing = triage.list(&admin.actor(), &ListQuery::default()).await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod identity;
mod intake;
mod triage;

pub use error::{AttachmentError, ServiceError};
pub use identity::{AdminDirectory, DEFAULT_SESSION_TTL_HOURS};
pub use intake::{
    AttachmentOutcome, FilePayload, IntakeLimits, IntakeService, SubmissionPayload,
    SubmissionReceipt, DEFAULT_MAX_FILES, DEFAULT_MAX_FILE_BYTES, DEFAULT_MIME_TYPE,
};
pub use triage::{
    AttachmentView, HealthReport, ListQuery, RequirementDetail, RequirementListing,
    RequirementSummary, TriageService, UpdateSummary, RECENT_LIMIT, RECENT_WINDOW_DAYS,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
