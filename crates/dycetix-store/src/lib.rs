//! Dycetix Store
//!
//! Storage seams for the intake and triage services, with their backends.
//!
//! # Core Concepts
//!
//! - [`RequirementStore`]: requirement and attachment rows, filtered listing, live stats
//! - [`AdminStore`]: admin accounts and bearer sessions
//! - [`BlobStore`]: uploaded file bytes
//!
//! # Backends
//!
//! | type | traits |
//! |---|---|
//! | [`MemoryStore`] | `RequirementStore`, `AdminStore` |
//! | [`SqliteStore`] | `RequirementStore`, `AdminStore` |
//! | [`FilesystemBlobStore`] | `BlobStore` |
//! | [`MemoryBlobStore`] | `BlobStore` |
//!
//! # Example
//!
//! ```rust,ignore
//! use dycetix_store::{RequirementStore, SqliteStore};
//!
//! let store = SqliteStore::open("data/dycetix.db")?;
//! let record = store.insert_requirement(draft, Utc::now()).await?;
//! let page = store.list_requirements(&filter, PageRequest::default()).await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod blob;
mod error;
mod memory;
mod sqlite;
mod traits;

pub use blob::{FilesystemBlobStore, MemoryBlobStore, DEFAULT_MEDIA_URL};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{AdminStore, BlobStore, RequirementStore, StoredBlob};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
