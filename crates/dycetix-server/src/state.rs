//! Shared handler state

use crate::config::{DatabaseBackend, ServerConfig};
use chrono::Duration;
use dycetix_service::{AdminDirectory, IntakeLimits, IntakeService, TriageService};
use dycetix_store::{
    AdminStore, BlobStore, FilesystemBlobStore, MemoryBlobStore, MemoryStore, RequirementStore,
    SqliteStore, StoreError,
};
use std::sync::Arc;

/// Services handed to every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub intake: IntakeService,
    pub triage: TriageService,
    pub directory: AdminDirectory,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wire services over explicit stores
    #[must_use]
    pub fn new(
        requirements: Arc<dyn RequirementStore>,
        admins: Arc<dyn AdminStore>,
        blobs: Arc<dyn BlobStore>,
        config: ServerConfig,
    ) -> Self {
        let limits = IntakeLimits::default()
            .with_max_files(config.intake.max_files)
            .with_max_file_bytes(config.intake.max_file_bytes);
        Self {
            intake: IntakeService::new(requirements.clone(), blobs).with_limits(limits),
            triage: TriageService::new(requirements, admins.clone()),
            directory: AdminDirectory::new(admins)
                .with_session_ttl(Duration::hours(config.session.ttl_hours)),
            config: Arc::new(config),
        }
    }

    /// Open the stores `config` names and wire services over them
    ///
    /// # Errors
    /// `Sqlite`/`Io` when the database cannot be opened or created.
    pub fn from_config(config: ServerConfig) -> Result<Self, StoreError> {
        let blobs: Arc<dyn BlobStore> = match &config.media.root {
            Some(root) => Arc::new(FilesystemBlobStore::new(root.clone(), config.media.base_url.clone())),
            None => Arc::new(MemoryBlobStore::new(config.media.base_url.clone())),
        };
        let state = match config.database.backend {
            DatabaseBackend::Memory => {
                tracing::warn!(
                    "In-memory database: sessions issued by the CLI cannot reach this process, \
                     so admin routes will answer 401; configure a SQLite database to enable them"
                );
                let store = Arc::new(MemoryStore::new());
                Self::new(store.clone(), store, blobs, config)
            }
            DatabaseBackend::Sqlite => {
                let store = Arc::new(SqliteStore::open(&config.database.path)?);
                tracing::info!(path = %config.database.path.display(), "Opened SQLite database");
                Self::new(store.clone(), store, blobs, config)
            }
        };
        Ok(state)
    }

    /// Everything in memory, default configuration
    #[must_use]
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(
            store.clone(),
            store,
            Arc::new(MemoryBlobStore::default()),
            ServerConfig::default(),
        )
    }
}
