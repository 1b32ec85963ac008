//! Server configuration
//!
//! Layered: built-in defaults, then an optional TOML file, then `DYCETIX_*`
//! environment variables. The binary applies its command-line flags last.

use dycetix_service::{DEFAULT_MAX_FILES, DEFAULT_MAX_FILE_BYTES, DEFAULT_SESSION_TTL_HOURS};
use dycetix_store::DEFAULT_MEDIA_URL;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Default listen address
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

/// Default log filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=info";

/// Environment variables read by [`ServerConfig::apply_env`]
pub const ENV_BIND: &str = "DYCETIX_BIND";
pub const ENV_DATABASE_PATH: &str = "DYCETIX_DATABASE_PATH";
pub const ENV_MEDIA_ROOT: &str = "DYCETIX_MEDIA_ROOT";
pub const ENV_MEDIA_URL: &str = "DYCETIX_MEDIA_URL";
pub const ENV_LOG: &str = "DYCETIX_LOG";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("failed to install log subscriber: {0}")]
    Logging(String),
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Which requirement/admin store backs the server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseBackend {
    /// Process memory; lost on restart
    #[default]
    Memory,
    /// SQLite file at `database.path`
    Sqlite,
}

impl DatabaseBackend {
    /// Whether data outlives the process; CLI-issued sessions need this
    #[inline]
    #[must_use]
    pub fn is_persistent(self) -> bool {
        matches!(self, Self::Sqlite)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::Memory,
            path: PathBuf::from("data/dycetix.db"),
        }
    }
}

/// Where uploaded files go; no root means in-memory blobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub root: Option<PathBuf>,
    pub base_url: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: None,
            base_url: DEFAULT_MEDIA_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    pub max_files: usize,
    pub max_file_bytes: u64,
    /// Cap on the whole request body
    pub max_body_bytes: usize,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        // every file at its cap, base64-inflated, plus room for the form
        let files = DEFAULT_MAX_FILES as u64 * DEFAULT_MAX_FILE_BYTES * 4 / 3;
        Self {
            max_files: DEFAULT_MAX_FILES,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_body_bytes: usize::try_from(files).unwrap_or(usize::MAX / 2) + 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub ttl_hours: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_hours: DEFAULT_SESSION_TTL_HOURS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` wins when set
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            json: false,
        }
    }
}

/// Complete server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub database: DatabaseConfig,
    pub media: MediaConfig,
    pub intake: IntakeConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            database: DatabaseConfig::default(),
            media: MediaConfig::default(),
            intake: IntakeConfig::default(),
            session: SessionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults, then `path` if given, then the process environment
    ///
    /// # Errors
    /// `Read`/`Parse` for a bad file, `Invalid` for bad values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file; missing keys keep their defaults
    ///
    /// # Errors
    /// `Read` when the file cannot be read, `Parse` when it is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// `Parse` when the text is not valid TOML for this shape.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `DYCETIX_*` overrides read through `lookup`
    ///
    /// Setting a database path switches the backend to SQLite.
    #[must_use]
    pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(bind) = lookup(ENV_BIND) {
            self.bind = bind;
        }
        if let Some(path) = lookup(ENV_DATABASE_PATH) {
            self.database.backend = DatabaseBackend::Sqlite;
            self.database.path = PathBuf::from(path);
        }
        if let Some(root) = lookup(ENV_MEDIA_ROOT) {
            self.media.root = Some(PathBuf::from(root));
        }
        if let Some(url) = lookup(ENV_MEDIA_URL) {
            self.media.base_url = url;
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.logging.filter = filter;
        }
        self
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    /// `Invalid` naming the first bad key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;
        if self.intake.max_files == 0 {
            return Err(ConfigError::invalid("intake.max_files", "must be at least 1"));
        }
        if self.intake.max_file_bytes == 0 {
            return Err(ConfigError::invalid("intake.max_file_bytes", "must be at least 1"));
        }
        if self.session.ttl_hours <= 0 {
            return Err(ConfigError::invalid("session.ttl_hours", "must be positive"));
        }
        if self.media.base_url.trim().is_empty() {
            return Err(ConfigError::invalid("media.base_url", "must not be empty"));
        }
        Ok(())
    }

    /// Parsed listen address
    ///
    /// # Errors
    /// `Invalid` when `bind` is not `host:port`.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|err: std::net::AddrParseError| ConfigError::invalid("bind", err.to_string()))
    }

    /// With listen address
    #[inline]
    #[must_use]
    pub fn with_bind(mut self, bind: impl Into<String>) -> Self {
        self.bind = bind.into();
        self
    }

    /// With a SQLite database at `path`
    #[inline]
    #[must_use]
    pub fn with_sqlite(mut self, path: impl Into<PathBuf>) -> Self {
        self.database.backend = DatabaseBackend::Sqlite;
        self.database.path = path.into();
        self
    }

    /// With filesystem media under `root`
    #[inline]
    #[must_use]
    pub fn with_media_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.media.root = Some(root.into());
        self
    }

    /// With intake limits
    #[inline]
    #[must_use]
    pub fn with_intake(mut self, intake: IntakeConfig) -> Self {
        self.intake = intake;
        self
    }
}
