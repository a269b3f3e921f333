//! Process configuration, loaded once from the environment.
//!
//! Everything reads `DAKA_*` variables. The struct is immutable after load
//! and handed by reference to the auth gate, store selection, and the sync
//! engine; no component re-reads the environment later.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::{Error, Result};
use crate::sync::SyncStrategy;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_DATA_PATH: &str = ".daka-data.json";
pub const DEFAULT_SYNC_DELAY_MS: u64 = 3000;

/// Deployment environment. Production tightens the session cookie and
/// refuses local file storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(Error::Config(format!(
                "unknown environment '{other}': expected development or production"
            ))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Which record store backend to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Local,
    Blob,
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "local" => Ok(StorageKind::Local),
            "blob" => Ok(StorageKind::Blob),
            other => Err(Error::Config(format!(
                "unknown storage '{other}': expected local or blob"
            ))),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Local => write!(f, "local"),
            StorageKind::Blob => write!(f, "blob"),
        }
    }
}

/// Resolved configuration for both the server and the client commands.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the server listens on (`DAKA_BIND`).
    pub bind: SocketAddr,
    /// Deployment environment (`DAKA_ENV`).
    pub env: Environment,
    /// Shared secret for the auth gate (`DAKA_PASSWORD`). Login and password
    /// verification fail with a configuration error while unset.
    pub password: Option<String>,
    /// Explicit store selection (`DAKA_STORAGE`). `None` infers blob when a
    /// token is configured, local otherwise.
    pub storage: Option<StorageKind>,
    /// Local store file (`DAKA_DATA_PATH`).
    pub data_path: PathBuf,
    /// Blob object URL (`DAKA_BLOB_URL`).
    pub blob_url: Option<String>,
    /// Blob access token (`DAKA_BLOB_TOKEN`).
    pub blob_token: Option<String>,
    /// Base URL the client commands talk to (`DAKA_SERVER_URL`).
    pub server_url: String,
    /// Client write strategy (`DAKA_SYNC_STRATEGY`).
    pub sync_strategy: SyncStrategy,
    /// Quiet window for the debounced strategy (`DAKA_SYNC_DELAY_MS`).
    pub sync_delay: Duration,
    /// Override for the client record cache file (`DAKA_CACHE_PATH`).
    pub cache_path: Option<PathBuf>,
    /// Override for the stored session file (`DAKA_SESSION_PATH`).
    pub session_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            env: Environment::Development,
            password: None,
            storage: None,
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            blob_url: None,
            blob_token: None,
            server_url: DEFAULT_SERVER_URL.to_string(),
            sync_strategy: SyncStrategy::default(),
            sync_delay: Duration::from_millis(DEFAULT_SYNC_DELAY_MS),
            cache_path: None,
            session_path: None,
        }
    }
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary lookup. Missing variables take defaults;
    /// present-but-invalid values are configuration errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(bind) = non_empty(lookup("DAKA_BIND")) {
            config.bind = bind
                .parse()
                .map_err(|_| Error::Config(format!("invalid DAKA_BIND '{bind}'")))?;
        }
        if let Some(env) = non_empty(lookup("DAKA_ENV")) {
            config.env = env.parse()?;
        }
        config.password = non_empty(lookup("DAKA_PASSWORD"));
        if config.password.is_none() {
            warn!("DAKA_PASSWORD is not set; login will fail until it is configured");
        }
        if let Some(storage) = non_empty(lookup("DAKA_STORAGE")) {
            config.storage = Some(storage.parse()?);
        }
        if let Some(path) = non_empty(lookup("DAKA_DATA_PATH")) {
            config.data_path = PathBuf::from(path);
        }
        config.blob_url = non_empty(lookup("DAKA_BLOB_URL"));
        config.blob_token = non_empty(lookup("DAKA_BLOB_TOKEN"));
        if let Some(url) = non_empty(lookup("DAKA_SERVER_URL")) {
            config.server_url = url;
        }
        if let Some(strategy) = non_empty(lookup("DAKA_SYNC_STRATEGY")) {
            config.sync_strategy = strategy
                .parse()
                .map_err(|_| Error::Config(format!("invalid DAKA_SYNC_STRATEGY '{strategy}'")))?;
        }
        if let Some(delay) = non_empty(lookup("DAKA_SYNC_DELAY_MS")) {
            let millis: u64 = delay
                .parse()
                .map_err(|_| Error::Config(format!("invalid DAKA_SYNC_DELAY_MS '{delay}'")))?;
            config.sync_delay = Duration::from_millis(millis);
        }
        config.cache_path = non_empty(lookup("DAKA_CACHE_PATH")).map(PathBuf::from);
        config.session_path = non_empty(lookup("DAKA_SESSION_PATH")).map(PathBuf::from);

        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.env == Environment::Production
    }

    /// Shared secret, or a configuration error when absent.
    pub fn require_password(&self) -> Result<&str> {
        self.password
            .as_deref()
            .ok_or_else(|| Error::Config("DAKA_PASSWORD is not set".to_string()))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
