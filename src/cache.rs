//! Client-side mirror of the last known-good record map.
//!
//! Purely advisory: it pre-populates the sync engine before the first fetch
//! and is overwritten whenever the server confirms a state. The server copy
//! always wins; a missing or broken cache only costs a blank first paint.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::records::RecordMap;

/// Bumped whenever the persisted layout changes; anything else on disk is
/// discarded rather than migrated.
pub const CACHE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope {
    version: u32,
    records: RecordMap,
    /// Write time in unix milliseconds, for debugging stale caches.
    timestamp: i64,
}

#[derive(Debug, Clone)]
pub struct RecordCache {
    path: PathBuf,
}

impl RecordCache {
    pub fn new(path: PathBuf) -> Self {
        RecordCache { path }
    }

    /// Platform cache location, `None` when no home directory exists.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "daka").map(|dirs| dirs.cache_dir().join("records.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached mapping, if present and current. A stale version or an
    /// unreadable envelope is deleted and reported as no cache.
    pub fn load(&self) -> Option<RecordMap> {
        let raw = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<CacheEnvelope>(&raw) {
            Ok(envelope) if envelope.version == CACHE_VERSION => Some(envelope.records),
            Ok(envelope) => {
                debug!(
                    found = envelope.version,
                    expected = CACHE_VERSION,
                    "discarding cache with stale version"
                );
                self.clear();
                None
            }
            Err(err) => {
                debug!(%err, "discarding unreadable cache");
                self.clear();
                None
            }
        }
    }

    /// Best-effort write; failures are logged and swallowed.
    pub fn save(&self, records: &RecordMap) {
        let envelope = CacheEnvelope {
            version: CACHE_VERSION,
            records: records.clone(),
            timestamp: Utc::now().timestamp_millis(),
        };
        if let Err(err) = self.try_save(&envelope) {
            warn!(path = %self.path.display(), %err, "failed to cache records");
        }
    }

    fn try_save(&self, envelope: &CacheEnvelope) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string(envelope)?)?;
        Ok(())
    }

    pub fn clear(&self) {
        let _ = fs::remove_file(&self.path);
    }
}
