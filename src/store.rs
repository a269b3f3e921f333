//! Record store: one JSON document holding the full record map.
//!
//! Two interchangeable backends sit behind the same contract: a local file
//! for development and a remote blob object for deployment. Writes replace
//! the whole document; last writer wins, no merge, no concurrency check.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{Config, Environment, StorageKind};
use crate::error::{Error, Result};
use crate::records::RecordMap;

/// Persisted document shape. Wrapping the map leaves room to version the
/// document without breaking existing blobs.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    records: RecordMap,
}

/// Storage contract for the record document.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Full persisted mapping; empty if nothing has ever been written.
    async fn read(&self) -> Result<RecordMap>;

    /// Replace the whole document and echo back what was written.
    async fn write(&self, records: &RecordMap) -> Result<RecordMap>;

    /// Short backend name for logs.
    fn backend_tag(&self) -> &'static str;
}

/// Local JSON file store.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        FileStore { path }
    }
}

#[async_trait]
impl RecordStore for FileStore {
    async fn read(&self) -> Result<RecordMap> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            // A store that has never been written to is just empty.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no data file yet, starting empty");
                return Ok(RecordMap::new());
            }
            Err(err) => {
                return Err(Error::Storage(format!(
                    "read {}: {err}",
                    self.path.display()
                )));
            }
        };
        let document: StoreDocument = serde_json::from_str(&raw).map_err(|err| {
            Error::Storage(format!("parse {}: {err}", self.path.display()))
        })?;
        Ok(document.records)
    }

    async fn write(&self, records: &RecordMap) -> Result<RecordMap> {
        let document = StoreDocument {
            records: records.clone(),
        };
        let data = serde_json::to_string_pretty(&document)?;
        write_atomic(&self.path, data.as_bytes())?;
        debug!(path = %self.path.display(), dates = records.len(), "wrote data file");
        Ok(records.clone())
    }

    fn backend_tag(&self) -> &'static str {
        "local"
    }
}

/// Write via a temp file plus rename so a crash mid-write never leaves a
/// truncated document behind.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| {
                Error::Storage(format!("create {}: {err}", parent.display()))
            })?;
        }
    }
    let temp = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&temp)
            .map_err(|err| Error::Storage(format!("create {}: {err}", temp.display())))?;
        file.write_all(data)
            .map_err(|err| Error::Storage(format!("write {}: {err}", temp.display())))?;
        file.sync_all()
            .map_err(|err| Error::Storage(format!("sync {}: {err}", temp.display())))?;
    }
    fs::rename(&temp, path)
        .map_err(|err| Error::Storage(format!("rename to {}: {err}", path.display())))?;
    Ok(())
}

/// Remote blob store: a single JSON object at a fixed URL, bearer-token
/// authenticated. GET reads it, PUT replaces it.
pub struct BlobStore {
    url: String,
    token: String,
    client: reqwest::Client,
}

impl BlobStore {
    pub fn new(url: String, token: String) -> Self {
        BlobStore {
            url,
            token,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl RecordStore for BlobStore {
    async fn read(&self) -> Result<RecordMap> {
        let response = self
            .client
            .get(&self.url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|err| Error::Storage(format!("blob read: {err}")))?;

        // A blob that does not exist yet is an empty store.
        if response.status() == StatusCode::NOT_FOUND {
            debug!("no blob yet, starting empty");
            return Ok(RecordMap::new());
        }
        if !response.status().is_success() {
            return Err(Error::Storage(format!(
                "blob read: status {}",
                response.status()
            )));
        }
        let document: StoreDocument = response
            .json()
            .await
            .map_err(|err| Error::Storage(format!("blob parse: {err}")))?;
        Ok(document.records)
    }

    async fn write(&self, records: &RecordMap) -> Result<RecordMap> {
        let document = StoreDocument {
            records: records.clone(),
        };
        let response = self
            .client
            .put(&self.url)
            .bearer_auth(&self.token)
            .json(&document)
            .send()
            .await
            .map_err(|err| Error::Storage(format!("blob write: {err}")))?;

        if !response.status().is_success() {
            return Err(Error::Storage(format!(
                "blob write: status {}",
                response.status()
            )));
        }
        debug!(dates = records.len(), "wrote blob");
        Ok(records.clone())
    }

    fn backend_tag(&self) -> &'static str {
        "blob"
    }
}

/// Pick a backend from configuration. An explicit `DAKA_STORAGE` wins;
/// otherwise a configured blob token selects blob, else local. Local storage
/// outside development is refused rather than silently writing to the
/// server's working directory.
pub fn store_from_config(config: &Config) -> Result<Arc<dyn RecordStore>> {
    let kind = match config.storage {
        Some(kind) => kind,
        None if config.blob_token.is_some() => StorageKind::Blob,
        None => StorageKind::Local,
    };

    match kind {
        StorageKind::Local => {
            if config.env == Environment::Production {
                return Err(Error::Config(
                    "local file storage is not available in production; \
                     set DAKA_BLOB_URL and DAKA_BLOB_TOKEN"
                        .to_string(),
                ));
            }
            info!(path = %config.data_path.display(), "using local file store");
            Ok(Arc::new(FileStore::new(config.data_path.clone())))
        }
        StorageKind::Blob => {
            let url = config
                .blob_url
                .clone()
                .ok_or_else(|| Error::Config("DAKA_BLOB_URL is not set".to_string()))?;
            let token = config
                .blob_token
                .clone()
                .ok_or_else(|| Error::Config("DAKA_BLOB_TOKEN is not set".to_string()))?;
            info!("using blob store");
            Ok(Arc::new(BlobStore::new(url, token)))
        }
    }
}
