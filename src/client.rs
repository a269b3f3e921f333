//! HTTP transport for the sync engine, plus session persistence.
//!
//! The login response's `Set-Cookie` marker is captured (name=value only,
//! attributes stripped) and replayed on every request. It is persisted to a
//! small file so separate CLI invocations stay logged in.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use directories::ProjectDirs;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::records::{DayRecord, RecordMap, TaskKey};
use crate::sync::{RecordsApi, ToggleOutcome};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecordsBody {
    #[serde(default)]
    records: RecordMap,
}

#[derive(Debug, Deserialize)]
struct ToggleBody {
    record: DayRecord,
    records: RecordMap,
}

/// Client for the daka server.
pub struct HttpApi {
    base_url: String,
    client: Client,
    session_path: Option<PathBuf>,
    session: Mutex<Option<String>>,
}

impl HttpApi {
    /// Build a client. A stored session at `session_path`, when present, is
    /// loaded so earlier logins carry over.
    pub fn new(base_url: impl Into<String>, session_path: Option<PathBuf>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let session = session_path.as_deref().and_then(load_session);
        HttpApi {
            base_url,
            client: Client::new(),
            session_path,
            session: Mutex::new(session),
        }
    }

    /// Platform data location for the session file, `None` when no home
    /// directory exists.
    pub fn default_session_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "daka").map(|dirs| dirs.data_local_dir().join("session"))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut request = self.client.request(method, self.url(path));
        let session = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(cookie) = session {
            request = request.header(COOKIE, cookie);
        }
        request
    }

    /// Send and map the status: 2xx passes through, 401 is an auth failure,
    /// 400 surfaces the server's validation message, anything else is a
    /// storage-side failure. Transport trouble is a network error.
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|err| Error::Network(err.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        match status {
            StatusCode::UNAUTHORIZED => Err(Error::Unauthorized),
            StatusCode::BAD_REQUEST => Err(Error::Validation(error_message(response).await)),
            _ => Err(Error::Storage(error_message(response).await)),
        }
    }

    /// Exchange the password for a session cookie and store it.
    pub async fn login(&self, password: &str) -> Result<()> {
        let request = self
            .client
            .post(self.url("/auth"))
            .json(&serde_json::json!({ "password": password }));
        let response = self.send(request).await?;

        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(str::to_string)
            .ok_or_else(|| {
                Error::Network("login response did not set a session cookie".to_string())
            })?;
        self.store_session(cookie)?;
        debug!("session stored");
        Ok(())
    }

    /// Whether the stored session is still accepted.
    pub async fn check(&self) -> Result<bool> {
        match self.send(self.request(Method::GET, "/auth/check")).await {
            Ok(_) => Ok(true),
            Err(Error::Unauthorized) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Tell the server to expire the cookie and drop the stored session.
    pub async fn logout(&self) -> Result<()> {
        self.send(self.request(Method::POST, "/auth/logout")).await?;
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = None;
        if let Some(path) = &self.session_path {
            let _ = fs::remove_file(path);
        }
        Ok(())
    }

    fn store_session(&self, cookie: String) -> Result<()> {
        if let Some(path) = &self.session_path {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(path, &cookie)?;
        }
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(cookie);
        Ok(())
    }
}

#[async_trait]
impl RecordsApi for HttpApi {
    async fn fetch_records(&self) -> Result<RecordMap> {
        let response = self.send(self.request(Method::GET, "/records")).await?;
        let body: RecordsBody = response
            .json()
            .await
            .map_err(|err| Error::Network(format!("invalid records response: {err}")))?;
        Ok(body.records)
    }

    async fn put_records(&self, records: &RecordMap) -> Result<RecordMap> {
        let request = self
            .request(Method::PUT, "/records")
            .json(&serde_json::json!({ "records": records }));
        let response = self.send(request).await?;
        let body: RecordsBody = response
            .json()
            .await
            .map_err(|err| Error::Network(format!("invalid records response: {err}")))?;
        Ok(body.records)
    }

    async fn toggle_record(
        &self,
        date: &str,
        task: TaskKey,
        value: Option<bool>,
    ) -> Result<ToggleOutcome> {
        let mut payload = serde_json::json!({ "date": date, "task": task });
        if let Some(value) = value {
            payload["value"] = value.into();
        }
        let request = self.request(Method::POST, "/records").json(&payload);
        let response = self.send(request).await?;
        let body: ToggleBody = response
            .json()
            .await
            .map_err(|err| Error::Network(format!("invalid toggle response: {err}")))?;
        Ok(ToggleOutcome {
            record: body.record,
            records: body.records,
        })
    }
}

async fn error_message(response: Response) -> String {
    let status = response.status();
    match response.json::<ErrorBody>().await {
        Ok(ErrorBody { error: Some(message) }) => message,
        _ => format!("server returned {status}"),
    }
}

fn load_session(path: &Path) -> Option<String> {
    let raw = fs::read_to_string(path).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
