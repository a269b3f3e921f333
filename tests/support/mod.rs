use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use daka::config::Config;
use daka::error::{Error, Result};
use daka::records::RecordMap;
use daka::server::{router, AppState};
use daka::store::{FileStore, RecordStore};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const TEST_PASSWORD: &str = "open sesame";

/// Real server on an ephemeral port, backed by a file store in a tempdir.
pub struct TestServer {
    addr: SocketAddr,
    dir: TempDir,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn spawn() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let store: Arc<dyn RecordStore> = Arc::new(FileStore::new(dir.path().join("data.json")));
        let config = Config {
            password: Some(TEST_PASSWORD.to_string()),
            ..Config::default()
        };
        Self::spawn_configured(dir, config, store).await
    }

    pub async fn spawn_configured(
        dir: TempDir,
        config: Config,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        let app = router(AppState {
            config: Arc::new(config),
            store,
        });
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind test listener");
        let addr = listener.local_addr().expect("listener has no local addr");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        TestServer { addr, dir, handle }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    pub fn data_path(&self) -> PathBuf {
        self.dir.path().join("data.json")
    }

    /// A scratch path inside the server's tempdir, for session and cache files.
    pub fn scratch_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Store whose operations always fail, for driving storage errors through
/// the handlers.
pub struct FailStore;

#[async_trait]
impl RecordStore for FailStore {
    async fn read(&self) -> Result<RecordMap> {
        Err(Error::Storage("blob read: status 503".to_string()))
    }

    async fn write(&self, _records: &RecordMap) -> Result<RecordMap> {
        Err(Error::Storage("blob write: status 503".to_string()))
    }

    fn backend_tag(&self) -> &'static str {
        "failing"
    }
}

/// Log in with the test password and return the bare `name=value` cookie pair.
pub async fn login_cookie(server: &TestServer) -> String {
    let client = reqwest::Client::new();
    let response = client
        .post(server.url("/auth"))
        .json(&serde_json::json!({ "password": TEST_PASSWORD }))
        .send()
        .await
        .expect("login request failed");
    assert_eq!(response.status(), 200);
    response
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .expect("login response set no session cookie")
        .to_string()
}
