//! Test helpers: build the app on temp directories and a mock DAM server.
//!
//! Run from workspace root: `cargo test -p ibc-api`.

use axum_test::{TestRequest, TestServer};
use ibc_api::constants::UPLOAD_PATH;
use ibc_api::setup::initialize_app;
use ibc_api::state::AppState;
use ibc_core::IbcConfig;
use ibc_infra::{NonceService, SESSION_COOKIE, UPLOAD_NONCE_ACTION};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub const UPLOADS_URL: &str = "http://localhost:3000/uploads";
pub const TEST_NONCE_SECRET: &str = "integration-test-nonce-secret";
pub const TEST_ACCESS_KEY: &str = "test-access-key-at-least-32-characters-long";

/// Test application: server, state, and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub dam: mockito::ServerGuard,
    /// Session of the simulated CMS user
    pub session: String,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Upload nonce bound to [`TestApp::session`]
    pub fn nonce(&self) -> String {
        self.state.nonces.create(UPLOAD_NONCE_ACTION, &self.session)
    }

    /// Upload request carrying the session cookie, as the CMS page sends it
    pub fn upload(&self) -> TestRequest {
        self.server
            .post(UPLOAD_PATH)
            .add_header("cookie", session_cookie(&self.session))
    }

    /// Absolute URL of `path` on the mock DAM
    pub fn dam_url(&self, path: &str) -> String {
        format!("{}{}", self.dam.url(), path)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.state.config.temp_dir.clone()
    }

    pub fn staged_files(&self) -> usize {
        std::fs::read_dir(self.staging_dir()).unwrap().count()
    }

    /// Contents of the diagnostic log, empty if it was never written
    pub fn log_contents(&self) -> String {
        std::fs::read_to_string(self.state.config.log_file_path()).unwrap_or_default()
    }

    /// Serve `body` from the mock DAM at `path` with status 200
    pub async fn serve_asset(&mut self, path: &str, body: &[u8]) -> mockito::Mock {
        self.dam
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "application/octet-stream")
            .with_body(body)
            .create_async()
            .await
    }
}

pub fn test_config(temp_dir: &TempDir) -> IbcConfig {
    IbcConfig {
        server_port: 0,
        environment: "test".to_string(),
        cors_origins: vec!["*".to_string()],
        uploads_dir: temp_dir.path().join("uploads"),
        uploads_url: UPLOADS_URL.to_string(),
        temp_dir: temp_dir.path().join("tmp"),
        nonce_secret: TEST_NONCE_SECRET.to_string(),
        nonce_lifetime_secs: 86_400,
        download_timeout_secs: 10,
        dam_url: "https://dam.example.com".to_string(),
        log_enabled: true,
        access_key: TEST_ACCESS_KEY.to_string(),
        // the mock DAM listens on loopback
        download_allowed_hosts: Some(vec!["127.0.0.1".to_string()]),
        download_allow_private: true,
    }
}

/// Setup test app with its own uploads, staging and log directories.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}).await
}

pub async fn setup_test_app_with(customize: impl FnOnce(&mut IbcConfig)) -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = test_config(&temp_dir);
    customize(&mut config);

    let (state, router) = initialize_app(config)
        .await
        .expect("Failed to initialize app");
    let server = TestServer::new(router.into_make_service()).expect("Failed to create test server");
    let dam = mockito::Server::new_async().await;

    TestApp {
        server,
        state,
        dam,
        session: NonceService::new_session(),
        _temp_dir: temp_dir,
    }
}

/// `Cookie` header value carrying `session`
pub fn session_cookie(session: &str) -> String {
    format!("{}={}", SESSION_COOKIE, session)
}

pub fn bearer(key: &str) -> String {
    format!("Bearer {}", key)
}

/// Upload payload as the browser UI posts it
pub fn upload_body(nonce: &str, data: Value) -> Value {
    json!({
        "action": "ibc_upload",
        "_ajax_nonce": nonce,
        "data": data,
    })
}

pub fn asset_data(url: &str) -> Value {
    json!({
        "url": url,
        "name": "Spring hero",
        "type": "image",
        "filename": "hero.jpg",
        "filesize": 10,
    })
}
