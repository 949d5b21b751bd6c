//! Server test utilities.

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use bytes::Bytes;
use courier_core::config::AppConfig;
use courier_server::{AppState, create_router};
use std::path::PathBuf;
use tempfile::TempDir;
use tower::ServiceExt;

/// Base URL the test configuration renders upload URLs with.
#[allow(dead_code)]
pub const BASE_URL: &str = "http://courier.test";

/// A response with its body collected.
#[allow(dead_code)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[allow(dead_code)]
impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).expect("response body is not UTF-8")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with a temporary repository.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server, adjusting the test configuration first.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let mut config = AppConfig::for_testing(temp_dir.path());
        adjust(&mut config);

        let repository = courier_storage::from_config(&config.repository)
            .await
            .expect("Failed to create repository");
        let state = AppState::new(config, repository).expect("Failed to create state");
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Path of a stored artifact, relative to the repository root.
    pub fn artifact_path(&self, relative: &str) -> PathBuf {
        self.state.repository.root().join(relative)
    }

    /// Send a request and collect the response.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Upload `contents` as a raw body with metadata headers. `accept`
    /// defaults to `application/json`.
    pub async fn upload_raw(
        &self,
        owner: &str,
        folder: Option<&str>,
        name: &str,
        contents: impl Into<Body>,
        accept: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/transfer")
            .header("Content-Type", "application/octet-stream")
            .header("fileName", name)
            .header("userId", owner);
        if let Some(folder) = folder {
            builder = builder.header("applicationFolder", folder);
        }
        builder = builder.header("Accept", accept.unwrap_or("application/json"));
        self.send(builder.body(contents.into()).unwrap()).await
    }

    /// Upload a multipart form. `accept` defaults to `application/json`.
    pub async fn upload_multipart(&self, body: Vec<u8>, accept: Option<&str>) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/transfer")
            .header("Content-Type", super::fixtures::multipart_content_type());
        builder = builder.header("Accept", accept.unwrap_or("application/json"));
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    /// GET a path or absolute URL under [`BASE_URL`].
    pub async fn get(&self, path_or_url: &str) -> TestResponse {
        self.request("GET", path_or_url).await
    }

    /// HEAD a path or absolute URL under [`BASE_URL`].
    pub async fn head(&self, path_or_url: &str) -> TestResponse {
        self.request("HEAD", path_or_url).await
    }

    async fn request(&self, method: &str, path_or_url: &str) -> TestResponse {
        let path = path_or_url.strip_prefix(BASE_URL).unwrap_or(path_or_url);
        let request = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }
}
