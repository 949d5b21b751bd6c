//! Integration tests for health, metrics and the expiry sweep.

mod common;

use axum::http::StatusCode;
use common::{TestServer, backdate};
use courier_server::sweeper::run_sweep;
use std::time::Duration;

#[tokio::test]
async fn health_reports_ok() {
    let server = TestServer::new().await;

    let response = server.get("/v1/health").await;

    assert_eq!(response.status, StatusCode::OK);
    let json = response.json();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["backend"], "filesystem");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn metrics_endpoint_serves_prometheus_text() {
    courier_server::metrics::register_metrics();
    let server = TestServer::new().await;
    server
        .upload_raw("alice", None, "m.zip", "data", None)
        .await;

    let response = server.get("/metrics").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text().contains("courier_uploads_total"));
}

#[tokio::test]
async fn metrics_endpoint_can_be_disabled() {
    let server = TestServer::with_config(|config| {
        config.server.metrics_enabled = false;
    })
    .await;

    let response = server.get("/metrics").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sweep_removes_expired_artifacts_and_empty_owner() {
    let server = TestServer::new().await;
    server
        .upload_raw("alice", None, "old.zip", "stale", None)
        .await;
    server
        .upload_raw("bob", None, "fresh.zip", "live", None)
        .await;
    backdate(
        &server.artifact_path("alice/old.zip"),
        Duration::from_secs(48 * 60 * 60),
    );

    let stats = run_sweep(server.state.repository.as_ref()).await.unwrap();

    assert_eq!(stats.files_deleted, 1);
    assert!(!server.artifact_path("alice").exists());
    assert!(server.artifact_path("bob/fresh.zip").exists());
    assert_eq!(
        server.get("/transfer/alice/old.zip").await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        server.get("/transfer/bob/fresh.zip").await.status,
        StatusCode::OK
    );
}
