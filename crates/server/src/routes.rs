//! Route configuration.

use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Headroom for multipart boundaries and text fields on top of the file size.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let mount = state.config.server.mount_segment().to_string();
    let body_limit = state.max_file_size().saturating_add(MULTIPART_OVERHEAD);

    let transfer_routes = Router::new()
        .route(&format!("/{mount}"), post(handlers::upload_artifact))
        .route(
            &format!("/{mount}/{{*artifact_path}}"),
            get(handlers::download_artifact).head(handlers::probe_artifact),
        )
        .layer(DefaultBodyLimit::max(body_limit));

    let mut router = Router::new()
        .merge(transfer_routes)
        // Health check (load balancers/k8s probes)
        .route("/v1/health", get(handlers::health_check));

    // The metrics endpoint must be network-restricted to scraper IPs.
    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
