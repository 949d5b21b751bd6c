//! Artifact upload and download endpoints.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;
use crate::transfer::{
    DownloadResponder, ResponseFormat, TransferContext, UploadPipeline, UploadResponder,
    parse_download_path, processor_for,
};
use axum::extract::{Request, State};
use axum::http::{StatusCode, Uri};
use axum::response::Response;
use tracing::{info, warn};

fn record_failure(direction: &'static str, err: &ApiError) {
    if err.status_code().is_server_error() {
        tracing::error!(direction, code = err.code(), error = %err, "transfer failed");
    } else {
        warn!(direction, code = err.code(), error = %err, "transfer rejected");
    }
    metrics::record_transfer_error(direction, err.code());
}

/// POST /{mount}
///
/// Accepts a raw body (metadata in headers) or a multipart form with one file
/// part, saves it, and answers with its download URL.
#[tracing::instrument(skip_all, fields(uri = %request.uri()))]
pub async fn upload_artifact(State(state): State<AppState>, request: Request) -> ApiResult<Response> {
    let timer = metrics::UPLOAD_DURATION.start_timer();
    let result = upload(&state, request).await;
    match &result {
        Ok(_) => timer.observe_duration(),
        Err(err) => {
            timer.stop_and_discard();
            record_failure("upload", err);
        }
    }
    result
}

async fn upload(state: &AppState, request: Request) -> ApiResult<Response> {
    // Pick the rendering before touching the body so a refused Accept saves nothing.
    let format = ResponseFormat::negotiate(request.headers())?;
    let responder = UploadResponder::new(format);

    let mut ctx = TransferContext::new(state, request.method(), request.uri(), request.headers());
    let processor = processor_for(request).await?;
    let mut pipeline = UploadPipeline::new(processor, state.repository.clone());

    let artifacts = pipeline.uploaded_data(&mut ctx).await?;
    let response = responder.respond(&ctx, artifacts)?;

    for artifact in artifacts {
        metrics::UPLOADS.inc();
        metrics::BYTES_UPLOADED.inc_by(artifact.size());
        info!(
            artifact = %artifact.identity().relative_path().display(),
            size = artifact.size(),
            "artifact uploaded"
        );
    }
    Ok(response)
}

/// GET /{mount}/{owner}[/{folder}]/{name}
#[tracing::instrument(skip_all, fields(uri = %uri))]
pub async fn download_artifact(State(state): State<AppState>, uri: Uri) -> ApiResult<Response> {
    let result = download(&state, &uri).await;
    if let Err(err) = &result {
        record_failure("download", err);
    }
    result
}

async fn download(state: &AppState, uri: &Uri) -> ApiResult<Response> {
    let criteria = parse_download_path(uri.path())?;
    let artifact = state.repository.resolve(&criteria).await?;
    let response = DownloadResponder.respond(artifact.as_ref()).await?;

    metrics::DOWNLOADS.inc();
    metrics::BYTES_DOWNLOADED.inc_by(artifact.size());
    info!(artifact = %criteria, size = artifact.size(), "artifact served");
    Ok(response)
}

/// HEAD /{mount}/{owner}[/{folder}]/{name}
///
/// 200 when a live artifact exists, 404 otherwise.
pub async fn probe_artifact(State(state): State<AppState>, uri: Uri) -> ApiResult<StatusCode> {
    let criteria = parse_download_path(uri.path())?;
    if state.repository.is_present(&criteria).await {
        Ok(StatusCode::OK)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}
