//! Prometheus metrics for the courier server.
//!
//! The `/metrics` endpoint is unauthenticated to allow Prometheus scraping and
//! should be network-restricted to scraper IPs at the infrastructure level.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use courier_storage::SweepStats;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Transfer metrics
pub static UPLOADS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("courier_uploads_total", "Total number of artifacts saved")
        .expect("metric creation failed")
});

pub static BYTES_UPLOADED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("courier_bytes_uploaded_total", "Total bytes of saved artifacts")
        .expect("metric creation failed")
});

pub static DOWNLOADS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("courier_downloads_total", "Total number of artifacts served")
        .expect("metric creation failed")
});

pub static BYTES_DOWNLOADED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "courier_bytes_downloaded_total",
        "Total bytes of served artifacts",
    )
    .expect("metric creation failed")
});

pub static TRANSFER_ERRORS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "courier_transfer_errors_total",
            "Total failed transfers by direction and error code",
        ),
        &["direction", "code"],
    )
    .expect("metric creation failed")
});

pub static UPLOAD_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "courier_upload_duration_seconds",
            "Time taken to decode, persist and acknowledge an upload",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
    )
    .expect("metric creation failed")
});

// Sweep metrics
pub static SWEEP_RUNS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("courier_sweep_runs_total", "Total expiry sweeps completed")
        .expect("metric creation failed")
});

pub static SWEEP_FILES_DELETED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "courier_sweep_files_deleted_total",
        "Total expired artifacts deleted by the sweep",
    )
    .expect("metric creation failed")
});

pub static SWEEP_BYTES_RECLAIMED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "courier_sweep_bytes_reclaimed_total",
        "Total bytes freed by the sweep",
    )
    .expect("metric creation failed")
});

pub static SWEEP_DIRECTORIES_REMOVED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "courier_sweep_directories_removed_total",
        "Total empty directories removed by the sweep",
    )
    .expect("metric creation failed")
});

pub static SWEEP_ERRORS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "courier_sweep_errors_total",
        "Total per-item sweep failures and failed sweep passes",
    )
    .expect("metric creation failed")
});

pub static SWEEP_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "courier_sweep_duration_seconds",
            "Time taken by one expiry sweep",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0]),
    )
    .expect("metric creation failed")
});

static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(UPLOADS.clone()),
            Box::new(BYTES_UPLOADED.clone()),
            Box::new(DOWNLOADS.clone()),
            Box::new(BYTES_DOWNLOADED.clone()),
            Box::new(TRANSFER_ERRORS.clone()),
            Box::new(UPLOAD_DURATION.clone()),
            Box::new(SWEEP_RUNS.clone()),
            Box::new(SWEEP_FILES_DELETED.clone()),
            Box::new(SWEEP_BYTES_RECLAIMED.clone()),
            Box::new(SWEEP_DIRECTORIES_REMOVED.clone()),
            Box::new(SWEEP_ERRORS.clone()),
            Box::new(SWEEP_DURATION.clone()),
        ];
        for collector in collectors {
            REGISTRY
                .register(collector)
                .expect("metric registration failed");
        }
    });
}

/// Handler for the /metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Record a failed transfer.
pub fn record_transfer_error(direction: &str, code: &str) {
    TRANSFER_ERRORS.with_label_values(&[direction, code]).inc();
}

/// Record the outcome of one sweep pass.
pub fn record_sweep(stats: &SweepStats) {
    SWEEP_RUNS.inc();
    SWEEP_FILES_DELETED.inc_by(stats.files_deleted);
    SWEEP_BYTES_RECLAIMED.inc_by(stats.bytes_reclaimed);
    SWEEP_DIRECTORIES_REMOVED.inc_by(stats.directories_removed);
    SWEEP_ERRORS.inc_by(stats.errors);
}
