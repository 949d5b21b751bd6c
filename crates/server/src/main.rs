//! Courier server binary.

use anyhow::{Context, Result};
use clap::Parser;
use courier_core::config::AppConfig;
use courier_server::{AppState, create_router, spawn_sweeper};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Courier - an expiring artifact transfer server
#[derive(Parser, Debug)]
#[command(name = "courierd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "COURIER_CONFIG",
        default_value = "config/courier.toml"
    )]
    config: String,
}

/// Load configuration: optional TOML file, then `COURIER_` environment variables.
fn load_config(path: &str) -> Result<AppConfig> {
    let mut figment = Figment::new();
    if std::path::Path::new(path).exists() {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::debug!("No config file found at {}, using defaults", path);
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("COURIER_").split("__"))
        .extract()
        .context("failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Courier v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    courier_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    let repository = courier_storage::from_config(&config.repository)
        .await
        .context("failed to initialize artifact repository")?;
    repository
        .health_check()
        .await
        .context("repository health check failed")?;
    tracing::info!(
        root = %repository.root().display(),
        kind = %repository.artifact_kind(),
        ttl_ms = config.repository.artifact_expiry_ms,
        "Artifact repository ready"
    );

    let sweep_interval = config.repository.sweep_interval();
    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;

    let state = AppState::new(config, repository.clone()).context("invalid configuration")?;

    let _sweeper = spawn_sweeper(repository, sweep_interval);
    tracing::info!(
        interval_secs = sweep_interval.as_secs(),
        "Artifact sweep task spawned"
    );

    let app = create_router(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
