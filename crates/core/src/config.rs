//! Configuration types shared across crates.

use crate::criteria::CriteriaKind;
use crate::error::Result;
use crate::kind::ArtifactKind;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use time::Duration;

/// HTTP server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:4444").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Leading URL segment the transfer endpoints are served under.
    #[serde(default = "default_mount_path")]
    pub mount_path: String,
    /// Public URL prefix used when rendering download links, e.g.
    /// `https://grid.example.com`. Falls back to the request's Host header.
    #[serde(default)]
    pub public_base_url: Option<String>,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "127.0.0.1:4444".to_string()
}

fn default_mount_path() -> String {
    "transfer".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            mount_path: default_mount_path(),
            public_base_url: None,
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl ServerConfig {
    /// Mount path without surrounding slashes.
    pub fn mount_segment(&self) -> &str {
        self.mount_path.trim_matches('/')
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        let mount = self.mount_segment();
        if mount.is_empty() || mount.contains('/') {
            return Err(format!(
                "server.mount_path must be a single URL segment, got {:?}",
                self.mount_path
            ));
        }
        Ok(())
    }
}

/// Artifact repository configuration.
///
/// The camelCase aliases accept configuration files written for older
/// deployments of the grid transfer service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Home directory the repository lives under.
    #[serde(default = "default_home")]
    pub home: PathBuf,
    /// Repository directory name, relative to `home`.
    #[serde(default = "default_base_dir", alias = "managedArtifactBaseDir")]
    pub base_dir: PathBuf,
    /// Artifact kind to instantiate for stored files.
    #[serde(default = "default_managed_artifact", alias = "managedArtifact")]
    pub managed_artifact: String,
    /// Criteria kind used to interpret request parameters.
    #[serde(default = "default_managed_criteria", alias = "managedCriteria")]
    pub managed_criteria: String,
    /// Artifact time-to-live in milliseconds.
    #[serde(default = "default_artifact_expiry_ms", alias = "artifactExpiryInMilliSec")]
    pub artifact_expiry_ms: u64,
    /// Maximum accepted upload size in bytes.
    #[serde(default = "default_artifact_max_file_size", alias = "artifactMaxFileSize")]
    pub artifact_max_file_size: u64,
    /// Interval between expiry sweeps in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_home() -> PathBuf {
    PathBuf::from("./data")
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("repository")
}

fn default_managed_artifact() -> String {
    ArtifactKind::default().as_str().to_string()
}

fn default_managed_criteria() -> String {
    CriteriaKind::default().as_str().to_string()
}

fn default_artifact_expiry_ms() -> u64 {
    crate::DEFAULT_ARTIFACT_TTL_MS
}

fn default_artifact_max_file_size() -> u64 {
    crate::DEFAULT_MAX_FILE_SIZE
}

fn default_sweep_interval_secs() -> u64 {
    3600 // hourly
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            home: default_home(),
            base_dir: default_base_dir(),
            managed_artifact: default_managed_artifact(),
            managed_criteria: default_managed_criteria(),
            artifact_expiry_ms: default_artifact_expiry_ms(),
            artifact_max_file_size: default_artifact_max_file_size(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl RepositoryConfig {
    /// Repository root: `{home}/{base_dir}`.
    pub fn root(&self) -> PathBuf {
        self.home.join(&self.base_dir)
    }

    /// Artifact time-to-live.
    pub fn artifact_ttl(&self) -> Duration {
        // Saturate at i64::MAX to prevent overflow wrapping to negative
        let millis = i64::try_from(self.artifact_expiry_ms).unwrap_or(i64::MAX);
        Duration::milliseconds(millis)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs)
    }

    /// Maximum upload size as `usize`, saturating on 32-bit targets.
    pub fn max_file_size(&self) -> usize {
        usize::try_from(self.artifact_max_file_size).unwrap_or(usize::MAX)
    }

    pub fn artifact_kind(&self) -> Result<ArtifactKind> {
        self.managed_artifact.parse()
    }

    pub fn criteria_kind(&self) -> Result<CriteriaKind> {
        self.managed_criteria.parse()
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.artifact_expiry_ms == 0 {
            return Err("repository.artifact_expiry_ms cannot be 0".to_string());
        }
        if self.artifact_max_file_size == 0 {
            return Err("repository.artifact_max_file_size cannot be 0".to_string());
        }
        // Zero would cause tokio::time::interval to panic
        if self.sweep_interval_secs == 0 {
            return Err("repository.sweep_interval_secs cannot be 0".to_string());
        }
        if !is_plain_relative(&self.base_dir) {
            return Err(format!(
                "repository.base_dir must be a relative path without '..', got {}",
                self.base_dir.display()
            ));
        }
        self.artifact_kind().map_err(|e| e.to_string())?;
        self.criteria_kind().map_err(|e| e.to_string())?;
        Ok(())
    }
}

fn is_plain_relative(path: &Path) -> bool {
    path.components().next().is_some()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Repository configuration.
    #[serde(default)]
    pub repository: RepositoryConfig,
}

impl AppConfig {
    /// Create a test configuration rooted at `home`.
    pub fn for_testing(home: impl Into<PathBuf>) -> Self {
        Self {
            server: ServerConfig {
                public_base_url: Some("http://courier.test".to_string()),
                ..Default::default()
            },
            repository: RepositoryConfig {
                home: home.into(),
                ..Default::default()
            },
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        self.server.validate()?;
        self.repository.validate()
    }
}
