//! Artifact repository for courier.
//!
//! This crate provides:
//! - Artifact views with lazy, cached contents and TTL-based expiry
//! - Per-artifact upload locks
//! - A filesystem repository with atomic writes and a background-safe sweep

pub mod artifact;
pub mod backends;
pub mod error;
pub mod locks;
pub mod traits;

pub use artifact::{FileArtifact, ManagedArtifact};
pub use backends::filesystem::FilesystemRepository;
pub use error::{StorageError, StorageResult};
pub use locks::{UploadGuard, UploadKey, UploadLocks};
pub use traits::{ArtifactRepository, SweepStats};

use courier_core::config::RepositoryConfig;
use std::sync::Arc;

/// Create the artifact repository from configuration.
pub async fn from_config(config: &RepositoryConfig) -> StorageResult<Arc<dyn ArtifactRepository>> {
    config.validate().map_err(StorageError::Config)?;

    let kind = config
        .artifact_kind()
        .map_err(|e| StorageError::Config(e.to_string()))?;
    let repository = FilesystemRepository::new(config.root(), kind, config.artifact_ttl()).await?;
    Ok(Arc::new(repository))
}
