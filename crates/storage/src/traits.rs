//! Repository trait definitions.

use crate::artifact::ManagedArtifact;
use crate::error::StorageResult;
use async_trait::async_trait;
use courier_core::{ArtifactKind, Criteria, UploadedPayload};
use serde::Serialize;
use std::path::Path;
use time::OffsetDateTime;

/// Result of one expiry sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SweepStats {
    /// Regular files inspected.
    pub files_scanned: u64,
    /// Expired files deleted.
    pub files_deleted: u64,
    /// Bytes freed by deleted files.
    pub bytes_reclaimed: u64,
    /// Empty directories removed.
    pub directories_removed: u64,
    /// Per-item failures. The sweep continues past each one.
    pub errors: u64,
}

/// Backing store for uploaded artifacts.
#[async_trait]
pub trait ArtifactRepository: Send + Sync {
    /// Persist `payload`, replacing any artifact with the same identity.
    async fn save(&self, payload: &UploadedPayload) -> StorageResult<Box<dyn ManagedArtifact>>;

    /// Find the artifact addressed by `criteria`.
    ///
    /// Fails with `NotFound` when nothing matches and `Expired` when the match
    /// has outlived its TTL.
    async fn resolve(&self, criteria: &Criteria) -> StorageResult<Box<dyn ManagedArtifact>>;

    /// Whether `criteria` resolves to a live artifact.
    async fn is_present(&self, criteria: &Criteria) -> bool;

    /// Delete expired artifacts as of `now`, then prune empty directories.
    async fn sweep_at(&self, now: OffsetDateTime) -> StorageResult<SweepStats>;

    async fn sweep(&self) -> StorageResult<SweepStats> {
        self.sweep_at(OffsetDateTime::now_utc()).await
    }

    /// Kind used to instantiate every artifact view.
    fn artifact_kind(&self) -> ArtifactKind;

    /// Repository root directory.
    fn root(&self) -> &Path;

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;

    /// Verify the repository is reachable.
    async fn health_check(&self) -> StorageResult<()>;
}
