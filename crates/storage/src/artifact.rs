//! Artifact views over files in the repository tree.

use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use courier_core::{ArtifactIdentity, ArtifactKind, Criteria};
use std::fmt;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use time::{Duration, OffsetDateTime, PrimitiveDateTime};
use tokio::sync::OnceCell;

/// A stored artifact.
///
/// Views are cheap to re-derive from the tree and are never cached beyond a
/// single request.
#[async_trait]
pub trait ManagedArtifact: Send + Sync + fmt::Debug {
    fn identity(&self) -> &ArtifactIdentity;

    /// Absolute path of the backing file.
    fn path(&self) -> &Path;

    fn content_type(&self) -> &'static str;

    /// Size of the backing file in bytes.
    fn size(&self) -> u64;

    fn modified_at(&self) -> OffsetDateTime;

    fn ttl(&self) -> Duration;

    /// Artifact contents, read on first access and cached.
    async fn contents(&self) -> StorageResult<Bytes>;

    fn name(&self) -> &str {
        self.identity().name()
    }

    fn matches(&self, criteria: &Criteria) -> bool {
        self.identity().matches(criteria)
    }

    fn expires_at(&self) -> OffsetDateTime {
        self.modified_at()
            .checked_add(self.ttl())
            .unwrap_or_else(|| PrimitiveDateTime::MAX.assume_utc())
    }

    fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        expired(self.modified_at(), self.ttl(), now)
    }

    fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }
}

/// `now - modified > ttl`.
pub fn expired(modified: OffsetDateTime, ttl: Duration, now: OffsetDateTime) -> bool {
    now - modified > ttl
}

/// Modification time of a file as an `OffsetDateTime`.
pub fn modified_time(meta: &Metadata) -> StorageResult<OffsetDateTime> {
    Ok(OffsetDateTime::from(meta.modified()?))
}

/// A plain file in the repository, typed by its [`ArtifactKind`].
pub struct FileArtifact {
    kind: ArtifactKind,
    identity: ArtifactIdentity,
    path: PathBuf,
    size: u64,
    modified_at: OffsetDateTime,
    ttl: Duration,
    contents: OnceCell<Bytes>,
}

impl FileArtifact {
    /// Rehydrate the artifact stored at `path`, which must lie under `root`.
    pub fn from_metadata(
        kind: ArtifactKind,
        root: &Path,
        path: &Path,
        meta: &Metadata,
        ttl: Duration,
    ) -> StorageResult<Self> {
        let relative = path.strip_prefix(root).map_err(|_| {
            StorageError::InvalidKey(format!("{} is outside the repository", path.display()))
        })?;
        let identity = ArtifactIdentity::from_relative_path(relative)?;

        Ok(Self {
            kind,
            identity,
            path: path.to_path_buf(),
            size: meta.len(),
            modified_at: modified_time(meta)?,
            ttl,
            contents: OnceCell::new(),
        })
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }
}

impl fmt::Debug for FileArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileArtifact")
            .field("kind", &self.kind)
            .field("identity", &self.identity)
            .field("path", &self.path)
            .field("size", &self.size)
            .field("modified_at", &self.modified_at)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ManagedArtifact for FileArtifact {
    fn identity(&self) -> &ArtifactIdentity {
        &self.identity
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn content_type(&self) -> &'static str {
        self.kind.content_type()
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn modified_at(&self) -> OffsetDateTime {
        self.modified_at
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn contents(&self) -> StorageResult<Bytes> {
        let bytes = self
            .contents
            .get_or_try_init(|| async {
                let data = tokio::fs::read(&self.path).await?;
                Ok::<_, StorageError>(Bytes::from(data))
            })
            .await?;
        Ok(bytes.clone())
    }
}
