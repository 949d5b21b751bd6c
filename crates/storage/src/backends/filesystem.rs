//! Local filesystem artifact repository.
//!
//! Layout: `{root}/{owner}/[{folder}/]{name}`. The tree is the index; there is
//! no manifest. Reads and the expiry sweep are mutually exclusive through a
//! single read/write lock. Saves only take the per-artifact upload lock and
//! rely on temp-file + rename so readers never observe partial files.

use crate::artifact::{FileArtifact, ManagedArtifact, expired, modified_time};
use crate::error::{StorageError, StorageResult};
use crate::locks::{UploadKey, UploadLocks};
use crate::traits::{ArtifactRepository, SweepStats};
use async_trait::async_trait;
use bytes::Bytes;
use courier_core::{ArtifactIdentity, ArtifactKind, Criteria, UploadedPayload};
use std::io;
use std::path::{Component, Path, PathBuf};
use time::{Duration, OffsetDateTime};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::instrument;
use uuid::Uuid;

/// Prefix of in-flight upload files. Names with this prefix are never served.
const TEMP_PREFIX: &str = ".courier-upload.";

/// Filesystem-backed artifact repository.
pub struct FilesystemRepository {
    root: PathBuf,
    kind: ArtifactKind,
    ttl: Duration,
    tree_lock: RwLock<()>,
    upload_locks: UploadLocks,
}

impl FilesystemRepository {
    /// Create a repository rooted at `root`, creating the directory if needed.
    pub async fn new(
        root: impl AsRef<Path>,
        kind: ArtifactKind,
        ttl: Duration,
    ) -> StorageResult<Self> {
        if ttl <= Duration::ZERO {
            return Err(StorageError::Config(
                "artifact TTL must be positive".to_string(),
            ));
        }
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            kind,
            ttl,
            tree_lock: RwLock::new(()),
            upload_locks: UploadLocks::new(),
        })
    }

    pub fn upload_locks(&self) -> &UploadLocks {
        &self.upload_locks
    }

    /// Resolve a relative artifact path, with path traversal protection.
    async fn key_path(&self, relative: PathBuf) -> StorageResult<PathBuf> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || Self::key_path_sync(&root, &relative))
            .await
            .map_err(|e| StorageError::Io(io::Error::other(format!("spawn_blocking failed: {e}"))))?
    }

    /// Reject paths that would escape the repository root, including through
    /// symlinked files or ancestors.
    fn key_path_sync(root: &Path, relative: &Path) -> StorageResult<PathBuf> {
        let display = relative.display();
        if relative.as_os_str().is_empty() {
            return Err(StorageError::InvalidKey("empty path".to_string()));
        }
        for component in relative.components() {
            if !matches!(component, Component::Normal(_)) {
                return Err(StorageError::InvalidKey(format!(
                    "contains unsafe path component: {display}"
                )));
            }
        }

        let path = root.join(relative);
        let root_canonical = root.canonicalize().map_err(|e| {
            StorageError::Io(io::Error::new(
                e.kind(),
                format!("failed to canonicalize root: {e}"),
            ))
        })?;

        // Nearest existing entry (the path itself or an ancestor) must stay in root
        let mut candidate = Some(path.as_path());
        while let Some(current) = candidate {
            match std::fs::symlink_metadata(current) {
                Ok(meta) => {
                    let canonical = current.canonicalize().map_err(|e| {
                        if meta.file_type().is_symlink() {
                            StorageError::InvalidKey(format!(
                                "symlink target missing or invalid: {display}"
                            ))
                        } else {
                            StorageError::Io(io::Error::new(
                                e.kind(),
                                format!("failed to canonicalize path: {e}"),
                            ))
                        }
                    })?;
                    if !canonical.starts_with(&root_canonical) {
                        return Err(StorageError::InvalidKey(format!(
                            "resolved path escapes repository root: {display}"
                        )));
                    }
                    return Ok(path);
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(StorageError::Io(io::Error::new(
                        err.kind(),
                        format!("failed to stat path: {err}"),
                    )));
                }
            }
            if current == root {
                break;
            }
            candidate = current.parent();
        }

        Ok(path)
    }

    async fn ensure_parent(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write `data` to a unique temp file next to `path`, fsync, then rename.
    ///
    /// A concurrent sweep may prune a freshly created parent directory before
    /// the temp file lands in it; the directory is recreated once.
    async fn write_atomic(&self, path: &Path, data: &Bytes) -> StorageResult<()> {
        let temp_path = path.with_file_name(format!("{TEMP_PREFIX}{}", Uuid::new_v4()));

        let mut retried = false;
        loop {
            self.ensure_parent(path).await?;
            match write_synced(&temp_path, data).await {
                Ok(()) => break,
                Err(e) if e.kind() == io::ErrorKind::NotFound && !retried => {
                    tracing::debug!(
                        path = %path.display(),
                        "parent directory vanished during save, recreating"
                    );
                    retried = true;
                }
                Err(e) => {
                    let _ = fs::remove_file(&temp_path).await;
                    return Err(e.into());
                }
            }
        }

        if let Err(e) = fs::rename(&temp_path, path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    fn rehydrate(&self, path: &Path, meta: &std::fs::Metadata) -> StorageResult<FileArtifact> {
        FileArtifact::from_metadata(self.kind, &self.root, path, meta, self.ttl)
    }

    async fn resolve_unlocked(&self, criteria: &Criteria) -> StorageResult<FileArtifact> {
        criteria.check_segments()?;
        let relative: PathBuf = criteria.segments().iter().collect();

        let identity = ArtifactIdentity::from_relative_path(&relative)?;
        if !identity.matches(criteria) || is_temp_name(identity.name()) {
            return Err(StorageError::NotFound(criteria.to_string()));
        }

        let path = self.key_path(relative).await?;
        let meta = match fs::symlink_metadata(&path).await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Err(StorageError::NotFound(criteria.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(criteria.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let artifact = self.rehydrate(&path, &meta)?;
        if artifact.is_expired() {
            return Err(StorageError::Expired(format!(
                "{criteria} expired at {}",
                artifact.expires_at()
            )));
        }
        Ok(artifact)
    }

    /// Collect every regular file and every directory below the root.
    ///
    /// Only an unreadable root fails; unreadable subdirectories and entries
    /// are logged and counted in `stats.errors`.
    async fn walk(&self, stats: &mut SweepStats) -> StorageResult<(Vec<PathBuf>, Vec<PathBuf>)> {
        let mut files = Vec::new();
        let mut dirs = Vec::new();
        let mut stack = vec![self.root.clone()];

        while let Some(dir) = stack.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if dir == self.root => return Err(e.into()),
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "Failed to read directory during sweep");
                    stats.errors += 1;
                    continue;
                }
            };
            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(dir = %dir.display(), error = %e, "Failed to list directory during sweep");
                        stats.errors += 1;
                        break;
                    }
                };
                let path = entry.path();
                // file_type() does not follow symlinks
                let file_type = match entry.file_type().await {
                    Ok(file_type) => file_type,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to stat entry during sweep");
                        stats.errors += 1;
                        continue;
                    }
                };
                if file_type.is_dir() {
                    dirs.push(path.clone());
                    stack.push(path);
                } else if file_type.is_file() {
                    files.push(path);
                }
                // Symlinks are left alone
            }
        }

        Ok((files, dirs))
    }

    async fn sweep_file(&self, path: &Path, now: OffsetDateTime, stats: &mut SweepStats) {
        stats.files_scanned += 1;

        let meta = match fs::symlink_metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to stat file during sweep");
                stats.errors += 1;
                return;
            }
        };

        let is_expired = match self.rehydrate(path, &meta) {
            Ok(artifact) => artifact.is_expired_at(now),
            // Stray files and abandoned temp files age out on the same TTL
            Err(_) => match modified_time(&meta) {
                Ok(modified) => expired(modified, self.ttl, now),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to read modification time");
                    stats.errors += 1;
                    return;
                }
            },
        };
        if !is_expired {
            return;
        }

        match fs::remove_file(path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Deleted expired artifact");
                stats.files_deleted += 1;
                stats.bytes_reclaimed += meta.len();
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to delete expired artifact");
                stats.errors += 1;
            }
        }
    }

    async fn prune_directory(&self, dir: &Path, stats: &mut SweepStats) {
        let is_empty = match fs::read_dir(dir).await {
            Ok(mut entries) => match entries.next_entry().await {
                Ok(next) => next.is_none(),
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "Failed to list directory");
                    stats.errors += 1;
                    return;
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => return,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Failed to open directory");
                stats.errors += 1;
                return;
            }
        };
        if !is_empty {
            return;
        }

        match fs::remove_dir(dir).await {
            Ok(()) => {
                tracing::debug!(dir = %dir.display(), "Removed empty directory");
                stats.directories_removed += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Failed to remove empty directory");
                stats.errors += 1;
            }
        }
    }
}

async fn write_synced(path: &Path, data: &Bytes) -> io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    // Flush to disk before the rename publishes the file
    file.sync_all().await
}

fn is_temp_name(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX)
}

#[async_trait]
impl ArtifactRepository for FilesystemRepository {
    #[instrument(skip(self, payload), fields(backend = "filesystem", size = payload.len()))]
    async fn save(&self, payload: &UploadedPayload) -> StorageResult<Box<dyn ManagedArtifact>> {
        if is_temp_name(payload.part_name()) {
            return Err(StorageError::InvalidKey(format!(
                "reserved file name: {}",
                payload.part_name()
            )));
        }

        let _guard = self.upload_locks.acquire(UploadKey::from(payload)).await;

        let path = self.key_path(payload.relative_path()).await?;
        self.write_atomic(&path, payload.contents()).await?;

        let meta = fs::metadata(&path).await?;
        let artifact = self.rehydrate(&path, &meta)?;
        tracing::info!(
            artifact = %payload.relative_path().display(),
            size = artifact.size(),
            "Artifact saved"
        );
        Ok(Box::new(artifact))
    }

    #[instrument(skip(self, criteria), fields(backend = "filesystem", criteria = %criteria))]
    async fn resolve(&self, criteria: &Criteria) -> StorageResult<Box<dyn ManagedArtifact>> {
        let _read = self.tree_lock.read().await;
        let artifact = self.resolve_unlocked(criteria).await?;
        // Load contents while the sweep is held off; a file removed by
        // anything else in between reads as expired.
        match artifact.contents().await {
            Ok(_) => Ok(Box::new(artifact)),
            Err(StorageError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::Expired(criteria.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, criteria), fields(backend = "filesystem", criteria = %criteria))]
    async fn is_present(&self, criteria: &Criteria) -> bool {
        let _read = self.tree_lock.read().await;
        match self.resolve_unlocked(criteria).await {
            Ok(_) => true,
            Err(StorageError::NotFound(_)) | Err(StorageError::Expired(_)) => false,
            Err(e) => {
                tracing::warn!(error = %e, "Presence check failed");
                false
            }
        }
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn sweep_at(&self, now: OffsetDateTime) -> StorageResult<SweepStats> {
        let _write = self.tree_lock.write().await;
        let mut stats = SweepStats::default();

        let (files, mut dirs) = self.walk(&mut stats).await?;

        for file in &files {
            self.sweep_file(file, now, &mut stats).await;
        }

        // Deepest first so parents empty out after their children
        dirs.sort_by_key(|dir| std::cmp::Reverse(dir.components().count()));
        for dir in &dirs {
            self.prune_directory(dir, &mut stats).await;
        }

        tracing::info!(
            files_scanned = stats.files_scanned,
            files_deleted = stats.files_deleted,
            bytes_reclaimed = stats.bytes_reclaimed,
            directories_removed = stats.directories_removed,
            errors = stats.errors,
            "Expiry sweep finished"
        );
        Ok(stats)
    }

    fn artifact_kind(&self) -> ArtifactKind {
        self.kind
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn health_check(&self) -> StorageResult<()> {
        let metadata = fs::metadata(&self.root).await.map_err(|e| {
            StorageError::Io(io::Error::new(
                e.kind(),
                format!("repository root not accessible: {e}"),
            ))
        })?;

        if !metadata.is_dir() {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("repository root is not a directory: {:?}", self.root),
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repository(dir: &Path) -> FilesystemRepository {
        FilesystemRepository::new(dir.join("repository"), ArtifactKind::Zip, Duration::hours(1))
            .await
            .unwrap()
    }

    fn payload(owner: &str, folder: Option<&str>, name: &str, data: &'static [u8]) -> UploadedPayload {
        UploadedPayload::builder()
            .part_name(name)
            .owner_id(owner)
            .application_folder(folder)
            .contents(Bytes::from_static(data))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_save_resolve_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(dir.path()).await;

        let saved = repo
            .save(&payload("alice", None, "app.apk", b"PK\x03\x04"))
            .await
            .unwrap();
        assert_eq!(saved.identity().owner_folder(), "alice");
        assert!(repo.root().join("alice/app.apk").is_file());

        let criteria = Criteria::new("app.apk", "alice", None).unwrap();
        let resolved = repo.resolve(&criteria).await.unwrap();
        assert_eq!(resolved.identity(), saved.identity());
        assert_eq!(
            resolved.contents().await.unwrap(),
            Bytes::from_static(b"PK\x03\x04")
        );
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(dir.path()).await;

        repo.save(&payload("bob", None, "t.zip", b"one")).await.unwrap();
        repo.save(&payload("bob", None, "t.zip", b"two")).await.unwrap();

        let resolved = repo
            .resolve(&Criteria::new("t.zip", "bob", None).unwrap())
            .await
            .unwrap();
        assert_eq!(resolved.contents().await.unwrap(), Bytes::from_static(b"two"));

        let leftovers: Vec<_> = std::fs::read_dir(repo.root().join("bob"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1, "no temp files should remain: {leftovers:?}");
    }

    #[tokio::test]
    async fn test_resolve_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(dir.path()).await;

        let err = repo
            .resolve(&Criteria::new("nope.zip", "alice", None).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)), "got {err:?}");
        assert!(
            !repo
                .is_present(&Criteria::new("nope.zip", "alice", None).unwrap())
                .await
        );
    }

    #[tokio::test]
    async fn test_resolve_ignores_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(dir.path()).await;

        let name = format!("{TEMP_PREFIX}abc");
        std::fs::create_dir_all(repo.root().join("alice")).unwrap();
        std::fs::write(repo.root().join("alice").join(&name), b"partial").unwrap();

        let err = repo
            .resolve(&Criteria::new(name.clone(), "alice", None).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));

        let err = repo
            .save(&payload("alice", None, ".courier-upload.x", b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(dir.path()).await;

        let err = repo
            .resolve(&Criteria::new("passwd", "..", Some("etc".into())).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Domain(_)), "got {err:?}");

        let err = repo
            .resolve(&Criteria::new("b/c", "alice", None).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Domain(_)), "got {err:?}");
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_symlink_owner_folder_rejected() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let repo = repository(dir.path()).await;

        std::fs::write(outside.path().join("secret.zip"), b"secret").unwrap();
        symlink(outside.path(), repo.root().join("mallory")).unwrap();

        let err = repo
            .resolve(&Criteria::new("secret.zip", "mallory", None).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)), "got {err:?}");

        let err = repo
            .save(&payload("mallory", Some("deep"), "x.zip", b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)), "got {err:?}");
        assert!(!outside.path().join("deep").exists());
    }

    #[tokio::test]
    async fn test_resolved_contents_survive_removal() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(dir.path()).await;
        repo.save(&payload("alice", None, "app.apk", b"loaded"))
            .await
            .unwrap();

        let criteria = Criteria::new("app.apk", "alice", None).unwrap();
        let resolved = repo.resolve(&criteria).await.unwrap();
        std::fs::remove_file(repo.root().join("alice/app.apk")).unwrap();

        assert_eq!(
            resolved.contents().await.unwrap(),
            Bytes::from_static(b"loaded")
        );
        let err = repo.resolve(&criteria).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_health_check() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(dir.path()).await;
        repo.health_check().await.unwrap();

        std::fs::remove_dir_all(repo.root()).unwrap();
        assert!(repo.health_check().await.is_err());
    }

    #[tokio::test]
    async fn test_zero_ttl_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = FilesystemRepository::new(dir.path(), ArtifactKind::Zip, Duration::ZERO).await;
        assert!(matches!(result, Err(StorageError::Config(_))));
    }
}
