//! Test fixtures for repository tests.
//! Note: #[allow(dead_code)] because each test file compiles common/ separately.

use bytes::Bytes;
use courier_core::{ArtifactKind, UploadedPayload};
use courier_storage::FilesystemRepository;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// Artifact TTL used by fixture repositories.
#[allow(dead_code)]
pub const TEST_TTL: time::Duration = time::Duration::hours(1);

/// Generate deterministic test data using a seeded pseudo-random generator.
#[allow(dead_code)]
pub fn seeded_bytes(seed: u64, len: usize) -> Bytes {
    let mut data = vec![0u8; len];
    let mut state = seed;

    // Simple LCG
    for chunk in data.chunks_mut(8) {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let bytes = state.to_le_bytes();
        for (i, byte) in chunk.iter_mut().enumerate() {
            *byte = bytes[i % 8];
        }
    }

    Bytes::from(data)
}

/// A repository over a temporary directory.
#[allow(dead_code)]
pub struct TestRepository {
    pub repo: FilesystemRepository,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestRepository {
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = FilesystemRepository::new(
            temp_dir.path().join("repository"),
            ArtifactKind::Zip,
            TEST_TTL,
        )
        .await
        .expect("Failed to create repository");
        Self {
            repo,
            _temp_dir: temp_dir,
        }
    }

    pub fn path(&self, relative: &str) -> std::path::PathBuf {
        use courier_storage::ArtifactRepository;
        self.repo.root().join(relative)
    }
}

/// Build a payload for `owner/[folder/]name`.
#[allow(dead_code)]
pub fn payload(owner: &str, folder: Option<&str>, name: &str, contents: Bytes) -> UploadedPayload {
    UploadedPayload::builder()
        .part_name(name)
        .owner_id(owner)
        .application_folder(folder)
        .contents(contents)
        .build()
        .expect("Failed to build payload")
}

/// Move a file's modification time `age` into the past.
#[allow(dead_code)]
pub fn backdate(path: &Path, age: Duration) {
    let file = std::fs::File::options()
        .write(true)
        .open(path)
        .expect("Failed to open file for backdating");
    file.set_modified(SystemTime::now() - age)
        .expect("Failed to set modification time");
}
