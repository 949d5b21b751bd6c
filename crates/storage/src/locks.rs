//! Per-artifact upload locks.
//!
//! Saves that target the same `(owner, folder, name)` are serialized; saves to
//! different artifacts never wait on each other. Entries are dropped from the
//! table once the last holder or waiter releases them.

use courier_core::UploadedPayload;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

type LockTable = HashMap<UploadKey, Arc<tokio::sync::Mutex<()>>>;

/// Logical identity of an upload.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UploadKey {
    pub owner_id: String,
    pub application_folder: Option<String>,
    pub artifact_name: String,
}

impl UploadKey {
    pub fn new(
        owner_id: impl Into<String>,
        application_folder: Option<String>,
        artifact_name: impl Into<String>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            application_folder,
            artifact_name: artifact_name.into(),
        }
    }
}

impl From<&UploadedPayload> for UploadKey {
    fn from(payload: &UploadedPayload) -> Self {
        Self::new(
            payload.owner_id(),
            payload.application_folder().map(str::to_string),
            payload.part_name(),
        )
    }
}

/// Keyed lock table.
#[derive(Clone, Default)]
pub struct UploadLocks {
    table: Arc<Mutex<LockTable>>,
}

impl UploadLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn acquire(&self, key: UploadKey) -> UploadGuard {
        let lock = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            table.entry(key.clone()).or_default().clone()
        };
        let guard = lock.lock_owned().await;
        UploadGuard {
            key,
            guard: Some(guard),
            table: self.table.clone(),
        }
    }

    /// Number of keys currently held or awaited.
    pub fn active(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Held upload lock. Releases on drop.
pub struct UploadGuard {
    key: UploadKey,
    guard: Option<OwnedMutexGuard<()>>,
    table: Arc<Mutex<LockTable>>,
}

impl UploadGuard {
    pub fn key(&self) -> &UploadKey {
        &self.key
    }
}

impl Drop for UploadGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the table's own reference left: nobody holds or waits on it
        if table
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            table.remove(&self.key);
        }
    }
}
