//! SnapshotBridge: non-fatal async load/save around a [`SnapshotStore`]

use super::model::{SaveReceipt, Snapshot};
use super::store::{SnapshotStore, StorageError, StorageResult};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Result of a save request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(SaveReceipt),
    /// A save for the same workspace was already running; this one was dropped
    Busy,
    Failed(String),
}

/// Runs store calls on the blocking pool and never lets a storage failure
/// reach the caller as an error.
///
/// Saves are dropped, not queued, while another save for the same workspace
/// is in progress: the next save captures the newer state anyway.
pub struct SnapshotBridge {
    store: Arc<dyn SnapshotStore>,
    saving: Arc<Mutex<HashSet<String>>>,
}

/// Clears a workspace's busy flag when the save finishes, however it finishes
struct SavingGuard {
    saving: Arc<Mutex<HashSet<String>>>,
    workspace_key: String,
}

impl Drop for SavingGuard {
    fn drop(&mut self) {
        if let Ok(mut saving) = self.saving.lock() {
            saving.remove(&self.workspace_key);
        }
    }
}

impl SnapshotBridge {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            store,
            saving: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// The saved snapshot, or `None` if there is none or it could not be read
    pub async fn load(&self, workspace_key: &str) -> Option<Snapshot> {
        let store = self.store.clone();
        let key = workspace_key.to_string();
        match blocking(move || store.load(&key)).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(workspace = %workspace_key, error = %e, "snapshot load failed");
                None
            }
        }
    }

    /// Save `snapshot` under its own workspace key
    pub async fn save(&self, snapshot: &Snapshot) -> SaveOutcome {
        let workspace_key = snapshot.workspace_key.clone();
        let Some(_guard) = self.begin_save(&workspace_key) else {
            tracing::debug!(workspace = %workspace_key, "save already in progress; dropping");
            return SaveOutcome::Busy;
        };

        let store = self.store.clone();
        let key = workspace_key.clone();
        let snapshot = snapshot.clone();
        match blocking(move || store.save(&key, &snapshot)).await {
            Ok(receipt) => {
                tracing::debug!(
                    workspace = %workspace_key,
                    etag = %receipt.etag,
                    size = receipt.size,
                    "snapshot saved"
                );
                SaveOutcome::Saved(receipt)
            }
            Err(e) => {
                tracing::warn!(workspace = %workspace_key, error = %e, "snapshot save failed");
                SaveOutcome::Failed(e.to_string())
            }
        }
    }

    pub fn is_saving(&self, workspace_key: &str) -> bool {
        self.saving
            .lock()
            .map(|saving| saving.contains(workspace_key))
            .unwrap_or(false)
    }

    fn begin_save(&self, workspace_key: &str) -> Option<SavingGuard> {
        let mut saving = self.saving.lock().ok()?;
        if !saving.insert(workspace_key.to_string()) {
            return None;
        }
        Some(SavingGuard {
            saving: self.saving.clone(),
            workspace_key: workspace_key.to_string(),
        })
    }
}

async fn blocking<T, F>(f: F) -> StorageResult<T>
where
    F: FnOnce() -> StorageResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StorageError::Task(e.to_string()))?
}
