//! Snapshot storage backends

use super::model::{SaveReceipt, Snapshot};
use dashmap::DashMap;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during snapshot storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage lock poisoned")]
    Poisoned,

    #[error("Background task failed: {0}")]
    Task(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Keyed persistence of one snapshot per workspace.
///
/// Calls may block; async callers go through
/// [`SnapshotBridge`](super::SnapshotBridge).
pub trait SnapshotStore: Send + Sync {
    fn load(&self, workspace_key: &str) -> StorageResult<Option<Snapshot>>;

    /// Replace the workspace's snapshot
    fn save(&self, workspace_key: &str, snapshot: &Snapshot) -> StorageResult<SaveReceipt>;

    /// Workspace keys with a saved snapshot, sorted
    fn list(&self) -> StorageResult<Vec<String>>;

    /// Returns true if a snapshot was removed
    fn delete(&self, workspace_key: &str) -> StorageResult<bool>;
}

/// Serialize `snapshot`, deriving its content etag and size
fn encode(snapshot: &Snapshot) -> StorageResult<(String, SaveReceipt)> {
    let body = serde_json::to_string(snapshot)?;
    let receipt = SaveReceipt {
        etag: Uuid::new_v5(&Uuid::NAMESPACE_OID, body.as_bytes()).to_string(),
        size: body.len(),
    };
    Ok((body, receipt))
}

/// In-process store, for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshots: DashMap<String, String>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self, workspace_key: &str) -> StorageResult<Option<Snapshot>> {
        self.snapshots
            .get(workspace_key)
            .map(|body| serde_json::from_str(body.value()))
            .transpose()
            .map_err(StorageError::from)
    }

    fn save(&self, workspace_key: &str, snapshot: &Snapshot) -> StorageResult<SaveReceipt> {
        let (body, receipt) = encode(snapshot)?;
        self.snapshots.insert(workspace_key.to_string(), body);
        Ok(receipt)
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        let mut keys: Vec<String> = self.snapshots.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        Ok(keys)
    }

    fn delete(&self, workspace_key: &str) -> StorageResult<bool> {
        Ok(self.snapshots.remove(workspace_key).is_some())
    }
}

/// SQLite-backed snapshot store
///
/// One row per workspace holding the snapshot JSON and its etag.
/// Thread-safe via internal mutex on the connection.
pub struct SqliteSnapshotStore {
    conn: Mutex<Connection>,
}

impl SqliteSnapshotStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS snapshots (
                workspace_key TEXT PRIMARY KEY,
                etag TEXT NOT NULL,
                body_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    /// Etag of the stored snapshot, without loading it
    pub fn etag(&self, workspace_key: &str) -> StorageResult<Option<String>> {
        let conn = self.conn()?;
        let etag = conn
            .query_row(
                "SELECT etag FROM snapshots WHERE workspace_key = ?1",
                params![workspace_key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(etag)
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn load(&self, workspace_key: &str) -> StorageResult<Option<Snapshot>> {
        let conn = self.conn()?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body_json FROM snapshots WHERE workspace_key = ?1",
                params![workspace_key],
                |row| row.get(0),
            )
            .optional()?;

        match body {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    fn save(&self, workspace_key: &str, snapshot: &Snapshot) -> StorageResult<SaveReceipt> {
        let (body, receipt) = encode(snapshot)?;
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO snapshots (workspace_key, etag, body_json, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(workspace_key) DO UPDATE SET
                etag = excluded.etag,
                body_json = excluded.body_json,
                updated_at = excluded.updated_at
            "#,
            params![
                workspace_key,
                receipt.etag,
                body,
                snapshot.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(receipt)
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT workspace_key FROM snapshots ORDER BY workspace_key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    fn delete(&self, workspace_key: &str) -> StorageResult<bool> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM snapshots WHERE workspace_key = ?1",
            params![workspace_key],
        )?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ConceptEdge, GraphState, NodePatch};
    use crate::snapshot::{hydrate, serialize};

    fn snapshot(key: &str) -> Snapshot {
        let mut state = GraphState::new();
        state.upsert_node("kayaking", &NodePatch::new().with_salience(7.0));
        state.insert_edge(ConceptEdge::new("kayaking", "weekend trip").with_relation("part_of"));
        serialize(&state, key)
    }

    fn exercise(store: &dyn SnapshotStore) {
        assert!(store.load("trips").unwrap().is_none());

        let saved = snapshot("trips");
        let receipt = store.save("trips", &saved).unwrap();
        assert_eq!(receipt.size, serde_json::to_string(&saved).unwrap().len());

        let loaded = store.load("trips").unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert_eq!(hydrate(&loaded), hydrate(&saved));

        store.save("recipes", &snapshot("recipes")).unwrap();
        assert_eq!(store.list().unwrap(), vec!["recipes", "trips"]);

        assert!(store.delete("recipes").unwrap());
        assert!(!store.delete("recipes").unwrap());
    }

    #[test]
    fn memory_store_contract() {
        exercise(&MemorySnapshotStore::new());
    }

    #[test]
    fn sqlite_store_contract() {
        exercise(&SqliteSnapshotStore::open_in_memory().unwrap());
    }

    #[test]
    fn etag_is_content_derived() {
        let store = MemorySnapshotStore::new();
        let snap = snapshot("trips");

        let first = store.save("trips", &snap).unwrap();
        let again = store.save("trips", &snap).unwrap();
        assert_eq!(first, again);

        let mut changed = snap.clone();
        changed.nodes[0].summary = Some("paddling".to_string());
        assert_ne!(store.save("trips", &changed).unwrap().etag, first.etag);
    }

    #[test]
    fn sqlite_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("snapshots.db");
        let snap = snapshot("trips");

        let receipt = {
            let store = SqliteSnapshotStore::open(&path).unwrap();
            store.save("trips", &snap).unwrap()
        };

        let reopened = SqliteSnapshotStore::open(&path).unwrap();
        assert_eq!(reopened.load("trips").unwrap(), Some(snap));
        assert_eq!(reopened.etag("trips").unwrap(), Some(receipt.etag));
    }
}
