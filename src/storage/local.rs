//! Local filesystem storage implementation.
//!
//! Keeps a collection as one JSON object mapping document identity to the
//! course document. Commits rewrite the file atomically (temp file, then
//! rename), so a batch is either fully applied or not at all.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! └── collections/
//!     └── {collection}.json
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::CourseRecord;
use crate::pipeline::Snapshot;
use crate::pipeline::hash::fingerprint;
use crate::storage::{DocumentStore, WriteOp};

/// Stored documents, ordered by identity for stable output.
pub type Collection = BTreeMap<String, CourseRecord>;

/// Local filesystem store backend.
pub struct LocalStore {
    root_dir: PathBuf,
    collection: String,
    // Serializes read-modify-write commits within the process.
    write_lock: Mutex<()>,
}

impl LocalStore {
    /// Create a new LocalStore rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>, collection: impl Into<String>) -> Self {
        Self {
            root_dir: root_dir.into(),
            collection: collection.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Key of the collection file, relative to the root.
    fn collection_key(&self) -> String {
        format!("collections/{}.json", self.collection)
    }

    /// Full path of the collection file.
    pub fn collection_path(&self) -> PathBuf {
        self.path(&self.collection_key())
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Load all stored documents.
    pub async fn load_collection(&self) -> Result<Collection> {
        match self.read_json(&self.collection_key()).await? {
            Some(collection) => Ok(collection),
            None => {
                log::warn!("No collection file at {}", self.collection_path().display());
                Ok(Collection::new())
            }
        }
    }
}

#[async_trait]
impl DocumentStore for LocalStore {
    async fn snapshot(&self) -> Result<Snapshot> {
        let collection = self.load_collection().await?;
        Ok(collection
            .iter()
            .map(|(id, record)| (id.clone(), fingerprint(record)))
            .collect())
    }

    async fn commit(&self, batch: &[WriteOp]) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut collection = self.load_collection().await?;
        for op in batch {
            match op {
                WriteOp::Set { id, record } => {
                    collection.insert(id.clone(), record.clone());
                }
                WriteOp::Delete { id } => {
                    collection.remove(id);
                }
            }
        }

        self.write_json(&self.collection_key(), &collection).await?;
        log::debug!(
            "Committed {} operations to {} ({} documents)",
            batch.len(),
            self.collection_key(),
            collection.len()
        );
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.load_collection().await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeSpan;
    use crate::pipeline::hash::identity;
    use tempfile::TempDir;

    fn make_record(crn: &str) -> CourseRecord {
        CourseRecord {
            crn: crn.to_string(),
            code: "KIM 101".to_string(),
            name: "Chemistry".to_string(),
            teaching_method: "Yüz yüze".to_string(),
            instructor: "Öztürk".to_string(),
            building: "KMB".to_string(),
            day: "Perşembe".to_string(),
            time: TimeSpan::new("14:30", "16:30"),
            classroom: "Z-12".to_string(),
            capacity: 60,
            enrolled: 58,
        }
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path(), "test");

        store.write_bytes("test.txt", b"hello").await.unwrap();
        let data = store.read_bytes("test.txt").await.unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path(), "test");

        assert!(store.read_bytes("nope.txt").await.unwrap().is_none());
        assert!(store.snapshot().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_then_snapshot() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path(), "2025-2026-bahar");
        let record = make_record("30100");
        let id = identity(&record);

        store
            .commit(&[WriteOp::Set {
                id: id.clone(),
                record: record.clone(),
            }])
            .await
            .unwrap();

        assert!(store.collection_path().exists());
        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[&id], fingerprint(&record));
        assert_eq!(id, "30100_KIM 101_Persembe");

        // Non-ASCII text survives the round trip.
        let collection = store.load_collection().await.unwrap();
        assert_eq!(collection[&id].instructor, "Öztürk");
    }

    #[tokio::test]
    async fn test_commit_overwrite_and_delete() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path(), "c");
        let a = make_record("1");
        let b = make_record("2");

        store
            .commit(&[
                WriteOp::Set { id: "a".into(), record: a.clone() },
                WriteOp::Set { id: "b".into(), record: b },
            ])
            .await
            .unwrap();

        let mut changed = a.clone();
        changed.enrolled = 0;
        store
            .commit(&[
                WriteOp::Set { id: "a".into(), record: changed },
                WriteOp::Delete { id: "b".into() },
            ])
            .await
            .unwrap();

        let collection = store.load_collection().await.unwrap();
        assert_eq!(collection.len(), 1);
        assert_eq!(collection["a"].enrolled, 0);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_collection_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path(), "c");
        store.write_bytes("collections/c.json", b"{oops").await.unwrap();

        assert!(matches!(store.snapshot().await, Err(AppError::Json(_))));
    }
}
