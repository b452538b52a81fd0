//! In-memory store, for dry runs and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::CourseRecord;
use crate::pipeline::Snapshot;
use crate::pipeline::hash::fingerprint;
use crate::storage::{DocumentStore, WriteOp};

#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<BTreeMap<String, CourseRecord>>,
    commits: Mutex<Vec<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing set of documents.
    pub fn with_documents(documents: impl IntoIterator<Item = (String, CourseRecord)>) -> Self {
        Self {
            documents: Mutex::new(documents.into_iter().collect()),
            commits: Mutex::new(Vec::new()),
        }
    }

    /// Copy of the stored documents.
    pub async fn documents(&self) -> BTreeMap<String, CourseRecord> {
        self.documents.lock().await.clone()
    }

    /// Size of every batch committed so far, in order.
    pub async fn commit_sizes(&self) -> Vec<usize> {
        self.commits.lock().await.clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn snapshot(&self) -> Result<Snapshot> {
        let documents = self.documents.lock().await;
        Ok(documents
            .iter()
            .map(|(id, record)| (id.clone(), fingerprint(record)))
            .collect())
    }

    async fn commit(&self, batch: &[WriteOp]) -> Result<()> {
        let mut documents = self.documents.lock().await;
        for op in batch {
            match op {
                WriteOp::Set { id, record } => {
                    documents.insert(id.clone(), record.clone());
                }
                WriteOp::Delete { id } => {
                    documents.remove(id);
                }
            }
        }
        self.commits.lock().await.push(batch.len());
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.documents.lock().await.len())
    }
}
