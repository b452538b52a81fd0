//! Storage abstractions for course document persistence.
//!
//! A store holds one collection of course documents keyed by identity.
//! The sync pass reads it once as a snapshot and then commits batches of
//! write operations, each batch atomically.
//!
//! ## Directory Structure (local backend)
//!
//! ```text
//! storage/
//! ├── config.toml              # Application configuration
//! ├── course_data.js           # Script export of the last run
//! └── collections/
//!     └── 2025-2026-bahar.json # identity -> course document
//! ```

pub mod local;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::CourseRecord;
use crate::pipeline::Snapshot;

// Re-export for convenience
pub use local::LocalStore;
pub use memory::MemoryStore;

/// One document operation within a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Create or fully overwrite the document at `id`
    Set { id: String, record: CourseRecord },
    /// Remove the document at `id`
    Delete { id: String },
}

impl WriteOp {
    pub fn id(&self) -> &str {
        match self {
            WriteOp::Set { id, .. } | WriteOp::Delete { id } => id,
        }
    }
}

/// Trait for course document store backends.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the current identity -> fingerprint map.
    async fn snapshot(&self) -> Result<Snapshot>;

    /// Apply all operations as one atomic unit.
    async fn commit(&self, batch: &[WriteOp]) -> Result<()>;

    /// Number of stored documents.
    async fn count(&self) -> Result<usize> {
        Ok(self.snapshot().await?.len())
    }
}
