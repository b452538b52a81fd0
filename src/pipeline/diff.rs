//! Diff calculation against the document store snapshot.
//!
//! Every record of the current run is classified as new, updated or
//! unchanged by comparing its fingerprint with the one stored under the
//! same identity. Stored documents missing from the run are not reported
//! here; the store is overwrite-only from this side.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::CourseRecord;
use crate::pipeline::hash::{fingerprint, identity};

/// Stored state: document identity -> fingerprint.
pub type Snapshot = HashMap<String, String>;

/// A record together with its identity and fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedRecord {
    pub id: String,
    pub fingerprint: String,
    pub record: CourseRecord,
}

impl KeyedRecord {
    pub fn new(record: CourseRecord) -> Self {
        Self {
            id: identity(&record),
            fingerprint: fingerprint(&record),
            record,
        }
    }
}

/// Classification of a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    New,
    Updated,
    Unchanged,
}

/// Aggregate classification counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub new: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl SyncStats {
    /// Records that need a write.
    pub fn pending_writes(&self) -> usize {
        self.new + self.updated
    }

    pub fn total(&self) -> usize {
        self.new + self.updated + self.unchanged
    }
}

/// Records grouped by classification.
#[derive(Debug, Clone, Default)]
pub struct DiffResult {
    pub new: Vec<KeyedRecord>,
    pub updated: Vec<KeyedRecord>,
    pub unchanged: Vec<KeyedRecord>,
}

impl DiffResult {
    /// Check if anything needs writing.
    pub fn has_changes(&self) -> bool {
        !self.new.is_empty() || !self.updated.is_empty()
    }

    pub fn stats(&self) -> SyncStats {
        SyncStats {
            new: self.new.len(),
            updated: self.updated.len(),
            unchanged: self.unchanged.len(),
        }
    }
}

/// Classify one keyed record against the snapshot.
pub fn classify(keyed: &KeyedRecord, snapshot: &Snapshot) -> Change {
    match snapshot.get(&keyed.id) {
        None => Change::New,
        Some(stored) if *stored != keyed.fingerprint => Change::Updated,
        Some(_) => Change::Unchanged,
    }
}

/// Calculator for computing diffs between a run and a snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotDiffer;

impl SnapshotDiffer {
    pub fn new() -> Self {
        Self
    }

    /// Classify every record of the run. Input order is kept within each group.
    pub fn calculate(&self, records: &[CourseRecord], snapshot: &Snapshot) -> DiffResult {
        let mut result = DiffResult::default();

        for record in records {
            let keyed = KeyedRecord::new(record.clone());
            match classify(&keyed, snapshot) {
                Change::New => result.new.push(keyed),
                Change::Updated => result.updated.push(keyed),
                Change::Unchanged => result.unchanged.push(keyed),
            }
        }

        result
    }
}

/// Convenience function to calculate a diff.
pub fn calculate_diff(records: &[CourseRecord], snapshot: &Snapshot) -> DiffResult {
    SnapshotDiffer::new().calculate(records, snapshot)
}

/// Snapshot a set of records would produce once stored.
pub fn snapshot_of(records: &[CourseRecord]) -> Snapshot {
    records
        .iter()
        .map(|r| (identity(r), fingerprint(r)))
        .collect()
}
