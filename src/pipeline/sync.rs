// src/pipeline/sync.rs

//! Incremental sync of course records into a document store.
//!
//! A pass reads the store snapshot once, classifies the complete record set
//! of the run against it, and commits only new and updated documents in
//! size-capped batches, one batch at a time. A failed commit ends the pass.
//! Re-running is safe because every write is a full-document overwrite.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{CourseRecord, StalePolicy, SyncConfig};
use crate::pipeline::circuit_breaker::CircuitBreaker;
use crate::pipeline::diff::{Snapshot, SnapshotDiffer, SyncStats};
use crate::storage::{DocumentStore, WriteOp};

/// What a sync pass needs to write.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// New and updated documents, keyed by identity
    pub writes: Vec<(String, CourseRecord)>,
    /// Stored identities the run no longer produces; only filled under `StalePolicy::Remove`
    pub deletes: Vec<String>,
    /// Number of stored identities the run no longer produces, under either policy
    pub stale: usize,
    pub stats: SyncStats,
}

impl Reconciliation {
    /// All operations in commit order: writes first, then deletes.
    pub fn operations(&self) -> Vec<WriteOp> {
        self.writes
            .iter()
            .map(|(id, record)| WriteOp::Set {
                id: id.clone(),
                record: record.clone(),
            })
            .chain(
                self.deletes
                    .iter()
                    .map(|id| WriteOp::Delete { id: id.clone() }),
            )
            .collect()
    }
}

/// Decide which records to write given the stored snapshot.
///
/// Unchanged records produce no write. Stored documents absent from
/// `records` are left alone unless the policy is `Remove`.
pub fn reconcile(
    records: &[CourseRecord],
    snapshot: &Snapshot,
    policy: StalePolicy,
) -> Reconciliation {
    let diff = SnapshotDiffer::new().calculate(records, snapshot);
    let stats = diff.stats();

    let produced: HashSet<&str> = diff
        .new
        .iter()
        .chain(&diff.updated)
        .chain(&diff.unchanged)
        .map(|k| k.id.as_str())
        .collect();
    let mut stale: Vec<String> = snapshot
        .keys()
        .filter(|id| !produced.contains(id.as_str()))
        .cloned()
        .collect();
    stale.sort();
    let stale_count = stale.len();

    let deletes = match policy {
        StalePolicy::Retain => Vec::new(),
        StalePolicy::Remove => stale,
    };

    let writes = diff
        .new
        .into_iter()
        .chain(diff.updated)
        .map(|k| (k.id, k.record))
        .collect();

    Reconciliation {
        writes,
        deletes,
        stale: stale_count,
        stats,
    }
}

/// Outcome of committing a list of operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    pub batches: usize,
    pub operations: usize,
}

/// Commits operations to a store in batches of at most `batch_size`.
pub struct BatchedWriter<'a> {
    store: &'a dyn DocumentStore,
    batch_size: usize,
}

impl<'a> BatchedWriter<'a> {
    pub fn new(store: &'a dyn DocumentStore, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Commit all operations, each batch awaited before the next is sent.
    ///
    /// The first failing batch aborts with `AppError::Commit`; earlier
    /// batches stay committed.
    pub async fn write_all(&self, ops: &[WriteOp]) -> Result<WriteSummary> {
        let mut summary = WriteSummary::default();

        for (index, batch) in ops.chunks(self.batch_size).enumerate() {
            if let Err(e) = self.store.commit(batch).await {
                if let (Some(first), Some(last)) = (batch.first(), batch.last()) {
                    log::error!(
                        "Batch {} failed, documents '{}' through '{}' not written",
                        index + 1,
                        first.id(),
                        last.id()
                    );
                }
                return Err(AppError::commit(index + 1, batch.len(), e));
            }

            summary.batches += 1;
            summary.operations += batch.len();
            log::info!(
                "Committed batch {} ({} operations, {} total)",
                index + 1,
                batch.len(),
                summary.operations
            );
        }

        Ok(summary)
    }
}

/// Result of a completed sync pass.
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub stats: SyncStats,
    pub deleted: usize,
    pub batches: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Read the snapshot and reconcile, without writing anything.
pub async fn plan_sync(
    store: &dyn DocumentStore,
    records: &[CourseRecord],
    config: &SyncConfig,
) -> Result<(Reconciliation, Snapshot)> {
    let snapshot = store.snapshot().await?;
    log::info!("Snapshot holds {} documents", snapshot.len());

    let plan = reconcile(records, &snapshot, config.stale_policy);
    Ok((plan, snapshot))
}

/// Run a full sync pass of `records` against `store`.
///
/// `records` must be the complete set of the run; a partial set would
/// misreport unchanged documents and, under `Remove`, delete live ones.
pub async fn run_sync(
    store: &dyn DocumentStore,
    records: &[CourseRecord],
    config: &SyncConfig,
) -> Result<SyncSummary> {
    let started_at = Utc::now();
    let (plan, snapshot) = plan_sync(store, records, config).await?;

    CircuitBreaker::new(config.circuit_breaker.clone()).enforce(
        &plan,
        &snapshot,
        config.stale_policy,
    )?;

    log::info!(
        "Sync plan: {} writes ({} new, {} updated), {} unchanged, {} stale to delete",
        plan.stats.pending_writes(),
        plan.stats.new,
        plan.stats.updated,
        plan.stats.unchanged,
        plan.deletes.len()
    );

    let writer = BatchedWriter::new(store, config.batch_size);
    let written = writer.write_all(&plan.operations()).await?;

    Ok(SyncSummary {
        stats: plan.stats,
        deleted: plan.deletes.len(),
        batches: written.batches,
        started_at,
        finished_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::models::TimeSpan;
    use crate::pipeline::diff::snapshot_of;
    use crate::pipeline::hash::identity;
    use crate::storage::MemoryStore;

    fn make_record(crn: usize, day: &str) -> CourseRecord {
        CourseRecord {
            crn: crn.to_string(),
            code: format!("BLG {}", 100 + crn % 7),
            name: "Programming".to_string(),
            teaching_method: "Yüz yüze".to_string(),
            instructor: "Doe".to_string(),
            building: "EEB".to_string(),
            day: day.to_string(),
            time: TimeSpan::new("09:30", "11:30"),
            classroom: "5202".to_string(),
            capacity: 100,
            enrolled: 90,
        }
    }

    fn make_records(count: usize) -> Vec<CourseRecord> {
        (0..count).map(|i| make_record(i, "Salı")).collect()
    }

    /// Store whose n-th commit (1-based) fails.
    struct FailingStore {
        inner: MemoryStore,
        fail_on: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DocumentStore for FailingStore {
        async fn snapshot(&self) -> Result<Snapshot> {
            self.inner.snapshot().await
        }

        async fn commit(&self, batch: &[WriteOp]) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.fail_on {
                return Err(AppError::store("quota exceeded"));
            }
            self.inner.commit(batch).await
        }
    }

    #[test]
    fn test_reconcile_empty_snapshot() {
        let records = make_records(3);
        let plan = reconcile(&records, &Snapshot::new(), StalePolicy::Retain);
        assert_eq!(plan.stats, SyncStats { new: 3, updated: 0, unchanged: 0 });
        assert_eq!(plan.writes.len(), 3);
        assert_eq!(plan.writes[0].0, identity(&records[0]));
        assert!(plan.deletes.is_empty());
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let records = make_records(5);
        let snapshot = snapshot_of(&records);
        let plan = reconcile(&records, &snapshot, StalePolicy::Retain);
        assert_eq!(plan.stats.unchanged, records.len());
        assert!(plan.writes.is_empty());
    }

    #[test]
    fn test_reconcile_ignores_untracked_fields() {
        let records = make_records(2);
        let snapshot = snapshot_of(&records);

        let mut changed = records.clone();
        changed[0].enrolled = 0;
        changed[1].classroom = "1101".into();

        let plan = reconcile(&changed, &snapshot, StalePolicy::Retain);
        assert_eq!(plan.stats.unchanged, 2);
        assert!(plan.writes.is_empty());
    }

    #[test]
    fn test_reconcile_retain_keeps_stale() {
        let old = make_records(4);
        let plan = reconcile(&old[..2], &snapshot_of(&old), StalePolicy::Retain);
        assert!(plan.deletes.is_empty());
        assert_eq!(plan.stale, 2);
    }

    #[test]
    fn test_reconcile_remove_lists_stale() {
        let old = make_records(4);
        let plan = reconcile(&old[..2], &snapshot_of(&old), StalePolicy::Remove);
        let mut expected = vec![identity(&old[2]), identity(&old[3])];
        expected.sort();
        assert_eq!(plan.deletes, expected);
        assert_eq!(plan.stale, 2);
        assert_eq!(plan.operations().len(), 2);
    }

    #[test]
    fn test_reconcile_lowercase_only_wednesday_key() {
        let record = make_record(1, "Çarşamba");
        let legacy_id = format!("{}_{}_Çarsamba", record.crn, record.code);
        let snapshot = Snapshot::from([(
            legacy_id.clone(),
            crate::pipeline::hash::fingerprint(&record),
        )]);

        let plan = reconcile(std::slice::from_ref(&record), &snapshot, StalePolicy::Remove);
        assert_eq!(plan.stats, SyncStats { new: 1, updated: 0, unchanged: 0 });
        assert_eq!(plan.writes[0].0, "1_BLG 101_Carsamba");
        assert_eq!(plan.deletes, vec![legacy_id]);
    }

    #[tokio::test]
    async fn test_writer_batches_with_final_partial() {
        let store = MemoryStore::new();
        let ops = reconcile(&make_records(9), &Snapshot::new(), StalePolicy::Retain).operations();

        let summary = BatchedWriter::new(&store, 4).write_all(&ops).await.unwrap();
        assert_eq!(summary, WriteSummary { batches: 3, operations: 9 });
        assert_eq!(store.commit_sizes().await, vec![4, 4, 1]);
    }

    #[tokio::test]
    async fn test_writer_nothing_to_write() {
        let store = MemoryStore::new();
        let summary = BatchedWriter::new(&store, 400).write_all(&[]).await.unwrap();
        assert_eq!(summary.batches, 0);
        assert!(store.commit_sizes().await.is_empty());
    }

    #[tokio::test]
    async fn test_writer_failure_is_fatal() {
        let store = FailingStore {
            inner: MemoryStore::new(),
            fail_on: 2,
            calls: AtomicUsize::new(0),
        };
        let ops = reconcile(&make_records(10), &Snapshot::new(), StalePolicy::Retain).operations();

        let err = BatchedWriter::new(&store, 4).write_all(&ops).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Commit {
                batch: 2,
                operations: 4,
                ..
            }
        ));
        // The first batch landed, nothing after the failure was attempted.
        assert_eq!(store.inner.commit_sizes().await, vec![4]);
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_run_sync_twice_writes_once() {
        let store = MemoryStore::new();
        let records = make_records(7);
        let config = SyncConfig {
            batch_size: 3,
            ..SyncConfig::default()
        };

        let first = run_sync(&store, &records, &config).await.unwrap();
        assert_eq!(first.stats.new, 7);
        assert_eq!(first.batches, 3);

        let second = run_sync(&store, &records, &config).await.unwrap();
        assert_eq!(second.stats.unchanged, 7);
        assert_eq!(second.batches, 0);
        assert_eq!(store.commit_sizes().await, vec![3, 3, 1]);
    }

    #[tokio::test]
    async fn test_run_sync_detects_start_time_change() {
        let mut records = make_records(3);
        let store = MemoryStore::with_documents(
            records.iter().map(|r| (identity(r), r.clone())),
        );
        records[1].time.start = "13:30".into();

        let summary = run_sync(&store, &records, &SyncConfig::default()).await.unwrap();
        assert_eq!(summary.stats, SyncStats { new: 0, updated: 1, unchanged: 2 });
        let docs = store.documents().await;
        assert_eq!(docs[&identity(&records[1])].time.start, "13:30");
    }

    #[tokio::test]
    async fn test_run_sync_remove_deletes_stale() {
        let old = make_records(4);
        let store = MemoryStore::with_documents(old.iter().map(|r| (identity(r), r.clone())));
        let config = SyncConfig {
            stale_policy: StalePolicy::Remove,
            ..SyncConfig::default()
        };

        let summary = run_sync(&store, &old[..3], &config).await.unwrap();
        assert_eq!(summary.deleted, 1);
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_run_sync_remove_trips_breaker() {
        let old = make_records(20);
        let store = MemoryStore::with_documents(old.iter().map(|r| (identity(r), r.clone())));
        let config = SyncConfig {
            stale_policy: StalePolicy::Remove,
            ..SyncConfig::default()
        };

        let err = run_sync(&store, &old[..5], &config).await.unwrap_err();
        assert!(matches!(err, AppError::CircuitBreakerTriggered { .. }));
        assert_eq!(store.count().await.unwrap(), 20);
        assert!(store.commit_sizes().await.is_empty());
    }

    #[tokio::test]
    async fn test_run_sync_retain_keeps_stale_despite_drop() {
        let old = make_records(20);
        let store = MemoryStore::with_documents(old.iter().map(|r| (identity(r), r.clone())));

        let summary = run_sync(&store, &old[..5], &SyncConfig::default()).await.unwrap();
        assert_eq!(summary.deleted, 0);
        assert_eq!(summary.stats.unchanged, 5);
        assert_eq!(store.count().await.unwrap(), 20);
    }
}
