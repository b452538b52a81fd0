//! Pipeline stages for timetable records.
//!
//! - `ingest`: read saved tables and expand rows into records
//! - `hash`: document identity and change fingerprint
//! - `diff`: classify records against the store snapshot
//! - `sync`: reconcile and commit changes in batches
//! - `circuit_breaker`: refuse plans that shrink the collection too far
//! - `export`: render records as script data
//! - `run_pipeline`: the stages above, in order

pub mod circuit_breaker;
pub mod diff;
pub mod export;
pub mod hash;
pub mod ingest;
#[allow(clippy::module_inception)]
mod pipeline;
pub mod sync;

pub use circuit_breaker::{CircuitBreaker, Verdict, covered_after};
pub use diff::{Change, DiffResult, KeyedRecord, Snapshot, SnapshotDiffer, SyncStats, calculate_diff};
pub use export::{serialize, write_export};
pub use hash::{fingerprint, identity, transliterate};
pub use ingest::{IngestOutcome, ingest_sources, sort_records};
pub use pipeline::{PipelineOptions, PipelineOutcome, log_report, run_ingest, run_pipeline};
pub use sync::{BatchedWriter, Reconciliation, SyncSummary, WriteSummary, plan_sync, reconcile, run_sync};
