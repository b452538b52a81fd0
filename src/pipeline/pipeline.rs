// src/pipeline/pipeline.rs

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::Config;
use crate::pipeline::diff::SyncStats;
use crate::pipeline::export::write_export;
use crate::pipeline::ingest::{IngestOutcome, ingest_sources};
use crate::pipeline::sync::{SyncSummary, plan_sync, run_sync};
use crate::services::ParseReport;
use crate::storage::DocumentStore;

/// Which stages a pipeline run performs.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Write the script export here
    pub export_path: Option<PathBuf>,
    /// Reconcile against the store
    pub sync: bool,
    /// Reconcile but commit nothing
    pub dry_run: bool,
}

/// What a pipeline run did.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutcome {
    pub record_count: usize,
    pub report: ParseReport,
    pub exported: Option<PathBuf>,
    /// Set for dry runs
    pub planned: Option<SyncStats>,
    pub synced: Option<SyncSummary>,
}

/// Log parse quality counters.
pub fn log_report(report: &ParseReport) {
    log::info!(
        "Parsed {} rows into {} records ({} rejected, {} without weekday)",
        report.rows_seen,
        report.records,
        report.rows_rejected,
        report.rows_without_days
    );
    if report.fallback_count() > 0 {
        log::warn!(
            "Degraded parses: {} dash-split times, {} unparsed times, {} unparsed end times, \
             {} split classrooms, {} passthrough classrooms",
            report.time_dash_split,
            report.time_unparsed,
            report.end_unparsed,
            report.classroom_split,
            report.classroom_passthrough
        );
    }
}

/// Ingest all inputs and log what was parsed.
pub async fn run_ingest(config: &Config, inputs: &[PathBuf]) -> Result<IngestOutcome> {
    let outcome = ingest_sources(inputs, config).await?;
    log::info!("Read {} input files", outcome.sources);
    log_report(&outcome.report);
    Ok(outcome)
}

/// Run ingest, then export and/or sync as requested.
///
/// Sync only starts once every input has been ingested.
pub async fn run_pipeline(
    config: &Config,
    store: &dyn DocumentStore,
    inputs: &[PathBuf],
    options: &PipelineOptions,
) -> Result<PipelineOutcome> {
    let total_steps = 1 + usize::from(options.export_path.is_some()) + usize::from(options.sync);
    let mut current_step = 1;

    log::info!("[STEP {current_step}/{total_steps}] Ingest - Expanding timetable rows");
    let ingest = run_ingest(config, inputs).await?;

    let mut outcome = PipelineOutcome {
        record_count: ingest.records.len(),
        report: ingest.report.clone(),
        ..PipelineOutcome::default()
    };

    if let Some(path) = &options.export_path {
        current_step += 1;
        log::info!("[STEP {current_step}/{total_steps}] Export - Writing script data");
        export_to(path, config, &ingest).await?;
        outcome.exported = Some(path.clone());
    }

    if options.sync {
        current_step += 1;
        log::info!(
            "[STEP {current_step}/{total_steps}] Sync - Reconciling with collection '{}'",
            config.sync.collection
        );

        if options.dry_run {
            let (plan, _) = plan_sync(store, &ingest.records, &config.sync).await?;
            log::info!(
                "Dry run: {} new, {} updated, {} unchanged, {} stale to delete",
                plan.stats.new,
                plan.stats.updated,
                plan.stats.unchanged,
                plan.deletes.len()
            );
            outcome.planned = Some(plan.stats);
        } else {
            let summary = run_sync(store, &ingest.records, &config.sync).await?;
            log::info!(
                "Sync complete: +{} new, ~{} updated, ={} unchanged, -{} deleted in {} batches",
                summary.stats.new,
                summary.stats.updated,
                summary.stats.unchanged,
                summary.deleted,
                summary.batches
            );
            outcome.synced = Some(summary);
        }
    }

    Ok(outcome)
}

async fn export_to(path: &Path, config: &Config, ingest: &IngestOutcome) -> Result<()> {
    write_export(path, &ingest.records, &config.export.variable_name).await
}
