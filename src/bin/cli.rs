//! Timetable Sync CLI
//!
//! Reads timetable pages saved by the scraper, writes the script export and
//! syncs changed records into the local document store.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use timetable_sync::{
    error::Result,
    models::Config,
    pipeline::{self, PipelineOptions},
    storage::{DocumentStore, LocalStore},
};

/// timetable-sync - Course timetable expander and incremental syncer
#[derive(Parser, Debug)]
#[command(
    name = "timetable-sync",
    version,
    about = "Expand course timetable rows and sync them to a document store"
)]
struct Cli {
    /// Path to storage directory containing config.toml and collections
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Expand saved tables and write the script export
    Export {
        /// Input files or directories (.html, .htm, .json)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file (default: {storage_dir}/{export.file_name})
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Expand saved tables and sync changes to the collection
    Sync {
        /// Input files or directories (.html, .htm, .json)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Run the full pipeline: Ingest → Export → Sync
    Pipeline {
        /// Input files or directories (.html, .htm, .json)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Validate configuration files
    Validate,

    /// Show collection info
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.storage_dir.join("config.toml");
    let config = Config::load_or_default(&config_path);
    log::debug!("Loaded configuration from {}", config_path.display());

    let store = LocalStore::new(&cli.storage_dir, &config.sync.collection);
    let export_path = cli.storage_dir.join(&config.export.file_name);

    match cli.command {
        Command::Export { inputs, output } => {
            config.validate()?;
            let options = PipelineOptions {
                export_path: Some(output.unwrap_or(export_path)),
                ..PipelineOptions::default()
            };
            pipeline::run_pipeline(&config, &store, &inputs, &options).await?;
        }

        Command::Sync { inputs, dry_run } => {
            config.validate()?;
            let options = PipelineOptions {
                sync: true,
                dry_run,
                ..PipelineOptions::default()
            };
            pipeline::run_pipeline(&config, &store, &inputs, &options).await?;
        }

        Command::Pipeline { inputs } => {
            config.validate()?;
            let options = PipelineOptions {
                export_path: Some(export_path),
                sync: true,
                dry_run: false,
            };
            let outcome = pipeline::run_pipeline(&config, &store, &inputs, &options).await?;
            log::info!("Pipeline complete! {} records", outcome.record_count);
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK ({} weekdays, {} time patterns, batch size {})",
                config.parsing.weekdays.len(),
                config.parsing.time_patterns.len(),
                config.sync.batch_size
            );
        }

        Command::Info => {
            log::info!("Storage directory: {}", cli.storage_dir.display());
            log::info!("Collection: {}", config.sync.collection);
            log::info!("Stale policy: {:?}", config.sync.stale_policy);

            let path = store.collection_path();
            if path.exists() {
                log::info!("Collection file: {}", path.display());
                log::info!("Documents: {}", store.count().await?);
            } else {
                log::info!("No collection synced yet.");
            }
            log::info!(
                "Export: {}",
                if export_path.exists() {
                    "exists"
                } else {
                    "not found"
                }
            );
        }
    }

    Ok(())
}
