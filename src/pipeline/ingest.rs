// src/pipeline/ingest.rs

//! Reading saved timetable tables and expanding them into course records.

use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt, TryStreamExt};

use crate::error::{AppError, Result};
use crate::models::{Config, CourseRecord};
use crate::services::{ParseReport, RecordExpander, TableReader};

/// Kind of input file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Html,
    Json,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "html" | "htm" => Some(Self::Html),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// All records of a run plus parse quality counters.
#[derive(Debug, Clone, Default)]
pub struct IngestOutcome {
    pub records: Vec<CourseRecord>,
    pub report: ParseReport,
    pub sources: usize,
}

/// Sort by `(code, crn)`, keeping source order among equal keys.
pub fn sort_records(records: &mut [CourseRecord]) {
    records.sort_by(|a, b| a.code.cmp(&b.code).then_with(|| a.crn.cmp(&b.crn)));
}

/// Expand already extracted rows.
pub fn expand_rows<S: AsRef<str>>(
    expander: &RecordExpander,
    rows: &[Vec<S>],
) -> (Vec<CourseRecord>, ParseReport) {
    let mut report = ParseReport::default();
    let records = rows
        .iter()
        .flat_map(|cells| expander.expand_cells(cells, &mut report))
        .collect();
    (records, report)
}

/// Resolve inputs: files are kept, directories expand to their
/// supported files in lexical order.
pub async fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        let meta = tokio::fs::metadata(input).await?;
        if !meta.is_dir() {
            if SourceKind::from_path(input).is_none() {
                return Err(AppError::validation(format!(
                    "Unsupported input file: {}",
                    input.display()
                )));
            }
            files.push(input.clone());
            continue;
        }

        let mut found = Vec::new();
        let mut entries = tokio::fs::read_dir(input).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if SourceKind::from_path(&path).is_some() && entry.file_type().await?.is_file() {
                found.push(path);
            }
        }
        found.sort();
        files.extend(found);
    }

    Ok(files)
}

/// Read and expand a single input file.
async fn ingest_file(
    path: &Path,
    reader: &TableReader,
    expander: &RecordExpander,
) -> Result<(Vec<CourseRecord>, ParseReport)> {
    let text = tokio::fs::read_to_string(path).await?;
    let rows = match SourceKind::from_path(path) {
        Some(SourceKind::Html) => reader.read_html(&text),
        Some(SourceKind::Json) => TableReader::read_json(&text)?,
        None => {
            return Err(AppError::validation(format!(
                "Unsupported input file: {}",
                path.display()
            )));
        }
    };

    let (records, report) = expand_rows(expander, &rows);
    log::debug!(
        "{}: {} rows -> {} records",
        path.display(),
        rows.len(),
        records.len()
    );
    Ok((records, report))
}

/// Ingest every input, aggregate all records and sort them.
///
/// Files are read concurrently (bounded by `source.max_concurrent`); the
/// aggregate keeps input order before the stable sort.
pub async fn ingest_sources(inputs: &[PathBuf], config: &Config) -> Result<IngestOutcome> {
    let files = collect_inputs(inputs).await?;
    let reader = TableReader::new(&config.source)?;
    let expander = RecordExpander::new(&config.parsing)?;
    let concurrency = config.source.max_concurrent.max(1);

    let parts: Vec<(Vec<CourseRecord>, ParseReport)> = stream::iter(files.iter())
        .map(|path| {
            let reader = &reader;
            let expander = &expander;
            async move { ingest_file(path, reader, expander).await }
        })
        .buffered(concurrency)
        .try_collect()
        .await?;

    let mut outcome = IngestOutcome {
        sources: files.len(),
        ..IngestOutcome::default()
    };
    for (records, report) in parts {
        outcome.records.extend(records);
        outcome.report += &report;
    }
    sort_records(&mut outcome.records);

    Ok(outcome)
}
