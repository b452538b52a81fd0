// src/services/expand.rs

//! Expansion of one packed source row into per-day course records.

use std::ops::AddAssign;

use serde::Serialize;

use crate::error::Result;
use crate::models::course::parse_count;
use crate::models::{CourseRecord, ParsingConfig, RawRow, TimeSpan};
use crate::services::fields::{FieldParsers, Fallback, clean_building};

/// Quality counters for an expansion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseReport {
    /// Rows offered for expansion
    pub rows_seen: usize,
    /// Rows rejected for having too few cells
    pub rows_rejected: usize,
    /// Rows dropped because no weekday was found
    pub rows_without_days: usize,
    /// Records produced
    pub records: usize,
    /// Time cells read by splitting on a single dash
    pub time_dash_split: usize,
    /// Non-empty time cells that yielded no span
    pub time_unparsed: usize,
    /// Spans whose end time could not be advanced
    pub end_unparsed: usize,
    /// Classroom cells read by splitting on `/` and `,`
    pub classroom_split: usize,
    /// Classroom cells passed through whole
    pub classroom_passthrough: usize,
}

impl ParseReport {
    /// Total number of degraded parses.
    pub fn fallback_count(&self) -> usize {
        self.time_dash_split
            + self.time_unparsed
            + self.end_unparsed
            + self.classroom_split
            + self.classroom_passthrough
    }

    fn note(&mut self, fallback: Option<Fallback>, is_time: bool) {
        match (fallback, is_time) {
            (None, _) => {}
            (Some(Fallback::DashSplit), _) => self.time_dash_split += 1,
            (Some(Fallback::MinuteUnparsed), _) => self.end_unparsed += 1,
            (Some(Fallback::Passthrough), true) => self.time_unparsed += 1,
            (Some(Fallback::Passthrough), false) => self.classroom_passthrough += 1,
            (Some(Fallback::DelimiterSplit), _) => self.classroom_split += 1,
        }
    }
}

impl AddAssign<&ParseReport> for ParseReport {
    fn add_assign(&mut self, other: &ParseReport) {
        self.rows_seen += other.rows_seen;
        self.rows_rejected += other.rows_rejected;
        self.rows_without_days += other.rows_without_days;
        self.records += other.records;
        self.time_dash_split += other.time_dash_split;
        self.time_unparsed += other.time_unparsed;
        self.end_unparsed += other.end_unparsed;
        self.classroom_split += other.classroom_split;
        self.classroom_passthrough += other.classroom_passthrough;
    }
}

/// Pair each day with a time span and a classroom.
///
/// Missing classrooms repeat the last parsed classroom, missing times repeat
/// the first parsed time. Output length always equals `days.len()`.
pub fn align(
    days: &[String],
    times: &[TimeSpan],
    classrooms: &[String],
) -> Vec<(String, TimeSpan, String)> {
    days.iter()
        .enumerate()
        .map(|(i, day)| {
            let classroom = classrooms
                .get(i)
                .or_else(|| classrooms.last())
                .cloned()
                .unwrap_or_default();
            let time = times
                .get(i)
                .or_else(|| times.first())
                .cloned()
                .unwrap_or_default();
            (day.clone(), time, classroom)
        })
        .collect()
}

/// Turns source rows into course records.
#[derive(Debug, Clone)]
pub struct RecordExpander {
    parsers: FieldParsers,
    min_cells: usize,
}

impl RecordExpander {
    /// Build an expander from parsing configuration.
    pub fn new(config: &ParsingConfig) -> Result<Self> {
        Ok(Self {
            parsers: FieldParsers::new(config)?,
            min_cells: config.min_cells,
        })
    }

    /// Expand a row into one record per weekday it names.
    pub fn expand_row(&self, row: &RawRow) -> Vec<CourseRecord> {
        self.expand_row_with_report(row, &mut ParseReport::default())
    }

    /// Expand positional cells, rejecting rows that are too short.
    pub fn expand_cells<S: AsRef<str>>(
        &self,
        cells: &[S],
        report: &mut ParseReport,
    ) -> Vec<CourseRecord> {
        match RawRow::from_cells(cells, self.min_cells) {
            Some(row) => self.expand_row_with_report(&row, report),
            None => {
                report.rows_seen += 1;
                report.rows_rejected += 1;
                log::debug!("Rejected row with {} cells", cells.len());
                Vec::new()
            }
        }
    }

    /// Expand a row and record parse quality in `report`.
    pub fn expand_row_with_report(
        &self,
        row: &RawRow,
        report: &mut ParseReport,
    ) -> Vec<CourseRecord> {
        report.rows_seen += 1;

        let days = self.parsers.parse_days(&row.day);
        if days.is_empty() {
            report.rows_without_days += 1;
            log::debug!(
                "Dropped row {} {}: no weekday in '{}'",
                row.crn,
                row.code,
                row.day
            );
            return Vec::new();
        }

        let times = self.parsers.parse_time_spans_outcome(&row.time);
        report.note(times.fallback, true);
        let classrooms = self.parsers.parse_classrooms_outcome(&row.classroom);
        report.note(classrooms.fallback, false);

        let building = clean_building(&row.building);
        let capacity = parse_count(&row.capacity);
        let enrolled = parse_count(&row.enrolled);

        let records: Vec<CourseRecord> = align(&days, &times.value, &classrooms.value)
            .into_iter()
            .map(|(day, time, classroom)| CourseRecord {
                crn: row.crn.clone(),
                code: row.code.clone(),
                name: row.name.clone(),
                teaching_method: row.teaching_method.clone(),
                instructor: row.instructor.clone(),
                building: building.clone(),
                day,
                time,
                classroom,
                capacity,
                enrolled,
            })
            .collect();

        report.records += records.len();
        records
    }
}
