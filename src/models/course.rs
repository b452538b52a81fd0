// src/models/course.rs

//! Course record and raw table row data structures.

use serde::{Deserialize, Serialize};

/// A class meeting time, both ends as `HH:MM` (or empty when unknown).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeSpan {
    pub start: String,
    pub end: String,
}

impl TimeSpan {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

/// One timetable entry for a single weekday. This is the persisted unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CourseRecord {
    /// Course registration number
    pub crn: String,

    /// Course code (e.g., "BLG 101E")
    pub code: String,

    /// Course title
    pub name: String,

    /// Teaching method (e.g., "Yüz yüze")
    pub teaching_method: String,

    /// Instructor name(s)
    pub instructor: String,

    /// Building name with doubled scrape artifacts removed
    pub building: String,

    /// Weekday label, one of the configured canonical labels
    pub day: String,

    /// Meeting time on this day
    pub time: TimeSpan,

    /// Classroom on this day (empty when unknown)
    pub classroom: String,

    #[serde(default)]
    pub capacity: u32,

    #[serde(default)]
    pub enrolled: u32,
}

/// Column positions of a source timetable row.
pub mod columns {
    pub const CRN: usize = 0;
    pub const CODE: usize = 1;
    pub const NAME: usize = 2;
    pub const TEACHING_METHOD: usize = 3;
    pub const INSTRUCTOR: usize = 4;
    pub const BUILDING: usize = 5;
    pub const DAY: usize = 6;
    pub const TIME: usize = 7;
    pub const CLASSROOM: usize = 8;
    pub const CAPACITY: usize = 9;
    pub const ENROLLED: usize = 10;
}

/// Minimum number of cells a source row must carry.
pub const MIN_ROW_CELLS: usize = 10;

/// One unprocessed table row, cells already named by column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub crn: String,
    pub code: String,
    pub name: String,
    pub teaching_method: String,
    pub instructor: String,
    pub building: String,
    pub day: String,
    pub time: String,
    pub classroom: String,
    pub capacity: String,
    pub enrolled: String,
}

impl RawRow {
    /// Build a row from positional cells.
    ///
    /// Returns `None` when the row has fewer than `min_cells` cells. A row
    /// with exactly ten cells has no enrollment column and reads it as empty.
    pub fn from_cells<S: AsRef<str>>(cells: &[S], min_cells: usize) -> Option<Self> {
        if cells.len() < min_cells.max(MIN_ROW_CELLS) {
            return None;
        }

        let cell = |idx: usize| -> String {
            cells
                .get(idx)
                .map(|c| normalize_cell(c.as_ref()))
                .unwrap_or_default()
        };

        Some(Self {
            crn: cell(columns::CRN),
            code: cell(columns::CODE),
            name: cell(columns::NAME),
            teaching_method: cell(columns::TEACHING_METHOD),
            instructor: cell(columns::INSTRUCTOR),
            building: cell(columns::BUILDING),
            day: cell(columns::DAY),
            time: cell(columns::TIME),
            classroom: cell(columns::CLASSROOM),
            capacity: cell(columns::CAPACITY),
            enrolled: cell(columns::ENROLLED),
        })
    }
}

/// Trim a cell and flatten embedded newlines into spaces.
pub fn normalize_cell(text: &str) -> String {
    text.trim().replace('\n', " ")
}

/// Parse a count cell; anything that is not purely ASCII digits reads as 0.
pub fn parse_count(text: &str) -> u32 {
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        text.parse().unwrap_or(0)
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("c{i}")).collect()
    }

    #[test]
    fn test_from_cells_rejects_short_rows() {
        assert!(RawRow::from_cells(&cells(9), MIN_ROW_CELLS).is_none());
        assert!(RawRow::from_cells::<String>(&[], MIN_ROW_CELLS).is_none());
    }

    #[test]
    fn test_from_cells_ten_cells_has_empty_enrolled() {
        let row = RawRow::from_cells(&cells(10), MIN_ROW_CELLS).unwrap();
        assert_eq!(row.crn, "c0");
        assert_eq!(row.capacity, "c9");
        assert_eq!(row.enrolled, "");
    }

    #[test]
    fn test_from_cells_normalizes_text() {
        let mut raw = cells(11);
        raw[4] = "  Doe\nSmith ".to_string();
        let row = RawRow::from_cells(&raw, MIN_ROW_CELLS).unwrap();
        assert_eq!(row.instructor, "Doe Smith");
        assert_eq!(row.enrolled, "c10");
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("30"), 30);
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("-3"), 0);
        assert_eq!(parse_count("12a"), 0);
        assert_eq!(parse_count("99999999999999"), 0);
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = CourseRecord {
            crn: "1".into(),
            code: "C".into(),
            name: "N".into(),
            teaching_method: "Örgün".into(),
            instructor: "I".into(),
            building: "B".into(),
            day: "Salı".into(),
            time: TimeSpan::new("09:00", "10:51"),
            classroom: "A1".into(),
            capacity: 3,
            enrolled: 2,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"teachingMethod\":\"Örgün\""));
        assert!(json.contains("\"time\":{\"start\":\"09:00\",\"end\":\"10:51\"}"));
    }
}
