//! Service layer for the timetable sync application.
//!
//! This module contains the row-level business logic:
//! - Cell parsing (`FieldParsers`)
//! - Per-day record expansion (`RecordExpander`)
//! - Table extraction from saved pages (`TableReader`)

pub mod expand;
pub mod fields;
mod table;

pub use expand::{ParseReport, RecordExpander, align};
pub use fields::{FieldParsers, Fallback, Parsed, advance_minute, clean_building};
pub use table::TableReader;
