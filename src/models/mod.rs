// src/models/mod.rs

//! Domain models for the timetable sync application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

pub mod course;
mod config;

// Re-export all public types
pub use config::{
    CircuitBreakerConfig, Config, ExportConfig, MAX_BATCH_SIZE, ParsingConfig, SourceConfig,
    StalePolicy, SyncConfig,
};
pub use course::{CourseRecord, MIN_ROW_CELLS, RawRow, TimeSpan};
