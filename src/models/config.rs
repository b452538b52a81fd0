//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::course::MIN_ROW_CELLS;
use crate::pipeline::hash::transliterate;

/// Upper bound on operations a single store commit may carry.
pub const MAX_BATCH_SIZE: usize = 500;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Cell parsing rules
    #[serde(default)]
    pub parsing: ParsingConfig,

    /// Input table extraction settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Document store sync settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Script export settings
    #[serde(default)]
    pub export: ExportConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Serialize the configuration back to TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        self.parsing.validate()?;

        if Selector::parse(&self.source.row_selector).is_err() {
            return Err(AppError::selector(
                &self.source.row_selector,
                "source.row_selector does not parse",
            ));
        }
        if Selector::parse(&self.source.cell_selector).is_err() {
            return Err(AppError::selector(
                &self.source.cell_selector,
                "source.cell_selector does not parse",
            ));
        }
        if self.source.max_concurrent == 0 {
            return Err(AppError::config("source.max_concurrent must be > 0"));
        }

        if self.sync.collection.trim().is_empty() {
            return Err(AppError::config("sync.collection is empty"));
        }
        if self.sync.batch_size == 0 || self.sync.batch_size > MAX_BATCH_SIZE {
            return Err(AppError::config(format!(
                "sync.batch_size must be between 1 and {MAX_BATCH_SIZE}"
            )));
        }
        if self.sync.circuit_breaker.max_drop_percent > 100 {
            return Err(AppError::config(
                "sync.circuit_breaker.max_drop_percent must be <= 100",
            ));
        }

        if self.export.variable_name.trim().is_empty() {
            return Err(AppError::config("export.variable_name is empty"));
        }
        if self.export.file_name.trim().is_empty() {
            return Err(AppError::config("export.file_name is empty"));
        }
        Ok(())
    }
}

/// Rules for turning raw cells into structured values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsingConfig {
    /// Canonical weekday labels, in week order
    #[serde(default = "defaults::weekdays")]
    pub weekdays: Vec<String>,

    /// Time span patterns, tried in order; each captures start and end
    #[serde(default = "defaults::time_patterns")]
    pub time_patterns: Vec<String>,

    /// Pattern matching one classroom token
    #[serde(default = "defaults::classroom_pattern")]
    pub classroom_pattern: String,

    /// Rows with fewer cells are rejected
    #[serde(default = "defaults::min_cells")]
    pub min_cells: usize,
}

impl ParsingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.weekdays.is_empty() {
            return Err(AppError::config("parsing.weekdays is empty"));
        }
        if self.weekdays.iter().any(|d| d.trim().is_empty()) {
            return Err(AppError::config("parsing.weekdays has an empty label"));
        }

        let mut labels = HashSet::new();
        let mut keys = HashSet::new();
        for day in &self.weekdays {
            if !labels.insert(day.as_str()) {
                return Err(AppError::config(format!(
                    "parsing.weekdays repeats '{day}'"
                )));
            }
            // Document ids embed the transliterated label, so it must stay unique.
            if !keys.insert(transliterate(day)) {
                return Err(AppError::config(format!(
                    "parsing.weekdays label '{day}' collides with another after transliteration"
                )));
            }
        }

        if self.time_patterns.is_empty() {
            return Err(AppError::config("parsing.time_patterns is empty"));
        }
        for pattern in &self.time_patterns {
            let re = Regex::new(pattern)?;
            if re.captures_len() < 3 {
                return Err(AppError::config(format!(
                    "time pattern '{pattern}' must capture start and end"
                )));
            }
        }
        Regex::new(&self.classroom_pattern)?;

        if self.min_cells < MIN_ROW_CELLS {
            return Err(AppError::config(format!(
                "parsing.min_cells must be >= {MIN_ROW_CELLS}"
            )));
        }
        Ok(())
    }
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            weekdays: defaults::weekdays(),
            time_patterns: defaults::time_patterns(),
            classroom_pattern: defaults::classroom_pattern(),
            min_cells: defaults::min_cells(),
        }
    }
}

/// Where rows come from in a saved timetable page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// CSS selector for course rows
    #[serde(default = "defaults::row_selector")]
    pub row_selector: String,

    /// CSS selector for cells within a row
    #[serde(default = "defaults::cell_selector")]
    pub cell_selector: String,

    /// Maximum input files read at once
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            row_selector: defaults::row_selector(),
            cell_selector: defaults::cell_selector(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// What happens to stored documents the current run no longer produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StalePolicy {
    /// Leave them in place (append/overwrite only)
    #[default]
    Retain,
    /// Delete them so the collection mirrors the current run
    Remove,
}

/// Document store sync settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Collection the records are written to
    #[serde(default = "defaults::collection")]
    pub collection: String,

    /// Operations per commit
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,

    #[serde(default)]
    pub stale_policy: StalePolicy,

    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            collection: defaults::collection(),
            batch_size: defaults::batch_size(),
            stale_policy: StalePolicy::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Maximum allowed drop percentage (0-100). Default: 20%
    #[serde(default = "defaults::max_drop_percent")]
    pub max_drop_percent: u8,
    /// Minimum stored document count before drops are checked.
    #[serde(default = "defaults::min_baseline")]
    pub min_baseline: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            max_drop_percent: defaults::max_drop_percent(),
            min_baseline: defaults::min_baseline(),
        }
    }
}

/// Script export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Name of the constant the records are assigned to
    #[serde(default = "defaults::variable_name")]
    pub variable_name: String,

    /// Output file, relative to the storage directory
    #[serde(default = "defaults::file_name")]
    pub file_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            variable_name: defaults::variable_name(),
            file_name: defaults::file_name(),
        }
    }
}

mod defaults {
    // Parsing defaults
    pub fn weekdays() -> Vec<String> {
        ["Pazartesi", "Salı", "Çarşamba", "Perşembe", "Cuma"]
            .into_iter()
            .map(String::from)
            .collect()
    }
    pub fn time_patterns() -> Vec<String> {
        vec![
            r"(\d{2}:\d{2})[-/](\d{2}:\d{2})".into(),
            r"(\d{2}:\d{2})\s+(\d{2}:\d{2})".into(),
        ]
    }
    pub fn classroom_pattern() -> String {
        r"[A-Za-z0-9]+(?:-[A-Za-z0-9]+)?".into()
    }
    pub fn min_cells() -> usize {
        super::MIN_ROW_CELLS
    }

    // Source defaults
    pub fn row_selector() -> String {
        "#dersProgramContainer tbody tr".into()
    }
    pub fn cell_selector() -> String {
        "td".into()
    }
    pub fn max_concurrent() -> usize {
        4
    }

    // Sync defaults
    pub fn collection() -> String {
        "2025-2026-bahar".into()
    }
    pub fn batch_size() -> usize {
        400
    }
    pub fn max_drop_percent() -> u8 {
        20
    }
    pub fn min_baseline() -> usize {
        10
    }

    // Export defaults
    pub fn variable_name() -> String {
        "courseData".into()
    }
    pub fn file_name() -> String {
        "course_data.js".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_batch_size() {
        let mut config = Config::default();
        config.sync.batch_size = 0;
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn validate_rejects_oversized_batch() {
        let mut config = Config::default();
        config.sync.batch_size = MAX_BATCH_SIZE + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_colliding_weekdays() {
        let mut config = Config::default();
        config.parsing.weekdays = vec!["Salı".into(), "Sali".into()];
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn validate_rejects_pattern_without_groups() {
        let mut config = Config::default();
        config.parsing.time_patterns = vec![r"\d{2}:\d{2}".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_regex() {
        let mut config = Config::default();
        config.parsing.classroom_pattern = "([".into();
        assert!(matches!(config.validate(), Err(AppError::Regex(_))));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [sync]
            batch_size = 100
            stale_policy = "remove"
            "#,
        )
        .unwrap();
        assert_eq!(config.sync.batch_size, 100);
        assert_eq!(config.sync.stale_policy, StalePolicy::Remove);
        assert_eq!(config.sync.collection, "2025-2026-bahar");
        assert_eq!(config.parsing.weekdays.len(), 5);
        assert_eq!(config.export.variable_name, "courseData");
    }

    #[test]
    fn toml_round_trip() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.parsing.weekdays, config.parsing.weekdays);
        assert_eq!(back.sync.batch_size, 400);
    }
}
