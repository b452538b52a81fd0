// src/error.rs

//! Unified error handling for the timetable sync application.

use std::fmt;

use thiserror::Error;

/// Result type alias for timetable operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization failed
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Regex compilation failed
    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Document store read failed
    #[error("Store error: {0}")]
    Store(String),

    /// A write batch could not be committed; the sync pass is aborted
    #[error("Commit of batch {batch} ({operations} operations) failed: {message}")]
    Commit {
        batch: usize,
        operations: usize,
        message: String,
    },

    /// Circuit breaker refused a sync that would delete stale documents
    #[error(
        "Circuit breaker triggered: run covers {covered} of {stored} documents \
         ({drop_percent:.1}% drop > {threshold_percent}% threshold)"
    )]
    CircuitBreakerTriggered {
        covered: usize,
        stored: usize,
        drop_percent: f64,
        threshold_percent: u8,
    },

    /// Replacing sync with no records while the store is populated
    #[error("Refusing to replace a populated collection with an empty record set")]
    EmptySyncResult,
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a store error.
    pub fn store(message: impl fmt::Display) -> Self {
        Self::Store(message.to_string())
    }

    /// Create a commit error for the given batch.
    pub fn commit(batch: usize, operations: usize, message: impl fmt::Display) -> Self {
        Self::Commit {
            batch,
            operations,
            message: message.to_string(),
        }
    }
}
