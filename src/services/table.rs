// src/services/table.rs

//! Row extraction from saved timetable pages.
//!
//! The page itself is produced by an external scraper; this only reads the
//! table out of the HTML (or out of a JSON dump of cell arrays).

use scraper::{Html, Selector};

use crate::error::{AppError, Result};
use crate::models::SourceConfig;

/// Reads timetable rows as lists of cell text.
#[derive(Debug, Clone)]
pub struct TableReader {
    row_selector: Selector,
    cell_selector: Selector,
}

impl TableReader {
    /// Create a reader with the configured selectors.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(Self {
            row_selector: Self::parse_selector(&config.row_selector)?,
            cell_selector: Self::parse_selector(&config.cell_selector)?,
        })
    }

    /// Extract every matching row from an HTML document.
    pub fn read_html(&self, html: &str) -> Vec<Vec<String>> {
        let document = Html::parse_document(html);
        document
            .select(&self.row_selector)
            .map(|row| {
                row.select(&self.cell_selector)
                    .map(|cell| cell.text().collect::<String>())
                    .collect()
            })
            .collect()
    }

    /// Parse a JSON array of rows, each an array of cell strings.
    pub fn read_json(json: &str) -> Result<Vec<Vec<String>>> {
        Ok(serde_json::from_str(json)?)
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }
}
