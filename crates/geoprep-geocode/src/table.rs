//! CSV tables for the geocoding batch
//!
//! Input is UTF-8 with or without a byte order mark. Output always carries
//! the mark so spreadsheet tools pick the right encoding for Korean text.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use geoprep_core::error::{GeoprepError, Result};

const BOM: &str = "\u{feff}";

fn csv_error(message: String) -> GeoprepError {
    GeoprepError::FormatError { format: "CSV".to_string(), message }
}

/// A column picked by header name or zero-based position
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSelector {
    Name(String),
    Index(usize),
}

impl FromStr for ColumnSelector {
    type Err = GeoprepError;

    /// All-digit input is a position, anything else a header name
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(GeoprepError::ConfigInvalid {
                key: "column".to_string(),
                reason: "column selector is empty".to_string(),
            });
        }
        match s.parse::<usize>() {
            Ok(index) => Ok(ColumnSelector::Index(index)),
            Err(_) => Ok(ColumnSelector::Name(s.to_string())),
        }
    }
}

impl fmt::Display for ColumnSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnSelector::Name(name) => write!(f, "'{}'", name),
            ColumnSelector::Index(index) => write!(f, "#{}", index),
        }
    }
}

/// A CSV file held in memory
#[derive(Debug, Clone, Default)]
pub struct CsvTable {
    pub headers: StringRecord,
    pub rows: Vec<StringRecord>,
}

impl CsvTable {
    /// Read a CSV file with a header row
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| csv_error(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let content = content.strip_prefix(BOM).unwrap_or(content);

        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(content.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| csv_error(format!("Failed to read header row: {}", e)))?
            .clone();

        let rows = reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| csv_error(format!("Failed to read row: {}", e)))?;

        Ok(Self { headers, rows })
    }

    /// Resolve a selector to a column position
    pub fn column(&self, selector: &ColumnSelector) -> Result<usize> {
        let found = match selector {
            ColumnSelector::Index(index) => (*index < self.headers.len()).then_some(*index),
            ColumnSelector::Name(name) => self.headers.iter().position(|h| h.trim() == name),
        };

        found.ok_or_else(|| {
            csv_error(format!(
                "Column {} not found (table has {} columns: {})",
                selector,
                self.headers.len(),
                self.headers.iter().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    /// Rows whose `column` contains any of `keywords`
    pub fn filter_containing(&self, column: usize, keywords: &[String]) -> CsvTable {
        let rows = self
            .rows
            .iter()
            .filter(|row| {
                let value = row.get(column).unwrap_or("");
                keywords.iter().any(|k| value.contains(k.as_str()))
            })
            .cloned()
            .collect();

        CsvTable { headers: self.headers.clone(), rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Serialize with a leading byte order mark
    pub fn to_csv_string(&self) -> Result<String> {
        let mut writer = WriterBuilder::new().from_writer(Vec::new());

        writer
            .write_record(&self.headers)
            .map_err(|e| csv_error(format!("Failed to write header row: {}", e)))?;
        for row in &self.rows {
            writer
                .write_record(row)
                .map_err(|e| csv_error(format!("Failed to write row: {}", e)))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| csv_error(format!("Failed to flush CSV: {}", e)))?;
        let body = String::from_utf8(bytes)
            .map_err(|e| csv_error(format!("Output is not UTF-8: {}", e)))?;

        Ok(format!("{}{}", BOM, body))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_csv_string()?)?;
        Ok(())
    }
}
