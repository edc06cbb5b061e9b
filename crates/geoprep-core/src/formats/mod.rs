//! Format abstraction layer for input datasets
//!
//! Each supported input format implements the `FormatReader` trait and yields
//! a GeoJSON document, so every downstream operation (reprojection,
//! inspection, conversion) works on a single representation. The
//! `FormatRegistry` picks the reader by file extension.

use std::path::Path;

use crate::error::{GeoprepError, Result};
use crate::models::Crs;

pub mod geojson;
pub mod shapefile;
pub mod validation;

/// Format reader trait that all format implementations must implement
pub trait FormatReader: Send + Sync {
    /// Read a dataset from the given path
    fn read(&self, path: &Path) -> Result<SourceDataset>;

    /// Get supported file extensions (e.g., ["shp"])
    fn supported_extensions(&self) -> &[&str];

    /// Get human-readable format name (e.g., "Shapefile", "GeoJSON")
    fn format_name(&self) -> &str;

    /// Validate file structure without full read
    fn validate(&self, _path: &Path) -> Result<FormatValidation> {
        Ok(FormatValidation::default())
    }
}

/// Result of format validation
#[derive(Debug, Clone, Default)]
pub struct FormatValidation {
    /// Validation errors that prevent reading
    pub errors: Vec<String>,

    /// Warnings that don't prevent reading but indicate potential issues
    pub warnings: Vec<String>,
}

impl FormatValidation {
    /// Check if validation passed (no errors)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Dataset returned by format readers
#[derive(Debug, Clone)]
pub struct SourceDataset {
    /// Dataset name, taken from the file stem
    pub name: String,

    /// Format name (e.g., "Shapefile", "GeoJSON")
    pub format_name: String,

    /// CRS declared by the source, if any
    pub crs: Option<Crs>,

    /// The dataset as a GeoJSON document
    pub document: serde_json::Value,
}

impl SourceDataset {
    /// Declared CRS, or `fallback` when the source declares none
    pub fn crs_or(&self, fallback: &Crs) -> Crs {
        match &self.crs {
            Some(crs) => crs.clone(),
            None => {
                tracing::warn!(
                    "{} '{}' declares no CRS, assuming {}",
                    self.format_name,
                    self.name,
                    fallback
                );
                fallback.clone()
            }
        }
    }

    /// Number of features in the document (1 for a bare Feature or Geometry)
    pub fn feature_count(&self) -> usize {
        self.document
            .get("features")
            .and_then(|f| f.as_array())
            .map(|f| f.len())
            .unwrap_or(1)
    }
}

/// Central registry for format readers
pub struct FormatRegistry {
    readers: Vec<Box<dyn FormatReader>>,
}

impl FormatRegistry {
    /// Create a new empty format registry
    pub fn new() -> Self {
        Self { readers: Vec::new() }
    }

    /// Registry with every built-in reader
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(geojson::GeoJsonReader));
        registry.register(Box::new(shapefile::ShapefileFormatReader));
        registry
    }

    /// Register a format reader
    pub fn register(&mut self, reader: Box<dyn FormatReader>) {
        self.readers.push(reader);
    }

    /// Detect format and return appropriate reader
    pub fn detect_format(&self, path: &Path) -> Result<&dyn FormatReader> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| GeoprepError::UnsupportedFormat {
                extension: "none".to_string(),
                supported: self.supported_formats(),
            })?;

        self.readers
            .iter()
            .find(|r| r.supported_extensions().iter().any(|e| e.eq_ignore_ascii_case(extension)))
            .map(|r| r.as_ref())
            .ok_or_else(|| GeoprepError::UnsupportedFormat {
                extension: extension.to_string(),
                supported: self.supported_formats(),
            })
    }

    /// Detect the format, validate and read in one step
    pub fn read(&self, path: &Path) -> Result<SourceDataset> {
        let reader = self.detect_format(path)?;

        let validation = reader.validate(path)?;
        for warning in &validation.warnings {
            tracing::warn!("{}", warning);
        }
        validation::FormatValidator::validation_to_result(&validation, reader.format_name())?;

        tracing::debug!("Reading {} as {}", path.display(), reader.format_name());
        reader.read(path)
    }

    /// Get list of all supported format extensions
    pub fn supported_formats(&self) -> Vec<String> {
        self.readers
            .iter()
            .flat_map(|r| r.supported_extensions())
            .map(|s| s.to_string())
            .collect()
    }

    /// Get all registered readers
    pub fn readers(&self) -> &[Box<dyn FormatReader>] {
        &self.readers
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}
