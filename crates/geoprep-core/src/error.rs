//! Error types for geoprep

use crate::models::CoordinatePath;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeoprepError {
    // Geometry errors
    #[error("Malformed geometry at {path}: {reason}")]
    MalformedGeometry { path: CoordinatePath, reason: String },

    #[error("Projection failed at {path}: {reason}")]
    ProjectionFailure { path: CoordinatePath, reason: String },

    // Format errors
    #[error("{format} error: {message}")]
    FormatError { format: String, message: String },

    #[error("Unsupported format: .{extension} (supported: {})", supported.join(", "))]
    UnsupportedFormat {
        extension: String,
        supported: Vec<String>,
    },

    #[error("Invalid path {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    // Geocoding errors
    #[error("Geocoding failed for '{address}': {reason}")]
    Geocoding { address: String, reason: String },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GeoprepError {
    /// Attach the index of the enclosing feature to a geometry error.
    ///
    /// Errors that carry no coordinate path are returned as-is.
    pub fn in_feature(self, index: usize) -> Self {
        self.map_path(|path| path.in_feature(index))
    }

    /// Prefix a geometry error with the index of the enclosing coordinate array
    pub fn in_coordinate(self, index: usize) -> Self {
        self.map_path(|path| path.in_coordinate(index))
    }

    /// Prefix a geometry error with the index of the enclosing
    /// GeometryCollection member.
    pub fn in_member(self, index: usize) -> Self {
        self.map_path(|path| path.in_member(index))
    }

    /// The coordinate path of a geometry error, if any
    pub fn path(&self) -> Option<&CoordinatePath> {
        match self {
            GeoprepError::MalformedGeometry { path, .. }
            | GeoprepError::ProjectionFailure { path, .. } => Some(path),
            _ => None,
        }
    }

    fn map_path(self, f: impl FnOnce(CoordinatePath) -> CoordinatePath) -> Self {
        match self {
            GeoprepError::MalformedGeometry { path, reason } => {
                GeoprepError::MalformedGeometry { path: f(path), reason }
            }
            GeoprepError::ProjectionFailure { path, reason } => {
                GeoprepError::ProjectionFailure { path: f(path), reason }
            }
            other => other,
        }
    }
}

impl From<serde_json::Error> for GeoprepError {
    fn from(e: serde_json::Error) -> Self {
        GeoprepError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GeoprepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_context_is_prepended() {
        let err = GeoprepError::MalformedGeometry {
            path: CoordinatePath::from_indices(vec![0, 1]),
            reason: "expected a number".to_string(),
        }
        .in_member(2)
        .in_feature(7);

        assert_eq!(
            err.to_string(),
            "Malformed geometry at features[7].geometries[2].coordinates[0][1]: expected a number"
        );
    }

    #[test]
    fn test_non_geometry_errors_have_no_path() {
        let err = GeoprepError::ConfigMissing { key: "kakao_api_key".to_string() }.in_feature(3);
        assert!(err.path().is_none());
        assert_eq!(err.to_string(), "Missing required configuration: kakao_api_key");
    }
}
