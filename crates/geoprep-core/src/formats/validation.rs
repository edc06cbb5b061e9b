use crate::error::{GeoprepError, Result};
use crate::formats::FormatValidation;
use std::path::Path;

/// Size above which a file is reported as large
const LARGE_FILE_MB: u64 = 100;

pub struct FormatValidator;

impl FormatValidator {
    /// Validate that a file exists and is readable
    pub fn validate_file_exists(path: &Path) -> FormatValidation {
        let mut validation = FormatValidation::default();

        if !path.exists() {
            validation.errors.push(format!("File not found: {}", path.display()));
            return validation;
        }
        if let Err(e) = std::fs::metadata(path) {
            validation.errors.push(format!("Cannot access file: {}", e));
        }

        validation
    }

    /// Validate that required component files exist for multi-file formats
    pub fn validate_component_files(
        base_path: &Path,
        required_extensions: &[&str],
        optional_extensions: &[&str],
    ) -> FormatValidation {
        let mut validation = FormatValidation::default();

        for ext in required_extensions {
            let component_path = base_path.with_extension(ext);
            if !component_path.exists() {
                validation
                    .errors
                    .push(format!("Missing required file: {}", component_path.display()));
            }
        }

        for ext in optional_extensions {
            let component_path = base_path.with_extension(ext);
            if !component_path.exists() {
                validation.warnings.push(format!(
                    "Optional file not found: {} (may affect functionality)",
                    component_path.display()
                ));
            }
        }

        validation
    }

    /// Warn about files large enough to make a single-pass rewrite slow
    pub fn validate_file_size(path: &Path) -> FormatValidation {
        let mut validation = FormatValidation::default();

        match std::fs::metadata(path) {
            Ok(metadata) => {
                let size_mb = metadata.len() / (1024 * 1024);
                if size_mb > LARGE_FILE_MB {
                    validation.warnings.push(format!(
                        "Very large file ({} MB) is loaded into memory in one piece",
                        size_mb
                    ));
                }
            }
            Err(e) => {
                validation.errors.push(format!("Cannot read file metadata: {}", e));
            }
        }

        validation
    }

    /// Validate JSON structure by attempting to parse
    pub fn validate_json_structure(path: &Path) -> FormatValidation {
        let mut validation = FormatValidation::default();

        match std::fs::read_to_string(path) {
            Ok(content) => {
                let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
                if let Err(e) = serde_json::from_str::<serde_json::Value>(content) {
                    validation.errors.push(format!("Invalid JSON structure: {}", e));
                }
            }
            Err(e) => {
                validation.errors.push(format!("Cannot read file: {}", e));
            }
        }

        validation
    }

    /// Merge multiple validation results
    pub fn merge_validations(validations: Vec<FormatValidation>) -> FormatValidation {
        let mut merged = FormatValidation::default();

        for validation in validations {
            merged.errors.extend(validation.errors);
            merged.warnings.extend(validation.warnings);
        }

        merged
    }

    /// Convert a validation result to a Result type
    pub fn validation_to_result(validation: &FormatValidation, format_name: &str) -> Result<()> {
        if !validation.is_valid() {
            Err(GeoprepError::FormatError {
                format: format_name.to_string(),
                message: validation.errors.join("; "),
            })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_validate_file_exists() {
        let temp_dir = tempfile::tempdir().unwrap();
        let existing_file = create_test_file(&temp_dir, "test.geojson", "{}");
        let nonexistent_file = temp_dir.path().join("nonexistent.geojson");

        assert!(FormatValidator::validate_file_exists(&existing_file).is_valid());

        let validation = FormatValidator::validate_file_exists(&nonexistent_file);
        assert!(!validation.is_valid());
        assert!(!validation.errors.is_empty());
    }

    #[test]
    fn test_validate_component_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let base_path = temp_dir.path().join("sig");

        create_test_file(&temp_dir, "sig.shp", "");
        create_test_file(&temp_dir, "sig.dbf", "");

        let validation =
            FormatValidator::validate_component_files(&base_path, &["shp", "shx", "dbf"], &["prj"]);

        assert!(!validation.is_valid());
        assert!(validation.errors.iter().any(|e| e.contains(".shx")));
        assert!(validation.has_warnings());
        assert!(validation.warnings.iter().any(|w| w.contains(".prj")));
    }

    #[test]
    fn test_validate_file_size_small_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let small_file = create_test_file(&temp_dir, "small.geojson", "{}");

        let validation = FormatValidator::validate_file_size(&small_file);
        assert!(validation.is_valid());
        assert!(!validation.has_warnings());

        let missing = FormatValidator::validate_file_size(&temp_dir.path().join("missing.geojson"));
        assert!(!missing.is_valid());
    }

    #[test]
    fn test_validate_json_structure() {
        let temp_dir = tempfile::tempdir().unwrap();
        let valid_json = create_test_file(&temp_dir, "valid.json", r#"{"type": "Point"}"#);
        let bom_json = create_test_file(&temp_dir, "bom.json", "\u{feff}{\"type\": \"Point\"}");
        let invalid_json = create_test_file(&temp_dir, "invalid.json", "not json");

        assert!(FormatValidator::validate_json_structure(&valid_json).is_valid());
        assert!(FormatValidator::validate_json_structure(&bom_json).is_valid());
        assert!(!FormatValidator::validate_json_structure(&invalid_json).is_valid());
    }

    #[test]
    fn test_merge_and_convert() {
        let mut first = FormatValidation::default();
        first.errors.push("Error 1".to_string());
        let mut second = FormatValidation::default();
        second.warnings.push("Warning 1".to_string());

        let merged = FormatValidator::merge_validations(vec![first, second]);
        assert_eq!(merged.errors.len(), 1);
        assert_eq!(merged.warnings.len(), 1);

        let err = FormatValidator::validation_to_result(&merged, "GeoJSON").unwrap_err();
        assert_eq!(err.to_string(), "GeoJSON error: Error 1");
        assert!(FormatValidator::validation_to_result(&FormatValidation::default(), "GeoJSON")
            .is_ok());
    }
}
