//! GeoJSON document reading and writing
//!
//! Documents are kept as `serde_json::Value` rather than typed `geojson`
//! structures so that malformed coordinates survive parsing and can be
//! reported with their exact position by the coordinate walker, and so that
//! unknown members round-trip untouched and in their original order.

use std::fs;
use std::path::Path;

use crate::error::{GeoprepError, Result};
use crate::formats::validation::FormatValidator;
use crate::formats::{FormatReader, FormatValidation, SourceDataset};
use crate::models::Crs;

const GEOMETRY_TYPES: &[&str] = &[
    "Point",
    "LineString",
    "Polygon",
    "MultiPoint",
    "MultiLineString",
    "MultiPolygon",
    "GeometryCollection",
];

/// GeoJSON format reader
pub struct GeoJsonReader;

impl FormatReader for GeoJsonReader {
    fn read(&self, path: &Path) -> Result<SourceDataset> {
        let document = read_document(path)?;
        let crs = declared_crs(&document).map(Crs::from_epsg);

        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("unnamed").to_string();

        Ok(SourceDataset { name, format_name: "GeoJSON".to_string(), crs, document })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["json", "geojson"]
    }

    fn format_name(&self) -> &str {
        "GeoJSON"
    }

    fn validate(&self, path: &Path) -> Result<FormatValidation> {
        let validation = FormatValidator::validate_file_exists(path);
        if !validation.is_valid() {
            return Ok(validation);
        }

        let mut json_validation = FormatValidator::validate_json_structure(path);

        // Strict RFC 7946 parsing is advisory only: the coordinate walker
        // reports malformed geometry with a precise location later on.
        if json_validation.is_valid() {
            match fs::read_to_string(path) {
                Ok(content) => {
                    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
                    if let Err(e) = content.parse::<geojson::GeoJson>() {
                        json_validation.warnings.push(format!("Not strictly valid GeoJSON: {}", e));
                    }
                }
                Err(e) => json_validation.errors.push(format!("Cannot read file: {}", e)),
            }
        }

        Ok(FormatValidator::merge_validations(vec![
            validation,
            FormatValidator::validate_file_size(path),
            json_validation,
        ]))
    }
}

/// Read and parse a GeoJSON document from disk
pub fn read_document(path: &Path) -> Result<serde_json::Value> {
    let content = fs::read_to_string(path)?;
    parse_document(&content)
}

/// Parse a GeoJSON document, checking only its top-level shape
pub fn parse_document(content: &str) -> Result<serde_json::Value> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let document: serde_json::Value =
        serde_json::from_str(content).map_err(|e| GeoprepError::FormatError {
            format: "GeoJSON".to_string(),
            message: format!("Failed to parse JSON: {}", e),
        })?;

    check_document_type(&document)?;
    Ok(document)
}

fn check_document_type(document: &serde_json::Value) -> Result<()> {
    let format_error = |message: String| GeoprepError::FormatError {
        format: "GeoJSON".to_string(),
        message,
    };

    let kind = document
        .get("type")
        .and_then(|t| t.as_str())
        .ok_or_else(|| format_error("Top-level object has no \"type\" member".to_string()))?;

    match kind {
        "FeatureCollection" => {
            if !document.get("features").is_some_and(|f| f.is_array()) {
                return Err(format_error(
                    "FeatureCollection must have a \"features\" array".to_string(),
                ));
            }
            Ok(())
        }
        "Feature" => Ok(()),
        kind if GEOMETRY_TYPES.contains(&kind) => Ok(()),
        other => Err(format_error(format!("Unknown GeoJSON type \"{}\"", other))),
    }
}

/// EPSG code named by a legacy `crs` member, if present
pub fn declared_crs(document: &serde_json::Value) -> Option<u32> {
    let name = document.get("crs")?.get("properties")?.get("name")?.as_str()?;
    name.parse::<Crs>().ok().map(|crs| crs.epsg)
}

/// Point an existing legacy `crs` member at `crs`.
///
/// Documents without a `crs` member are left alone; RFC 7946 dropped it.
pub fn set_declared_crs(document: &mut serde_json::Value, crs: &Crs) {
    if let Some(member) = document.get_mut("crs") {
        *member = serde_json::json!({
            "type": "name",
            "properties": { "name": crs.ogc_urn() }
        });
    }
}

/// Name `crs` in a legacy `crs` member placed right after `type`.
///
/// An existing member is replaced where it stands.
pub fn declare_crs(document: &mut serde_json::Value, crs: &Crs) {
    let member = serde_json::json!({
        "type": "name",
        "properties": { "name": crs.ogc_urn() }
    });

    let Some(object) = document.as_object_mut() else {
        return;
    };
    if let Some(existing) = object.get_mut("crs") {
        *existing = member;
        return;
    }

    let mut rebuilt = serde_json::Map::with_capacity(object.len() + 1);
    for (key, value) in std::mem::take(object) {
        let is_type = key == "type";
        rebuilt.insert(key, value);
        if is_type {
            rebuilt.insert("crs".to_string(), member.clone());
        }
    }
    if !rebuilt.contains_key("crs") {
        rebuilt.insert("crs".to_string(), member);
    }
    *object = rebuilt;
}

/// Serialize a document; non-ASCII text is written as-is
pub fn to_string(document: &serde_json::Value, pretty: bool) -> Result<String> {
    let mut text = if pretty {
        serde_json::to_string_pretty(document)?
    } else {
        serde_json::to_string(document)?
    };
    text.push('\n');
    Ok(text)
}

/// Write a document to disk as UTF-8
pub fn write_document(path: &Path, document: &serde_json::Value, pretty: bool) -> Result<()> {
    let text = to_string(document, pretty)?;
    fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geojson_reader_feature_collection() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("sig.geojson");

        let content = r#"{
            "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::5179" } },
            "features": [
                {
                    "type": "Feature",
                    "properties": { "SIG_KOR_NM": "종로구" },
                    "geometry": { "type": "Point", "coordinates": [953000.0, 1952000.0] }
                }
            ]
        }"#;
        fs::write(&file_path, content).unwrap();

        let dataset = GeoJsonReader.read(&file_path).unwrap();

        assert_eq!(dataset.name, "sig");
        assert_eq!(dataset.crs.as_ref().map(|c| c.epsg), Some(5179));
        assert_eq!(dataset.feature_count(), 1);
    }

    #[test]
    fn test_parse_rejects_non_geojson() {
        assert!(parse_document(r#"{"hello": "world"}"#).is_err());
        assert!(parse_document(r#"{"type": "Topology"}"#).is_err());
        assert!(parse_document(r#"{"type": "FeatureCollection"}"#).is_err());
        assert!(parse_document("[1, 2]").is_err());
    }

    #[test]
    fn test_parse_accepts_malformed_coordinates() {
        // Coordinate shape is checked later, where the location can be reported
        let doc = parse_document(r#"{"type": "LineString", "coordinates": [[0, 0], "x"]}"#);
        assert!(doc.is_ok());
    }

    #[test]
    fn test_declared_crs_forms() {
        let urn = serde_json::json!({"crs": {"properties": {"name": "urn:ogc:def:crs:EPSG::3857"}}});
        let short = serde_json::json!({"crs": {"properties": {"name": "EPSG:5179"}}});
        let crs84 = serde_json::json!({"crs": {"properties": {"name": "urn:ogc:def:crs:OGC:1.3:CRS84"}}});
        let unknown = serde_json::json!({"crs": {"properties": {"name": "urn:ogc:def:crs:OGC:1.3:CRS27"}}});
        let absent = serde_json::json!({"type": "FeatureCollection"});

        assert_eq!(declared_crs(&urn), Some(3857));
        assert_eq!(declared_crs(&short), Some(5179));
        assert_eq!(declared_crs(&crs84), Some(4326));
        assert_eq!(declared_crs(&unknown), None);
        assert_eq!(declared_crs(&absent), None);
    }

    #[test]
    fn test_set_declared_crs_only_rewrites_existing_member() {
        let mut with_crs = serde_json::json!({"crs": {"properties": {"name": "EPSG:5179"}}});
        set_declared_crs(&mut with_crs, &Crs::wgs84());
        assert_eq!(declared_crs(&with_crs), Some(4326));

        let mut without = serde_json::json!({"type": "FeatureCollection", "features": []});
        set_declared_crs(&mut without, &Crs::wgs84());
        assert!(without.get("crs").is_none());
    }

    #[test]
    fn test_declare_crs_inserts_after_type() {
        let mut doc = serde_json::json!({"type": "FeatureCollection", "features": []});
        declare_crs(&mut doc, &Crs::korea_2000_unified());

        let keys: Vec<&String> = doc.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["type", "crs", "features"]);
        assert_eq!(declared_crs(&doc), Some(5179));

        declare_crs(&mut doc, &Crs::wgs84());
        assert_eq!(declared_crs(&doc), Some(4326));
        assert_eq!(doc.as_object().unwrap().len(), 3);
    }

    #[test]
    fn test_to_string_keeps_non_ascii_and_member_order() {
        let doc = parse_document(
            r#"{"type":"Feature","properties":{"name":"서울특별시","code":11},"geometry":null}"#,
        )
        .unwrap();

        let text = to_string(&doc, false).unwrap();
        assert_eq!(
            text,
            "{\"type\":\"Feature\",\"properties\":{\"name\":\"서울특별시\",\"code\":11},\"geometry\":null}\n"
        );
    }

    #[test]
    fn test_pretty_output_uses_two_space_indent() {
        let doc = serde_json::json!({"type": "Point", "coordinates": [1.0, 2.0]});
        let text = to_string(&doc, true).unwrap();
        assert!(text.contains("\n  \"coordinates\""));
    }
}
