//! Shapefile format reader implementation
//!
//! Reads ESRI Shapefiles with the pure-Rust `shapefile` crate and turns them
//! into a GeoJSON FeatureCollection. Shapefiles consist of multiple component
//! files (.shp, .shx, .dbf and optionally .prj) that must sit side by side.

use shapefile::dbase::FieldValue as DbaseFieldValue;
use shapefile::{PolygonRing, Reader as ShapefileReader, Shape};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{GeoprepError, Result};
use crate::formats::validation::FormatValidator;
use crate::formats::{FormatReader, FormatValidation, SourceDataset};
use crate::models::Crs;

type Position = Vec<f64>;

/// ESRI projection names that carry no AUTHORITY clause
const ESRI_PROJCS_NAMES: &[(&str, u32)] = &[
    ("Korea_2000_Korea_Unified_Coordinate_System", 5179),
    ("Korea_2000_Korea_Central_Belt_2010", 5186),
    ("WGS_1984_Web_Mercator_Auxiliary_Sphere", 3857),
];

/// Shapefile format reader
pub struct ShapefileFormatReader;

impl FormatReader for ShapefileFormatReader {
    fn read(&self, path: &Path) -> Result<SourceDataset> {
        self.verify_components(path)?;

        let mut reader = ShapefileReader::from_path(path).map_err(|e| GeoprepError::FormatError {
            format: "Shapefile".to_string(),
            message: format!("Failed to open Shapefile: {}", e),
        })?;

        let crs = self.extract_crs(path)?.map(Crs::from_epsg);

        let mut features = Vec::new();
        for (index, result) in reader.iter_shapes_and_records().enumerate() {
            let (shape, record) = result.map_err(|e| GeoprepError::FormatError {
                format: "Shapefile".to_string(),
                message: format!("Failed to read feature {}: {}", index, e),
            })?;

            features.push(geojson::Feature {
                bbox: None,
                geometry: convert_shape(&shape)?.map(geojson::Geometry::new),
                id: Some(geojson::feature::Id::Number(index.into())),
                properties: Some(convert_record(record)),
                foreign_members: None,
            });
        }

        tracing::debug!("Read {} shapes from {}", features.len(), path.display());

        let collection = geojson::FeatureCollection { bbox: None, features, foreign_members: None };
        let document = serde_json::to_value(&collection)?;

        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("unnamed").to_string();

        Ok(SourceDataset { name, format_name: "Shapefile".to_string(), crs, document })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["shp"]
    }

    fn format_name(&self) -> &str {
        "Shapefile"
    }

    fn validate(&self, path: &Path) -> Result<FormatValidation> {
        let mut validation = FormatValidator::validate_file_exists(path);
        if !validation.is_valid() {
            return Ok(validation);
        }

        let base = match self.shapefile_base(path) {
            Ok(b) => b,
            Err(e) => {
                validation.errors.push(format!("Invalid Shapefile path: {}", e));
                return Ok(validation);
            }
        };

        let component_validation =
            FormatValidator::validate_component_files(&base, &["shp", "shx", "dbf"], &["prj"]);

        Ok(FormatValidator::merge_validations(vec![validation, component_validation]))
    }
}

impl ShapefileFormatReader {
    /// Get the base path for a Shapefile (without extension)
    fn shapefile_base(&self, path: &Path) -> Result<PathBuf> {
        let is_shp = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("shp"))
            .unwrap_or(false);

        if !is_shp {
            return Err(GeoprepError::InvalidPath {
                path: path.to_path_buf(),
                reason: "Not a Shapefile (.shp)".to_string(),
            });
        }

        Ok(path.with_extension(""))
    }

    /// Verify that all required Shapefile component files exist
    fn verify_components(&self, path: &Path) -> Result<()> {
        let base = self.shapefile_base(path)?;
        let missing: Vec<String> = ["shp", "shx", "dbf"]
            .iter()
            .filter(|ext| !base.with_extension(ext).exists())
            .map(|ext| format!(".{}", ext))
            .collect();

        if !missing.is_empty() {
            return Err(GeoprepError::FormatError {
                format: "Shapefile".to_string(),
                message: format!("Missing required component files: {}", missing.join(", ")),
            });
        }

        Ok(())
    }

    /// EPSG code from the .prj sidecar; `None` when absent or unrecognised
    fn extract_crs(&self, path: &Path) -> Result<Option<u32>> {
        let prj_path = self.shapefile_base(path)?.with_extension("prj");

        if !prj_path.exists() {
            return Ok(None);
        }

        let prj_content = fs::read_to_string(&prj_path).map_err(|e| GeoprepError::FormatError {
            format: "Shapefile".to_string(),
            message: format!("Failed to read .prj file: {}", e),
        })?;

        let epsg = parse_epsg_from_wkt(&prj_content);
        if epsg.is_none() {
            tracing::warn!("Could not determine EPSG code from {}", prj_path.display());
        }
        Ok(epsg)
    }
}

/// Parse an EPSG code from projection WKT
pub fn parse_epsg_from_wkt(wkt: &str) -> Option<u32> {
    // The top-level AUTHORITY closes the WKT, nested ones belong to the datum
    // or spheroid.
    const AUTHORITY: &str = "AUTHORITY[\"EPSG\",\"";
    if let Some(start) = wkt.rfind(AUTHORITY) {
        let code_start = start + AUTHORITY.len();
        if let Some(end) = wkt[code_start..].find('"') {
            if let Ok(code) = wkt[code_start..code_start + end].parse::<u32>() {
                return Some(code);
            }
        }
    }

    if let Some(start) = wkt.find("EPSG:") {
        let code_str: String =
            wkt[start + 5..].chars().take_while(|c| c.is_ascii_digit()).collect();
        if let Ok(code) = code_str.parse::<u32>() {
            return Some(code);
        }
    }

    let trimmed = wkt.trim_start();
    if trimmed.starts_with("PROJCS") {
        return ESRI_PROJCS_NAMES
            .iter()
            .find(|(name, _)| trimmed.contains(name))
            .map(|(_, code)| *code);
    }

    if trimmed.starts_with("GEOGCS") && trimmed.contains("WGS_1984") {
        return Some(4326);
    }

    None
}

trait ToPosition {
    fn to_position(&self) -> Position;
}

impl ToPosition for shapefile::Point {
    fn to_position(&self) -> Position {
        vec![self.x, self.y]
    }
}

// M values have no GeoJSON representation
impl ToPosition for shapefile::PointM {
    fn to_position(&self) -> Position {
        vec![self.x, self.y]
    }
}

impl ToPosition for shapefile::PointZ {
    fn to_position(&self) -> Position {
        vec![self.x, self.y, self.z]
    }
}

/// Convert a shape to a GeoJSON geometry value; `None` for a null shape
fn convert_shape(shape: &Shape) -> Result<Option<geojson::Value>> {
    let value = match shape {
        Shape::NullShape => return Ok(None),
        Shape::Point(p) => geojson::Value::Point(p.to_position()),
        Shape::PointM(p) => geojson::Value::Point(p.to_position()),
        Shape::PointZ(p) => geojson::Value::Point(p.to_position()),
        Shape::Polyline(line) => convert_parts(line.parts()),
        Shape::PolylineM(line) => convert_parts(line.parts()),
        Shape::PolylineZ(line) => convert_parts(line.parts()),
        Shape::Polygon(polygon) => convert_rings(polygon.rings()),
        Shape::PolygonM(polygon) => convert_rings(polygon.rings()),
        Shape::PolygonZ(polygon) => convert_rings(polygon.rings()),
        Shape::Multipoint(mp) => geojson::Value::MultiPoint(positions(mp.points())),
        Shape::MultipointM(mp) => geojson::Value::MultiPoint(positions(mp.points())),
        Shape::MultipointZ(mp) => geojson::Value::MultiPoint(positions(mp.points())),
        Shape::Multipatch(_) => {
            return Err(GeoprepError::FormatError {
                format: "Shapefile".to_string(),
                message: "Multipatch geometry type is not supported".to_string(),
            })
        }
    };
    Ok(Some(value))
}

fn positions<P: ToPosition>(points: &[P]) -> Vec<Position> {
    points.iter().map(ToPosition::to_position).collect()
}

/// A single part becomes a LineString, several a MultiLineString
fn convert_parts<P: ToPosition>(parts: &[Vec<P>]) -> geojson::Value {
    let mut lines: Vec<Vec<Position>> = parts.iter().map(|part| positions(part)).collect();
    if lines.len() == 1 {
        geojson::Value::LineString(lines.remove(0))
    } else {
        geojson::Value::MultiLineString(lines)
    }
}

/// Every outer ring opens a new polygon; inner rings attach to the latest one
fn convert_rings<P: ToPosition>(rings: &[PolygonRing<P>]) -> geojson::Value {
    let mut polygons: Vec<Vec<Vec<Position>>> = Vec::new();

    for ring in rings {
        let ring_positions = positions(ring.points());
        match ring {
            PolygonRing::Outer(_) => polygons.push(vec![ring_positions]),
            PolygonRing::Inner(_) => match polygons.last_mut() {
                Some(polygon) => polygon.push(ring_positions),
                None => polygons.push(vec![ring_positions]),
            },
        }
    }

    if polygons.len() == 1 {
        geojson::Value::Polygon(polygons.remove(0))
    } else {
        geojson::Value::MultiPolygon(polygons)
    }
}

/// dBase attributes as GeoJSON properties, ordered by field name
fn convert_record(record: shapefile::dbase::Record) -> geojson::JsonObject {
    let sorted: BTreeMap<String, serde_json::Value> =
        record.into_iter().map(|(name, value)| (name, convert_dbase_value(&value))).collect();
    sorted.into_iter().collect()
}

fn number(n: f64) -> serde_json::Value {
    serde_json::Number::from_f64(n).map(serde_json::Value::Number).unwrap_or(serde_json::Value::Null)
}

/// Convert dBase field value to JSON value
fn convert_dbase_value(value: &DbaseFieldValue) -> serde_json::Value {
    match value {
        DbaseFieldValue::Character(Some(s)) => serde_json::Value::String(s.trim_end().to_string()),
        DbaseFieldValue::Numeric(Some(n)) => number(*n),
        DbaseFieldValue::Logical(Some(b)) => serde_json::Value::Bool(*b),
        DbaseFieldValue::Date(Some(date)) => serde_json::Value::String(format!(
            "{:04}-{:02}-{:02}",
            date.year(),
            date.month(),
            date.day()
        )),
        DbaseFieldValue::Float(Some(f)) => number(*f as f64),
        DbaseFieldValue::Integer(i) => serde_json::Value::Number((*i).into()),
        DbaseFieldValue::Currency(c) => number(*c),
        DbaseFieldValue::DateTime(dt) => serde_json::Value::String(format!(
            "{:04}-{:02}-{:02}",
            dt.date().year(),
            dt.date().month(),
            dt.date().day()
        )),
        DbaseFieldValue::Double(d) => number(*d),
        DbaseFieldValue::Memo(s) => serde_json::Value::String(s.clone()),
        #[allow(unreachable_patterns)]
        _ => serde_json::Value::Null,
    }
}
