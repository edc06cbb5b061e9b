//! Inspect command implementation

use crate::cli::InspectArgs;
use crate::output::OutputWriter;
use crate::output_types::InspectOutput;
use anyhow::Result;
use geoprep_core::formats::geojson::declared_crs;
use geoprep_geo::coordinates::{merge_bounds, CoordinateNode};
use geoprep_geo::{reproject_document, Identity};
use serde_json::Value;
use std::collections::BTreeMap;
use tabled::Tabled;

pub fn execute(args: InspectArgs, output: &OutputWriter) -> Result<()> {
    let dataset = super::read_input(&args.input)?;

    // Walking with the identity projector rejects malformed geometry
    let (_, summary) = reproject_document(&dataset.document, &Identity)?;

    let mut geometry_types = BTreeMap::new();
    let mut bbox = None;
    for geometry in geometries(&dataset.document) {
        tally_geometry(geometry, &mut geometry_types, &mut bbox)?;
    }

    let report = InspectOutput {
        name: dataset.name.clone(),
        format: dataset.format_name.clone(),
        document_type: dataset.document.get("type").and_then(Value::as_str).unwrap_or("unknown").to_string(),
        feature_count: summary.features,
        coordinate_count: summary.coordinates,
        null_geometries: summary.null_geometries,
        declared_crs: dataset.crs.as_ref().map(|c| c.epsg).or_else(|| declared_crs(&dataset.document)),
        geometry_types,
        bbox,
    };

    if output.is_json() {
        output.result(report)?;
        return Ok(());
    }

    output.section(format!("{} ({})", report.name, report.format));
    output.kv("Type", &report.document_type);
    output.kv("Features", report.feature_count);
    output.kv("Positions", report.coordinate_count);
    output.kv("Without geometry", report.null_geometries);
    output.kv(
        "Declared CRS",
        report.declared_crs.map(|c| format!("EPSG:{}", c)).unwrap_or_else(|| "none".to_string()),
    );
    if let Some([min_x, min_y, max_x, max_y]) = report.bbox {
        output.kv("Extent", format!("[{}, {}] - [{}, {}]", min_x, min_y, max_x, max_y));
    }

    #[derive(Tabled)]
    struct GeometryTypeRow {
        #[tabled(rename = "Geometry")]
        geometry_type: String,
        #[tabled(rename = "Count")]
        count: usize,
    }

    output.section("Geometry Types");
    let rows: Vec<GeometryTypeRow> = report
        .geometry_types
        .iter()
        .map(|(geometry_type, count)| GeometryTypeRow { geometry_type: geometry_type.clone(), count: *count })
        .collect();
    output.table(rows);

    Ok(())
}

/// Top-level geometries of a document; null geometries are skipped
fn geometries(document: &Value) -> Vec<&Value> {
    match document.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => document
            .get("features")
            .and_then(Value::as_array)
            .map(|features| features.iter().filter_map(geometry_of).collect())
            .unwrap_or_default(),
        Some("Feature") => geometry_of(document).into_iter().collect(),
        _ => vec![document],
    }
}

fn geometry_of(feature: &Value) -> Option<&Value> {
    feature.get("geometry").filter(|g| !g.is_null())
}

fn tally_geometry(
    geometry: &Value,
    types: &mut BTreeMap<String, usize>,
    bbox: &mut Option<[f64; 4]>,
) -> Result<()> {
    let kind = geometry.get("type").and_then(Value::as_str).unwrap_or("unknown");
    *types.entry(kind.to_string()).or_insert(0) += 1;

    if let Some(coordinates) = geometry.get("coordinates").filter(|c| !c.is_null()) {
        if let Some(bounds) = CoordinateNode::from_value(coordinates)?.bounds() {
            *bbox = Some(match *bbox {
                Some(current) => merge_bounds(current, bounds),
                None => bounds,
            });
        }
    }

    // Members add to the extent but not to the histogram
    if let Some(members) = geometry.get("geometries").and_then(Value::as_array) {
        let mut member_types = BTreeMap::new();
        for member in members {
            tally_geometry(member, &mut member_types, bbox)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_histogram_and_extent() {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": {}, "geometry": { "type": "Point", "coordinates": [127.0, 37.5] } },
                { "type": "Feature", "properties": {}, "geometry": { "type": "Point", "coordinates": [129.0, 35.1] } },
                { "type": "Feature", "properties": {}, "geometry": null },
                {
                    "type": "Feature",
                    "properties": {},
                    "geometry": {
                        "type": "GeometryCollection",
                        "geometries": [ { "type": "LineString", "coordinates": [[126.5, 33.2], [126.9, 33.5]] } ]
                    }
                }
            ]
        });

        let mut types = BTreeMap::new();
        let mut bbox = None;
        for geometry in geometries(&doc) {
            tally_geometry(geometry, &mut types, &mut bbox).unwrap();
        }

        assert_eq!(types.get("Point"), Some(&2));
        assert_eq!(types.get("GeometryCollection"), Some(&1));
        assert!(types.get("LineString").is_none());
        assert_eq!(bbox, Some([126.5, 33.2, 129.0, 37.5]));
    }

    #[test]
    fn test_bare_geometry() {
        let doc = json!({ "type": "Polygon", "coordinates": [[[0, 0], [2, 0], [2, 1], [0, 0]]] });
        assert_eq!(geometries(&doc).len(), 1);
    }
}
