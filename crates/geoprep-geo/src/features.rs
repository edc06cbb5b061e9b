//! Document-level reprojection
//!
//! Walks a FeatureCollection, a single Feature or a bare Geometry and
//! rewrites every `coordinates` value it finds through the coordinate walker.
//! Everything else in the document (properties, ids, bbox, foreign members)
//! is copied through in its original order.

use std::ops::AddAssign;

use geoprep_core::error::{GeoprepError, Result};
use geoprep_core::formats::geojson::set_declared_crs;
use geoprep_core::models::{CoordinatePath, Crs};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::coordinates::transform_value;
use crate::projection::{crs_match, Identity, ProjProjector, Projector};

/// Counts gathered while reprojecting a document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReprojectSummary {
    pub features: usize,
    pub coordinates: usize,
    pub null_geometries: usize,
    /// Source and target CRS matched; the document was returned as-is
    pub unchanged: bool,
}

impl AddAssign for ReprojectSummary {
    fn add_assign(&mut self, other: Self) {
        self.features += other.features;
        self.coordinates += other.coordinates;
        self.null_geometries += other.null_geometries;
    }
}

/// Options for [`reproject`]
#[derive(Debug, Clone, Default)]
pub struct ReprojectOptions {
    /// Spread features over the rayon thread pool
    pub parallel: bool,
}

fn malformed(reason: impl Into<String>) -> GeoprepError {
    GeoprepError::MalformedGeometry { path: CoordinatePath::root(), reason: reason.into() }
}

/// Reproject a single geometry object.
///
/// GeometryCollections recurse into their members. A geometry with a missing
/// or null `coordinates` member is passed through.
pub fn reproject_geometry<P: Projector + ?Sized>(
    geometry: &Value,
    projector: &P,
) -> Result<(Value, usize)> {
    let object = match geometry {
        Value::Null => return Ok((Value::Null, 0)),
        Value::Object(object) => object,
        _ => return Err(malformed("geometry must be an object or null")),
    };

    let is_collection = object.get("type").and_then(Value::as_str) == Some("GeometryCollection");

    let mut count = 0;
    let mut result = Map::with_capacity(object.len());
    for (key, value) in object {
        let value = match (key.as_str(), value) {
            ("coordinates", Value::Null) => Value::Null,
            ("coordinates", coordinates) if !is_collection => {
                let (transformed, leaves) = transform_value(coordinates, projector)?;
                count += leaves;
                transformed
            }
            ("geometries", Value::Array(members)) if is_collection => {
                let mut transformed = Vec::with_capacity(members.len());
                for (i, member) in members.iter().enumerate() {
                    let (member, leaves) =
                        reproject_geometry(member, projector).map_err(|e| e.in_member(i))?;
                    count += leaves;
                    transformed.push(member);
                }
                Value::Array(transformed)
            }
            ("geometries", _) if is_collection => {
                return Err(malformed("GeometryCollection must have a \"geometries\" array"))
            }
            _ => value.clone(),
        };
        result.insert(key.clone(), value);
    }

    Ok((Value::Object(result), count))
}

/// Reproject the geometry of one Feature
pub fn reproject_feature<P: Projector + ?Sized>(
    feature: &Value,
    projector: &P,
) -> Result<(Value, ReprojectSummary)> {
    let object = feature.as_object().ok_or_else(|| GeoprepError::FormatError {
        format: "GeoJSON".to_string(),
        message: "Feature must be an object".to_string(),
    })?;

    let mut summary = ReprojectSummary { features: 1, ..Default::default() };

    let mut result = Map::with_capacity(object.len());
    for (key, value) in object {
        if key == "geometry" {
            if value.is_null() {
                summary.null_geometries += 1;
            }
            let (geometry, leaves) = reproject_geometry(value, projector)?;
            summary.coordinates += leaves;
            result.insert(key.clone(), geometry);
        } else {
            result.insert(key.clone(), value.clone());
        }
    }

    if !object.contains_key("geometry") {
        summary.null_geometries += 1;
    }

    Ok((Value::Object(result), summary))
}

fn features_of(document: &Value) -> Option<&Vec<Value>> {
    match document.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => document.get("features").and_then(Value::as_array),
        _ => None,
    }
}

fn with_features(document: &Value, features: Vec<Value>) -> Value {
    let mut features = Some(features);
    let mut output = Map::new();
    if let Some(object) = document.as_object() {
        for (key, value) in object {
            let value = match (key.as_str(), features.take()) {
                ("features", Some(features)) => Value::Array(features),
                (_, taken) => {
                    features = taken;
                    value.clone()
                }
            };
            output.insert(key.clone(), value);
        }
    }
    Value::Object(output)
}

/// Reproject a whole document on the calling thread.
///
/// `progress` is called once per finished feature.
pub fn reproject_document_with<P, F>(
    document: &Value,
    projector: &P,
    progress: F,
) -> Result<(Value, ReprojectSummary)>
where
    P: Projector + ?Sized,
    F: Fn(),
{
    if let Some(features) = features_of(document) {
        let mut summary = ReprojectSummary::default();
        let mut transformed = Vec::with_capacity(features.len());

        for (i, feature) in features.iter().enumerate() {
            let (feature, feature_summary) =
                reproject_feature(feature, projector).map_err(|e| e.in_feature(i))?;
            summary += feature_summary;
            transformed.push(feature);
            progress();
        }

        return Ok((with_features(document, transformed), summary));
    }

    match document.get("type").and_then(Value::as_str) {
        Some("Feature") => {
            let result = reproject_feature(document, projector)?;
            progress();
            Ok(result)
        }
        Some("FeatureCollection") => Err(GeoprepError::FormatError {
            format: "GeoJSON".to_string(),
            message: "FeatureCollection must have a \"features\" array".to_string(),
        }),
        _ => {
            let (geometry, coordinates) = reproject_geometry(document, projector)?;
            Ok((geometry, ReprojectSummary { coordinates, ..Default::default() }))
        }
    }
}

/// Reproject a whole document on the calling thread
pub fn reproject_document<P: Projector + ?Sized>(
    document: &Value,
    projector: &P,
) -> Result<(Value, ReprojectSummary)> {
    reproject_document_with(document, projector, || {})
}

/// Smallest run of features handed to one rayon job
const MIN_FEATURES_PER_JOB: usize = 64;

/// Reproject the features of a FeatureCollection on the rayon pool.
///
/// `make_projector` runs once per rayon job, and jobs hold at least
/// [`MIN_FEATURES_PER_JOB`] features, so a projector is shared by a run of
/// features instead of being rebuilt for each one. Features
/// keep their input order and the error of the lowest-indexed failing
/// feature is returned. Documents that are not FeatureCollections are
/// handled on the calling thread.
pub fn reproject_collection_parallel<P, M, F>(
    document: &Value,
    make_projector: M,
    progress: F,
) -> Result<(Value, ReprojectSummary)>
where
    P: Projector,
    M: Fn() -> Result<P> + Sync + Send,
    F: Fn() + Sync + Send,
{
    let Some(features) = features_of(document) else {
        let projector = make_projector()?;
        return reproject_document_with(document, &projector, progress);
    };

    let results: Vec<Result<(Value, ReprojectSummary)>> = features
        .par_iter()
        .enumerate()
        .with_min_len(MIN_FEATURES_PER_JOB)
        .map_init(
            || make_projector().map_err(|e| e.to_string()),
            |projector, (i, feature)| {
                let projector = projector.as_ref().map_err(|reason| GeoprepError::ConfigInvalid {
                    key: "crs".to_string(),
                    reason: reason.clone(),
                })?;
                let result = reproject_feature(feature, projector).map_err(|e| e.in_feature(i));
                progress();
                result
            },
        )
        .collect();

    let mut summary = ReprojectSummary::default();
    let mut transformed = Vec::with_capacity(results.len());
    for result in results {
        let (feature, feature_summary) = result?;
        summary += feature_summary;
        transformed.push(feature);
    }

    Ok((with_features(document, transformed), summary))
}

/// Reproject a document from `from` to `to`
pub fn reproject(
    document: &Value,
    from: &Crs,
    to: &Crs,
    options: &ReprojectOptions,
) -> Result<(Value, ReprojectSummary)> {
    reproject_with_progress(document, from, to, options, || {})
}

/// Reproject a document from `from` to `to`, reporting each finished feature.
///
/// When both CRS match no projector is built: the document is only checked
/// for malformed geometry and returned unchanged.
pub fn reproject_with_progress<F>(
    document: &Value,
    from: &Crs,
    to: &Crs,
    options: &ReprojectOptions,
    progress: F,
) -> Result<(Value, ReprojectSummary)>
where
    F: Fn() + Sync + Send,
{
    if crs_match(from, to) {
        tracing::info!("Source and target CRS are both {}, leaving coordinates as they are", to);
        let (_, mut summary) = reproject_document_with(document, &Identity, progress)?;
        summary.unchanged = true;
        return Ok((document.clone(), summary));
    }

    // Fail on an unusable CRS pair before any worker starts
    let projector = ProjProjector::new(from, to)?;

    let (mut output, summary) = if options.parallel {
        tracing::debug!("Reprojecting with {} worker threads", rayon::current_num_threads());
        drop(projector);
        reproject_collection_parallel(document, || ProjProjector::new(from, to), progress)?
    } else {
        reproject_document_with(document, &projector, progress)?
    };

    set_declared_crs(&mut output, to);

    tracing::info!(
        "Reprojected {} features ({} positions) from {} to {}",
        summary.features,
        summary.coordinates,
        from,
        to
    );
    if summary.null_geometries > 0 {
        tracing::debug!("{} features had no geometry", summary.null_geometries);
    }

    Ok((output, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{FnProjector, ProjectionError};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn shift() -> FnProjector<impl Fn(f64, f64) -> (f64, f64)> {
        FnProjector::new(|x, y| (x + 1.0, y + 1.0))
    }

    struct Shift;

    impl Projector for Shift {
        fn project(&self, x: f64, y: f64) -> std::result::Result<(f64, f64), ProjectionError> {
            if x.is_nan() {
                return Err(ProjectionError("NaN input".to_string()));
            }
            Ok((x + 1.0, y + 1.0))
        }
    }

    fn collection() -> Value {
        json!({
            "type": "FeatureCollection",
            "name": "sig",
            "features": [
                {
                    "type": "Feature",
                    "id": 11110,
                    "properties": { "SIG_KOR_NM": "종로구", "SIG_CD": "11110" },
                    "geometry": { "type": "Point", "coordinates": [127.0, 37.5] }
                },
                {
                    "type": "Feature",
                    "properties": { "SIG_KOR_NM": "중구" },
                    "geometry": null
                },
                {
                    "type": "Feature",
                    "bbox": [0, 0, 1, 1],
                    "properties": {},
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[0, 0, 5], [1, 0, 5], [1, 1, 5], [0, 0, 5]]]
                    }
                }
            ]
        })
    }

    #[test]
    fn test_feature_collection_is_transformed_in_place() {
        let (output, summary) = reproject_document(&collection(), &shift()).unwrap();

        assert_eq!(summary.features, 3);
        assert_eq!(summary.coordinates, 5);
        assert_eq!(summary.null_geometries, 1);

        assert_eq!(output["name"], "sig");
        assert_eq!(output["features"][0]["geometry"]["coordinates"], json!([128.0, 38.5]));
        assert_eq!(output["features"][0]["properties"]["SIG_KOR_NM"], "종로구");
        assert_eq!(output["features"][0]["id"], 11110);
        assert_eq!(output["features"][1]["geometry"], Value::Null);
        assert_eq!(output["features"][2]["bbox"], json!([0, 0, 1, 1]));
        assert_eq!(
            output["features"][2]["geometry"]["coordinates"][0][2],
            json!([2.0, 2.0, 5.0])
        );
    }

    #[test]
    fn test_member_order_is_preserved() {
        let (output, _) = reproject_document(&collection(), &shift()).unwrap();

        let keys: Vec<&String> = output.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["type", "name", "features"]);

        let feature_keys: Vec<&String> = output["features"][0].as_object().unwrap().keys().collect();
        assert_eq!(feature_keys, ["type", "id", "properties", "geometry"]);
    }

    #[test]
    fn test_missing_geometry_and_coordinates_pass_through() {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "a": 1 } },
                { "type": "Feature", "properties": null, "geometry": { "type": "Point", "coordinates": null } }
            ]
        });

        let (output, summary) = reproject_document(&doc, &shift()).unwrap();
        assert_eq!(output, doc);
        assert_eq!(summary.null_geometries, 1);
        assert_eq!(summary.coordinates, 0);
    }

    #[test]
    fn test_geometry_collection_recursion() {
        let doc = json!({
            "type": "GeometryCollection",
            "geometries": [
                { "type": "Point", "coordinates": [0, 0] },
                {
                    "type": "GeometryCollection",
                    "geometries": [ { "type": "LineString", "coordinates": [[1, 1], [2, 2]] } ]
                }
            ]
        });

        let (output, summary) = reproject_document(&doc, &shift()).unwrap();
        assert_eq!(summary.coordinates, 3);
        assert_eq!(output["geometries"][0]["coordinates"], json!([1.0, 1.0]));
        assert_eq!(
            output["geometries"][1]["geometries"][0]["coordinates"],
            json!([[2.0, 2.0], [3.0, 3.0]])
        );
    }

    #[test]
    fn test_error_path_names_feature_and_member() {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": {}, "geometry": { "type": "Point", "coordinates": [0, 0] } },
                {
                    "type": "Feature",
                    "properties": {},
                    "geometry": {
                        "type": "GeometryCollection",
                        "geometries": [
                            { "type": "Point", "coordinates": [0, 0] },
                            { "type": "LineString", "coordinates": [[0, 0], "x"] }
                        ]
                    }
                }
            ]
        });

        let err = reproject_document(&doc, &shift()).unwrap_err();
        assert!(matches!(err, GeoprepError::MalformedGeometry { .. }));
        assert_eq!(err.path().unwrap().to_string(), "features[1].geometries[1].coordinates[1]");
    }

    #[test]
    fn test_single_feature_and_bare_geometry() {
        let feature = json!({
            "type": "Feature",
            "properties": { "name": "서울" },
            "geometry": { "type": "MultiPoint", "coordinates": [[0, 0], [1, 1]] }
        });
        let (output, summary) = reproject_document(&feature, &shift()).unwrap();
        assert_eq!(summary.features, 1);
        assert_eq!(output["geometry"]["coordinates"], json!([[1.0, 1.0], [2.0, 2.0]]));

        let geometry = json!({ "type": "Point", "coordinates": [127.0, 37.5] });
        let (output, summary) = reproject_document(&geometry, &shift()).unwrap();
        assert_eq!(summary.features, 0);
        assert_eq!(output["coordinates"], json!([128.0, 38.5]));
    }

    #[test]
    fn test_non_object_geometry_is_malformed() {
        let feature = json!({ "type": "Feature", "properties": {}, "geometry": [1, 2] });
        let err = reproject_document(&feature, &shift()).unwrap_err();
        assert!(matches!(err, GeoprepError::MalformedGeometry { .. }));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let features: Vec<Value> = (0..200)
            .map(|i| {
                json!({
                    "type": "Feature",
                    "properties": { "n": i },
                    "geometry": { "type": "LineString", "coordinates": [[i, i], [i + 1, i + 1]] }
                })
            })
            .collect();
        let doc = json!({ "type": "FeatureCollection", "features": features });

        let sequential = reproject_document(&doc, &Shift).unwrap();
        let parallel = reproject_collection_parallel(&doc, || Ok(Shift), || {}).unwrap();

        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_parallel_reports_lowest_failing_feature() {
        let features: Vec<Value> = (0..100)
            .map(|i| {
                let coordinates = if i == 40 || i == 90 { json!([0, "x"]) } else { json!([i, i]) };
                json!({ "type": "Feature", "properties": {}, "geometry": { "type": "Point", "coordinates": coordinates } })
            })
            .collect();
        let doc = json!({ "type": "FeatureCollection", "features": features });

        let err = reproject_collection_parallel(&doc, || Ok(Shift), || {}).unwrap_err();
        assert_eq!(err.path().unwrap().feature(), Some(40));
    }

    #[test]
    fn test_parallel_builds_one_projector_per_job() {
        let features: Vec<Value> = (0..1000)
            .map(|i| json!({ "type": "Feature", "properties": {}, "geometry": { "type": "Point", "coordinates": [i, i] } }))
            .collect();
        let doc = json!({ "type": "FeatureCollection", "features": features });

        let built = AtomicUsize::new(0);
        reproject_collection_parallel(
            &doc,
            || {
                built.fetch_add(1, Ordering::Relaxed);
                Ok(Shift)
            },
            || {},
        )
        .unwrap();

        let built = built.load(Ordering::Relaxed);
        assert!(built >= 1);
        assert!(built <= 1000 / MIN_FEATURES_PER_JOB, "built {} projectors", built);
    }

    #[test]
    fn test_parallel_progress_counts_features() {
        let counter = AtomicUsize::new(0);
        reproject_collection_parallel(&collection(), || Ok(Shift), || {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
        assert_eq!(counter.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_matching_crs_returns_document_unchanged() {
        let doc = collection();
        let (output, summary) =
            reproject(&doc, &Crs::wgs84(), &Crs::wgs84(), &ReprojectOptions::default()).unwrap();

        assert_eq!(output, doc);
        assert!(summary.unchanged);
        assert_eq!(summary.features, 3);
    }

    #[test]
    fn test_matching_crs_still_rejects_malformed_geometry() {
        let doc = json!({ "type": "Point", "coordinates": [1] });
        let result = reproject(&doc, &Crs::wgs84(), &Crs::wgs84(), &ReprojectOptions::default());
        assert!(matches!(result, Err(GeoprepError::MalformedGeometry { .. })));
    }
}
