use geoprep_geo::ReprojectSummary;
use geoprep_geocode::GeocodeReport;
use serde::Serialize;
use std::collections::BTreeMap;

/// Output for reproject command
#[derive(Debug, Serialize)]
pub struct ReprojectOutput {
    pub input: String,
    pub output: String,
    pub source_crs: u32,
    pub target_crs: u32,
    pub summary: ReprojectSummary,
}

/// Output for convert command
#[derive(Debug, Serialize)]
pub struct ConvertOutput {
    pub input: String,
    pub output: String,
    /// CRS of the Shapefile; `crs_assumed` is set when it came from the fallback
    pub source_crs: u32,
    pub crs_assumed: bool,
    pub output_crs: u32,
    pub feature_count: usize,
}

/// Output for geocode command
#[derive(Debug, Serialize)]
pub struct GeocodeOutput {
    pub input: String,
    pub output: String,
    pub service: String,
    pub report: GeocodeReport,
}

/// Output for inspect command
#[derive(Debug, Serialize)]
pub struct InspectOutput {
    pub name: String,
    pub format: String,
    pub document_type: String,
    pub feature_count: usize,
    pub coordinate_count: usize,
    pub null_geometries: usize,
    pub declared_crs: Option<u32>,
    pub geometry_types: BTreeMap<String, usize>,
    pub bbox: Option<[f64; 4]>,
}

/// Output for config command
#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    pub config_file: Option<String>,
    pub values: BTreeMap<String, ConfigValue>,
}

#[derive(Debug, Serialize)]
pub struct ConfigValue {
    pub value: String,
    pub source: String,
}
