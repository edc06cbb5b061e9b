use clap::{Parser, Subcommand};
use geoprep_core::config::{parse_failure_policy, FailurePolicy};
use geoprep_core::models::Crs;
use geoprep_geocode::ColumnSelector;
use std::path::PathBuf;

/// geoprep - geospatial data preparation toolbox
#[derive(Parser, Debug)]
#[command(name = "geoprep")]
#[command(about = "Reproject GeoJSON, convert Shapefiles and geocode address tables", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Show planned actions without executing them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Configuration file (defaults to ./geoprep.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reproject a GeoJSON document to another CRS
    Reproject(ReprojectArgs),

    /// Convert a Shapefile to GeoJSON
    Convert(ConvertArgs),

    /// Geocode the addresses of a CSV table
    Geocode(GeocodeArgs),

    /// Summarize a GeoJSON document or Shapefile
    Inspect(InspectArgs),

    /// Show the effective configuration and where each value came from
    Config,
}

#[derive(Parser, Debug)]
pub struct ReprojectArgs {
    /// Input GeoJSON document
    pub input: PathBuf,

    /// Output GeoJSON path
    #[arg(long, short = 'o')]
    pub output: PathBuf,

    /// Source CRS (e.g., 5179, EPSG:5179); defaults to the CRS the input declares
    #[arg(long, value_name = "CRS")]
    pub from: Option<Crs>,

    /// Target CRS (e.g., 4326, EPSG:4326)
    #[arg(long, value_name = "CRS")]
    pub to: Option<Crs>,

    /// Reproject features on all CPU cores
    #[arg(long)]
    pub parallel: bool,

    /// Write single-line JSON instead of indented output
    #[arg(long)]
    pub compact: bool,
}

#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// Input Shapefile (.shp with .shx and .dbf beside it)
    pub input: PathBuf,

    /// Output GeoJSON path
    #[arg(long, short = 'o')]
    pub output: PathBuf,

    /// Reproject to this CRS while converting
    #[arg(long, value_name = "CRS")]
    pub to: Option<Crs>,

    /// CRS assumed when the Shapefile has no usable .prj
    #[arg(long, value_name = "CRS")]
    pub default_crs: Option<Crs>,

    /// Write single-line JSON instead of indented output
    #[arg(long)]
    pub compact: bool,
}

#[derive(Parser, Debug)]
pub struct GeocodeArgs {
    /// Input CSV table with a header row
    pub input: PathBuf,

    /// Output CSV path
    #[arg(long, short = 'o')]
    pub output: PathBuf,

    /// Status column, by header name or zero-based index
    #[arg(long, default_value = "3", value_name = "COLUMN")]
    pub status_column: ColumnSelector,

    /// Address column, by header name or zero-based index
    #[arg(long, default_value = "5", value_name = "COLUMN")]
    pub address_column: ColumnSelector,

    /// Keep rows whose status contains this text (repeatable)
    #[arg(long = "keyword", short = 'k', value_name = "TEXT", default_values = ["휴업", "폐업"])]
    pub keywords: Vec<String>,

    /// What to do when a lookup fails (skip or abort)
    #[arg(long, value_parser = parse_failure_policy, value_name = "POLICY")]
    pub on_failure: Option<FailurePolicy>,

    /// Pause between requests in milliseconds
    #[arg(long, value_name = "MS")]
    pub delay_ms: Option<u64>,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// GeoJSON document or Shapefile to inspect
    pub input: PathBuf,
}
