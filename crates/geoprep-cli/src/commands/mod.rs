//! Command implementations

mod config;
mod convert;
mod geocode;
mod inspect;
mod reproject;

use crate::cli::{Cli, Commands};
use crate::errors;
use crate::output::OutputWriter;
use anyhow::Result;
use geoprep_core::formats::{FormatRegistry, SourceDataset};
use std::path::Path;

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Reproject(args) => reproject::execute(args, config_path, &output, cli.dry_run),
        Commands::Convert(args) => convert::execute(args, config_path, &output, cli.dry_run),
        Commands::Geocode(args) => geocode::execute(args, config_path, &output, cli.dry_run).await,
        Commands::Inspect(args) => inspect::execute(args, &output),
        Commands::Config => config::execute(config_path, &output),
    }
}

/// Read a GeoJSON document or Shapefile through the format registry
fn read_input(path: &Path) -> Result<SourceDataset> {
    ensure_exists(path)?;
    Ok(FormatRegistry::with_defaults().read(path)?)
}

fn ensure_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(errors::input_not_found(&path.display().to_string()).into());
    }
    Ok(())
}
