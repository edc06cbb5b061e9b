//! Convert command implementation

use crate::cli::ConvertArgs;
use crate::config_loader::load_config_with_overrides;
use crate::dry_run::{display_planned_actions, ActionType, PlannedAction};
use crate::errors::CliError;
use crate::output::OutputWriter;
use crate::output_types::ConvertOutput;
use crate::progress::{create_spinner, finish_success};
use anyhow::{Context, Result};
use geoprep_core::config::CliConfigOverrides;
use geoprep_core::formats::geojson::{declare_crs, write_document};
use geoprep_core::formats::FormatRegistry;
use geoprep_core::models::Crs;
use geoprep_geo::{crs_match, reproject, ReprojectOptions};
use std::path::Path;

pub fn execute(
    args: ConvertArgs,
    config_path: Option<&Path>,
    output: &OutputWriter,
    dry_run: bool,
) -> Result<()> {
    let config = load_config_with_overrides(
        config_path,
        CliConfigOverrides {
            default_crs: args.default_crs.clone(),
            pretty: args.compact.then_some(false),
            ..Default::default()
        },
    )?;

    super::ensure_exists(&args.input)?;

    let registry = FormatRegistry::with_defaults();
    if registry.detect_format(&args.input)?.format_name() != "Shapefile" {
        return Err(CliError::new("convert expects a Shapefile")
            .with_context(format!("Input: {}", args.input.display()))
            .with_suggestion("Use geoprep reproject for GeoJSON input")
            .into());
    }

    let spinner = create_spinner(&format!("Reading {}", args.input.display()), output.is_json());
    let dataset = registry.read(&args.input)?;
    spinner.finish_and_clear();

    let crs_assumed = dataset.crs.is_none();
    let source = dataset.crs_or(&config.default_crs.value);
    if crs_assumed {
        output.warning(format!(
            "{} has no usable .prj, assuming {}",
            args.input.display(),
            source
        ));
    }

    let target: Option<Crs> = args.to.clone().filter(|to| !crs_match(&source, to));
    let output_crs = target.clone().unwrap_or_else(|| source.clone());
    let feature_count = dataset.feature_count();

    if dry_run {
        let mut actions = vec![PlannedAction::new(
            ActionType::ReadFile,
            format!("Read {}", args.input.display()),
        )
        .with_detail(format!("Features: {}", feature_count))
        .with_detail(format!("CRS: {}{}", source, if crs_assumed { " (assumed)" } else { "" }))];

        if let Some(target) = &target {
            actions.push(PlannedAction::new(
                ActionType::Reproject,
                format!("Reproject {} to {}", source, target),
            ));
        }

        actions.push(
            PlannedAction::new(ActionType::WriteFile, format!("Write {}", args.output.display()))
                .with_detail(format!("CRS: {}", output_crs)),
        );

        return display_planned_actions(output, &actions);
    }

    let mut document = match &target {
        Some(target) => {
            let spinner = create_spinner(&format!("Reprojecting to {}", target), output.is_json());
            let options = ReprojectOptions { parallel: config.parallel.value };
            let (document, summary) = reproject(&dataset.document, &source, target, &options)?;
            finish_success(&spinner, &format!("Reprojected {} positions", summary.coordinates));
            document
        }
        None => dataset.document,
    };

    // RFC 7946 readers assume WGS 84 unless told otherwise
    if !crs_match(&output_crs, &Crs::wgs84()) {
        declare_crs(&mut document, &output_crs);
    }

    write_document(&args.output, &document, config.pretty.value)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    if output.is_json() {
        output.result(ConvertOutput {
            input: args.input.display().to_string(),
            output: args.output.display().to_string(),
            source_crs: source.epsg,
            crs_assumed,
            output_crs: output_crs.epsg,
            feature_count,
        })?;
    } else {
        output.success(format!("Wrote {}", args.output.display()));
        output.section("Conversion");
        output.kv("Features", feature_count);
        output.kv("Source CRS", &source);
        output.kv("Output CRS", &output_crs);
    }

    Ok(())
}
