//! Reproject command implementation

use crate::cli::ReprojectArgs;
use crate::config_loader::load_config_with_overrides;
use crate::dry_run::{display_planned_actions, ActionType, PlannedAction};
use crate::output::OutputWriter;
use crate::output_types::ReprojectOutput;
use crate::progress::{create_progress_bar, finish_error, finish_success};
use anyhow::{Context, Result};
use geoprep_core::config::{CliConfigOverrides, ConfigSource, LayeredConfig};
use geoprep_core::formats::geojson::write_document;
use geoprep_core::models::Crs;
use geoprep_geo::projection::check_crs_mismatch;
use geoprep_geo::{crs_match, reproject_with_progress, ReprojectOptions};
use std::path::Path;

pub fn execute(
    args: ReprojectArgs,
    config_path: Option<&Path>,
    output: &OutputWriter,
    dry_run: bool,
) -> Result<()> {
    let config = load_config_with_overrides(
        config_path,
        CliConfigOverrides {
            source_crs: args.from.clone(),
            target_crs: args.to.clone(),
            parallel: args.parallel.then_some(true),
            pretty: args.compact.then_some(false),
            ..Default::default()
        },
    )?;

    let dataset = super::read_input(&args.input)?;
    let source = resolve_source_crs(&config, dataset.crs.as_ref(), output);
    let target = config.target_crs.value.clone();
    let feature_count = dataset.feature_count();

    if dry_run {
        let mut actions = vec![PlannedAction::new(
            ActionType::ReadFile,
            format!("Read {}", args.input.display()),
        )
        .with_detail(format!("Format: {}", dataset.format_name))
        .with_detail(format!("Features: {}", feature_count))];

        if crs_match(&source, &target) {
            actions.push(
                PlannedAction::new(ActionType::Reproject, "Leave coordinates unchanged")
                    .with_detail(format!("Source and target CRS are both {}", target)),
            );
        } else {
            actions.push(
                PlannedAction::new(ActionType::Reproject, format!("Reproject {} to {}", source, target))
                    .with_detail(format!("Parallel: {}", config.parallel.value)),
            );
        }

        actions.push(
            PlannedAction::new(ActionType::WriteFile, format!("Write {}", args.output.display()))
                .with_detail(format!("Pretty: {}", config.pretty.value)),
        );

        return display_planned_actions(output, &actions);
    }

    let pb = create_progress_bar(
        feature_count as u64,
        &format!("Reprojecting {} to {}", source, target),
        output.is_json(),
    );

    let options = ReprojectOptions { parallel: config.parallel.value };
    let (document, summary) =
        match reproject_with_progress(&dataset.document, &source, &target, &options, || pb.inc(1)) {
            Ok(result) => result,
            Err(e) => {
                finish_error(&pb, "Reprojection failed");
                return Err(e.into());
            }
        };
    finish_success(&pb, &format!("Reprojected {} features", summary.features));

    write_document(&args.output, &document, config.pretty.value)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    if output.is_json() {
        output.result(ReprojectOutput {
            input: args.input.display().to_string(),
            output: args.output.display().to_string(),
            source_crs: source.epsg,
            target_crs: target.epsg,
            summary,
        })?;
    } else {
        if summary.unchanged {
            output.info(format!("Source and target CRS are both {}; coordinates left as they are", target));
        }
        output.success(format!("Wrote {}", args.output.display()));
        output.section("Reprojection");
        output.kv("Source CRS", &source);
        output.kv("Target CRS", &target);
        output.kv("Features", summary.features);
        output.kv("Positions", summary.coordinates);
        output.kv("Without geometry", summary.null_geometries);
    }

    Ok(())
}

/// Source CRS for the run.
///
/// A CRS the input declares wins over the built-in default; an explicitly
/// configured one wins over the declaration, with a warning when they differ.
fn resolve_source_crs(config: &LayeredConfig, declared: Option<&Crs>, output: &OutputWriter) -> Crs {
    let configured = &config.source_crs;

    match declared {
        Some(declared) if configured.source == ConfigSource::Default => {
            tracing::debug!("Using the CRS the input declares: {}", declared);
            declared.clone()
        }
        Some(declared) => {
            if let Err(e) = check_crs_mismatch(&configured.value, declared) {
                output.warning(format!("{}; using {} from {}", e, configured.value, configured.source));
            }
            configured.value.clone()
        }
        None => configured.value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoprep_core::formats::geojson::declared_crs;

    #[test]
    fn test_declared_crs_beats_default() {
        let config = LayeredConfig::with_defaults();
        let output = OutputWriter::new(true);

        let source = resolve_source_crs(&config, Some(&Crs::web_mercator()), &output);
        assert_eq!(source.epsg, 3857);

        let source = resolve_source_crs(&config, None, &output);
        assert_eq!(source.epsg, 5179);
    }

    #[test]
    fn test_explicit_source_beats_declared() {
        let mut config = LayeredConfig::with_defaults();
        config.update_from_cli(CliConfigOverrides {
            source_crs: Some(Crs::korea_2000_unified()),
            ..Default::default()
        });
        let output = OutputWriter::new(true);

        let source = resolve_source_crs(&config, Some(&Crs::web_mercator()), &output);
        assert_eq!(source.epsg, 5179);
    }

    #[test]
    fn test_crs84_declaration_is_wgs84_source() {
        let document = serde_json::json!({
            "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:OGC:1.3:CRS84" } },
            "features": []
        });
        let declared = declared_crs(&document).map(Crs::from_epsg);

        let source =
            resolve_source_crs(&LayeredConfig::with_defaults(), declared.as_ref(), &OutputWriter::new(true));
        assert_eq!(source.epsg, 4326);
    }
}
