//! Geocode command implementation

use crate::cli::GeocodeArgs;
use crate::config_loader::load_config_with_overrides;
use crate::dry_run::{display_planned_actions, ActionType, PlannedAction};
use crate::output::OutputWriter;
use crate::output_types::GeocodeOutput;
use crate::progress::{create_progress_bar, finish_error, finish_success};
use anyhow::{Context, Result};
use geoprep_core::config::CliConfigOverrides;
use geoprep_geocode::batch::{LATITUDE_HEADER, LONGITUDE_HEADER};
use geoprep_geocode::{geocode_table, CsvTable, GeocodeOptions, Geocoder, KakaoGeocoder};
use std::path::Path;
use std::time::Duration;

pub async fn execute(
    args: GeocodeArgs,
    config_path: Option<&Path>,
    output: &OutputWriter,
    dry_run: bool,
) -> Result<()> {
    let config = load_config_with_overrides(
        config_path,
        CliConfigOverrides {
            geocode_delay_ms: args.delay_ms,
            on_failure: args.on_failure,
            ..Default::default()
        },
    )?;

    super::ensure_exists(&args.input)?;
    let table = CsvTable::read(&args.input)?;

    let options = GeocodeOptions {
        status_column: args.status_column,
        address_column: args.address_column,
        keywords: args.keywords,
        delay: Duration::from_millis(config.geocode_delay_ms.value),
        on_failure: config.on_failure.value,
    };

    let status_column = table.column(&options.status_column)?;
    table.column(&options.address_column)?;
    let matched = table.filter_containing(status_column, &options.keywords).len();

    if dry_run {
        let actions = vec![
            PlannedAction::new(ActionType::ReadFile, format!("Read {}", args.input.display()))
                .with_detail(format!("Rows: {}", table.len()))
                .with_detail(format!("Rows matching {:?}: {}", options.keywords, matched)),
            PlannedAction::new(ActionType::Geocode, format!("Geocode up to {} addresses", matched))
                .with_detail(format!("Service: {}", config.geocoder_url.value))
                .with_detail(format!("Delay: {} ms", config.geocode_delay_ms.value))
                .with_detail(format!("On failure: {:?}", options.on_failure)),
            PlannedAction::new(ActionType::WriteFile, format!("Write {}", args.output.display()))
                .with_detail(format!("Columns added: {}, {}", LATITUDE_HEADER, LONGITUDE_HEADER)),
        ];
        return display_planned_actions(output, &actions);
    }

    let api_key = config.require_kakao_api_key()?;
    let geocoder = KakaoGeocoder::new(config.geocoder_url.value.as_str(), api_key)?;

    let pb = create_progress_bar(matched as u64, "Geocoding addresses", output.is_json());
    let (result, report) = match geocode_table(&table, &geocoder, &options, || pb.inc(1)).await {
        Ok(result) => result,
        Err(e) => {
            finish_error(&pb, "Geocoding stopped");
            return Err(e.into());
        }
    };
    finish_success(&pb, &format!("Geocoded {} addresses", report.found));

    result
        .write(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    if report.failed > 0 {
        output.warning(format!("{} lookups failed; their coordinates are empty", report.failed));
    }

    if output.is_json() {
        output.result(GeocodeOutput {
            input: args.input.display().to_string(),
            output: args.output.display().to_string(),
            service: geocoder.service_name().to_string(),
            report,
        })?;
    } else {
        output.success(format!("Wrote {}", args.output.display()));
        output.section("Geocoding");
        output.kv("Rows read", report.rows_read);
        output.kv("Rows matched", report.rows_matched);
        output.kv("Found", report.found);
        output.kv("Not found", report.not_found);
        output.kv("Failed", report.failed);
        output.kv("Blank address", report.blank_addresses);
    }

    Ok(())
}
