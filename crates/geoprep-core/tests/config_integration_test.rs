//! Integration tests for layered configuration
//!
//! These tests verify that configuration loading follows the correct precedence:
//! CLI arguments > Environment variables > Config file > Defaults

use geoprep_core::config::{CliConfigOverrides, ConfigSource, FailurePolicy, LayeredConfig};
use geoprep_core::models::Crs;
use serial_test::serial;
use std::env;
use std::io::Write;
use tempfile::NamedTempFile;

const ENV_VARS: &[&str] = &[
    "GEOPREP_SOURCE_CRS",
    "GEOPREP_TARGET_CRS",
    "GEOPREP_DEFAULT_CRS",
    "GEOPREP_PARALLEL",
    "GEOPREP_PRETTY",
    "GEOPREP_GEOCODER_URL",
    "GEOPREP_GEOCODE_DELAY_MS",
    "GEOPREP_ON_FAILURE",
    "KAKAO_API_KEY",
];

fn clear_env() {
    for var in ENV_VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_defaults_without_sources() {
    clear_env();

    let config = LayeredConfig::with_defaults().load_from_env();

    assert_eq!(config.source_crs.value, Crs::korea_2000_unified());
    assert_eq!(config.target_crs.value, Crs::wgs84());
    assert_eq!(config.geocoder_url.value, "https://dapi.kakao.com");
    assert!(config.kakao_api_key.value.is_none());
    assert!(config.require_kakao_api_key().is_err());
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    clear_env();
    env::set_var("GEOPREP_SOURCE_CRS", "EPSG:5186");
    env::set_var("GEOPREP_PARALLEL", "true");
    env::set_var("KAKAO_API_KEY", "env-key");

    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
source_crs = "EPSG:3857"
parallel = false

[geocode]
api_key = "file-key"
delay_ms = 500
"#
    )
    .unwrap();

    let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap().load_from_env();

    assert_eq!(config.source_crs.value.epsg, 5186);
    assert_eq!(config.source_crs.source, ConfigSource::Environment);
    assert!(config.parallel.value);
    assert_eq!(config.require_kakao_api_key().unwrap(), "env-key");
    // Not set in env, so the file value stays
    assert_eq!(config.geocode_delay_ms.value, 500);
    assert_eq!(config.geocode_delay_ms.source, ConfigSource::File);

    clear_env();
}

#[test]
#[serial]
fn test_invalid_environment_values_are_ignored() {
    clear_env();
    env::set_var("GEOPREP_TARGET_CRS", "mercator");
    env::set_var("GEOPREP_GEOCODE_DELAY_MS", "soon");
    env::set_var("GEOPREP_ON_FAILURE", "retry");

    let config = LayeredConfig::with_defaults().load_from_env();

    assert_eq!(config.target_crs.value.epsg, 4326);
    assert_eq!(config.target_crs.source, ConfigSource::Default);
    assert_eq!(config.geocode_delay_ms.value, 200);
    assert_eq!(config.on_failure.value, FailurePolicy::Skip);

    clear_env();
}

#[test]
#[serial]
fn test_cli_overrides_all() {
    clear_env();
    env::set_var("GEOPREP_TARGET_CRS", "3857");
    env::set_var("GEOPREP_ON_FAILURE", "abort");

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"target_crs = "EPSG:5186""#).unwrap();

    let mut config =
        LayeredConfig::with_defaults().load_from_file(file.path()).unwrap().load_from_env();

    assert_eq!(config.target_crs.value.epsg, 3857);
    assert_eq!(config.target_crs.source, ConfigSource::Environment);

    config.update_from_cli(CliConfigOverrides {
        target_crs: Some(Crs::wgs84()),
        on_failure: Some(FailurePolicy::Skip),
        ..Default::default()
    });

    assert_eq!(config.target_crs.value.epsg, 4326);
    assert_eq!(config.target_crs.source, ConfigSource::Cli);
    assert_eq!(config.on_failure.value, FailurePolicy::Skip);
    assert_eq!(config.on_failure.source, ConfigSource::Cli);

    assert!(ConfigSource::Cli.precedence() > ConfigSource::Environment.precedence());
    assert!(ConfigSource::Environment.precedence() > ConfigSource::File.precedence());
    assert!(ConfigSource::File.precedence() > ConfigSource::Default.precedence());

    clear_env();
}

#[test]
fn test_missing_file_is_config_error() {
    let result = LayeredConfig::with_defaults().load_from_file("/nonexistent/geoprep.toml");
    assert!(result.is_err());
}

#[test]
fn test_configuration_source_tracking() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "default_crs = \"5179\"\npretty = false").unwrap();

    let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap();
    let inspection_map = config.to_inspection_map();

    let (default_crs, source) = &inspection_map["default_crs"];
    assert_eq!(default_crs, "EPSG:5179 (Korea 2000 / Unified CS)");
    assert_eq!(*source, ConfigSource::File);

    let (pretty, source) = &inspection_map["pretty"];
    assert_eq!(pretty, "false");
    assert_eq!(*source, ConfigSource::File);

    let (on_failure, source) = &inspection_map["on_failure"];
    assert_eq!(on_failure, "skip");
    assert_eq!(*source, ConfigSource::Default);
}
