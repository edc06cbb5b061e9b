use crate::error::{GeoprepError, Result};
use crate::models::Crs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfigSource::Default => "default",
            ConfigSource::File => "file",
            ConfigSource::Environment => "env",
            ConfigSource::Cli => "cli",
        };
        f.write_str(label)
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// What the geocoding run does when a single address lookup fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the failure, leave the coordinates empty and keep going
    #[default]
    Skip,
    /// Stop the run at the first failed lookup
    Abort,
}

/// Layered configuration for geoprep
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub source_crs: ConfigValue<Crs>,
    pub target_crs: ConfigValue<Crs>,
    /// CRS assumed for inputs that declare none
    pub default_crs: ConfigValue<Crs>,
    pub parallel: ConfigValue<bool>,
    pub pretty: ConfigValue<bool>,
    pub geocoder_url: ConfigValue<String>,
    pub kakao_api_key: ConfigValue<Option<String>>,
    pub geocode_delay_ms: ConfigValue<u64>,
    pub on_failure: ConfigValue<FailurePolicy>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            source_crs: ConfigValue::new(Crs::korea_2000_unified(), ConfigSource::Default),
            target_crs: ConfigValue::new(Crs::wgs84(), ConfigSource::Default),
            default_crs: ConfigValue::new(Crs::wgs84(), ConfigSource::Default),
            parallel: ConfigValue::new(false, ConfigSource::Default),
            pretty: ConfigValue::new(true, ConfigSource::Default),
            geocoder_url: ConfigValue::new(
                "https://dapi.kakao.com".to_string(),
                ConfigSource::Default,
            ),
            kakao_api_key: ConfigValue::new(None, ConfigSource::Default),
            geocode_delay_ms: ConfigValue::new(200, ConfigSource::Default),
            on_failure: ConfigValue::new(FailurePolicy::Skip, ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| GeoprepError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| GeoprepError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(crs) = file_config.source_crs {
            self.source_crs.update(crs.parse()?, ConfigSource::File);
        }

        if let Some(crs) = file_config.target_crs {
            self.target_crs.update(crs.parse()?, ConfigSource::File);
        }

        if let Some(crs) = file_config.default_crs {
            self.default_crs.update(crs.parse()?, ConfigSource::File);
        }

        if let Some(parallel) = file_config.parallel {
            self.parallel.update(parallel, ConfigSource::File);
        }

        if let Some(pretty) = file_config.pretty {
            self.pretty.update(pretty, ConfigSource::File);
        }

        if let Some(geocode) = file_config.geocode {
            if let Some(url) = geocode.base_url {
                self.geocoder_url.update(url, ConfigSource::File);
            }
            if let Some(key) = geocode.api_key {
                self.kakao_api_key.update(Some(key), ConfigSource::File);
            }
            if let Some(delay) = geocode.delay_ms {
                self.geocode_delay_ms.update(delay, ConfigSource::File);
            }
            if let Some(policy) = geocode.on_failure {
                self.on_failure.update(policy, ConfigSource::File);
            }
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // GEOPREP_SOURCE_CRS
        if let Ok(crs_str) = env::var("GEOPREP_SOURCE_CRS") {
            match crs_str.parse::<Crs>() {
                Ok(crs) => self.source_crs.update(crs, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid GEOPREP_SOURCE_CRS value '{}': expected an EPSG code",
                    crs_str
                ),
            }
        }

        // GEOPREP_TARGET_CRS
        if let Ok(crs_str) = env::var("GEOPREP_TARGET_CRS") {
            match crs_str.parse::<Crs>() {
                Ok(crs) => self.target_crs.update(crs, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid GEOPREP_TARGET_CRS value '{}': expected an EPSG code",
                    crs_str
                ),
            }
        }

        // GEOPREP_DEFAULT_CRS
        if let Ok(crs_str) = env::var("GEOPREP_DEFAULT_CRS") {
            match crs_str.parse::<Crs>() {
                Ok(crs) => self.default_crs.update(crs, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid GEOPREP_DEFAULT_CRS value '{}': expected an EPSG code",
                    crs_str
                ),
            }
        }

        // GEOPREP_PARALLEL
        if let Ok(value) = env::var("GEOPREP_PARALLEL") {
            match parse_bool(&value) {
                Ok(parallel) => self.parallel.update(parallel, ConfigSource::Environment),
                Err(_) => {
                    tracing::warn!("Invalid GEOPREP_PARALLEL value '{}': expected true or false", value)
                }
            }
        }

        // GEOPREP_PRETTY
        if let Ok(value) = env::var("GEOPREP_PRETTY") {
            match parse_bool(&value) {
                Ok(pretty) => self.pretty.update(pretty, ConfigSource::Environment),
                Err(_) => {
                    tracing::warn!("Invalid GEOPREP_PRETTY value '{}': expected true or false", value)
                }
            }
        }

        // GEOPREP_GEOCODER_URL
        if let Ok(url) = env::var("GEOPREP_GEOCODER_URL") {
            self.geocoder_url.update(url, ConfigSource::Environment);
        }

        // KAKAO_API_KEY
        if let Ok(key) = env::var("KAKAO_API_KEY") {
            if !key.trim().is_empty() {
                self.kakao_api_key.update(Some(key), ConfigSource::Environment);
            }
        }

        // GEOPREP_GEOCODE_DELAY_MS
        if let Ok(delay_str) = env::var("GEOPREP_GEOCODE_DELAY_MS") {
            match delay_str.parse::<u64>() {
                Ok(delay) => self.geocode_delay_ms.update(delay, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid GEOPREP_GEOCODE_DELAY_MS value '{}': expected milliseconds",
                    delay_str
                ),
            }
        }

        // GEOPREP_ON_FAILURE
        if let Ok(policy_str) = env::var("GEOPREP_ON_FAILURE") {
            match parse_failure_policy(&policy_str) {
                Ok(policy) => self.on_failure.update(policy, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid GEOPREP_ON_FAILURE value '{}': expected skip or abort",
                    policy_str
                ),
            }
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(crs) = overrides.source_crs {
            self.source_crs.update(crs, ConfigSource::Cli);
        }

        if let Some(crs) = overrides.target_crs {
            self.target_crs.update(crs, ConfigSource::Cli);
        }

        if let Some(crs) = overrides.default_crs {
            self.default_crs.update(crs, ConfigSource::Cli);
        }

        if let Some(parallel) = overrides.parallel {
            self.parallel.update(parallel, ConfigSource::Cli);
        }

        if let Some(pretty) = overrides.pretty {
            self.pretty.update(pretty, ConfigSource::Cli);
        }

        if let Some(delay) = overrides.geocode_delay_ms {
            self.geocode_delay_ms.update(delay, ConfigSource::Cli);
        }

        if let Some(policy) = overrides.on_failure {
            self.on_failure.update(policy, ConfigSource::Cli);
        }
    }

    /// The Kakao REST key, or a `ConfigMissing` error naming where to set it
    pub fn require_kakao_api_key(&self) -> Result<&str> {
        self.kakao_api_key
            .value
            .as_deref()
            .ok_or_else(|| GeoprepError::ConfigMissing { key: "KAKAO_API_KEY".to_string() })
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "source_crs".to_string(),
            (self.source_crs.value.to_string(), self.source_crs.source),
        );
        map.insert(
            "target_crs".to_string(),
            (self.target_crs.value.to_string(), self.target_crs.source),
        );
        map.insert(
            "default_crs".to_string(),
            (self.default_crs.value.to_string(), self.default_crs.source),
        );
        map.insert(
            "parallel".to_string(),
            (self.parallel.value.to_string(), self.parallel.source),
        );
        map.insert("pretty".to_string(), (self.pretty.value.to_string(), self.pretty.source));
        map.insert(
            "geocoder_url".to_string(),
            (self.geocoder_url.value.clone(), self.geocoder_url.source),
        );

        // Never echo the key itself
        let key_state = if self.kakao_api_key.value.is_some() { "set" } else { "unset" };
        map.insert(
            "kakao_api_key".to_string(),
            (key_state.to_string(), self.kakao_api_key.source),
        );

        map.insert(
            "geocode_delay_ms".to_string(),
            (self.geocode_delay_ms.value.to_string(), self.geocode_delay_ms.source),
        );
        map.insert(
            "on_failure".to_string(),
            (format!("{:?}", self.on_failure.value).to_lowercase(), self.on_failure.source),
        );

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    source_crs: Option<String>,
    target_crs: Option<String>,
    default_crs: Option<String>,
    parallel: Option<bool>,
    pretty: Option<bool>,
    geocode: Option<GeocodeFileConfig>,
}

#[derive(Debug, Deserialize, Serialize)]
struct GeocodeFileConfig {
    base_url: Option<String>,
    api_key: Option<String>,
    delay_ms: Option<u64>,
    on_failure: Option<FailurePolicy>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub source_crs: Option<Crs>,
    pub target_crs: Option<Crs>,
    pub default_crs: Option<Crs>,
    pub parallel: Option<bool>,
    pub pretty: Option<bool>,
    pub geocode_delay_ms: Option<u64>,
    pub on_failure: Option<FailurePolicy>,
}

/// Parse a boolean flag from string
pub fn parse_bool(s: &str) -> Result<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(GeoprepError::ConfigInvalid {
            key: "bool".to_string(),
            reason: format!("Invalid boolean: {}. Use true or false", s),
        }),
    }
}

/// Parse failure policy from string
pub fn parse_failure_policy(s: &str) -> Result<FailurePolicy> {
    match s.trim().to_lowercase().as_str() {
        "skip" => Ok(FailurePolicy::Skip),
        "abort" => Ok(FailurePolicy::Abort),
        _ => Err(GeoprepError::ConfigInvalid {
            key: "on_failure".to_string(),
            reason: format!("Invalid failure policy: {}. Use skip or abort", s),
        }),
    }
}
