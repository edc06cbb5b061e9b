//! Config command implementation

use crate::config_loader::{config_file, load_config};
use crate::output::OutputWriter;
use crate::output_types::{ConfigOutput, ConfigValue};
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;
use tabled::Tabled;

pub fn execute(config_path: Option<&Path>, output: &OutputWriter) -> Result<()> {
    let file = config_file(config_path)?;
    let config = load_config(config_path)?;

    let values: BTreeMap<String, ConfigValue> = config
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| (key, ConfigValue { value, source: source.to_string() }))
        .collect();

    if output.is_json() {
        output.result(ConfigOutput {
            config_file: file.map(|p| p.display().to_string()),
            values,
        })?;
        return Ok(());
    }

    #[derive(Tabled)]
    struct ConfigRow {
        #[tabled(rename = "Key")]
        key: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "Source")]
        source: String,
    }

    output.section("Configuration");
    output.kv(
        "Config file",
        file.map(|p| p.display().to_string()).unwrap_or_else(|| "none".to_string()),
    );

    let rows: Vec<ConfigRow> = values
        .into_iter()
        .map(|(key, value)| ConfigRow { key, value: value.value, source: value.source })
        .collect();
    output.table(rows);

    Ok(())
}
