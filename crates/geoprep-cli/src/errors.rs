use console::style;
use geoprep_core::GeoprepError;
use std::fmt;

/// Enhanced error type with suggestions
#[derive(Clone)]
pub struct CliError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
    pub help_command: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
            help_command: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_help(mut self, command: impl Into<String>) -> Self {
        self.help_command = Some(command.into());
        self
    }

    pub fn display(&self) {
        eprintln!("{} {}\n", style("✗").red().bold(), style(&self.message).red().bold());

        if let Some(ref context) = self.context {
            eprintln!("{}", context);
            eprintln!();
        }

        if !self.suggestions.is_empty() {
            eprintln!("{}", style("To fix this:").yellow().bold());
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, suggestion);
            }
            eprintln!();
        }

        if let Some(ref help_cmd) = self.help_command {
            eprintln!("{} {}", style("Need help?").cyan(), style(help_cmd).cyan().bold());
        }
    }

    /// Machine-readable form for `--json` mode
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "status": "error",
            "message": self.message,
            "context": self.context,
            "suggestions": self.suggestions,
        })
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Create error for a missing input file
pub fn input_not_found(path: &str) -> CliError {
    CliError::new("Input file not found")
        .with_context(format!("The specified input file does not exist.\n\nPath: {}", path))
        .with_suggestion("Check the file path and try again")
        .with_suggestion("Use absolute path or path relative to current directory")
}

/// Create error for malformed or unprojectable geometry
pub fn geometry_error(error: &GeoprepError) -> CliError {
    let location = error.path().map(|p| p.to_string()).unwrap_or_default();

    match error {
        GeoprepError::MalformedGeometry { reason, .. } => CliError::new("Malformed geometry")
            .with_context(format!("Location: {}\nReason: {}\n\nNo output was written.", location, reason))
            .with_suggestion("Fix the coordinates at the location above")
            .with_suggestion("Run: geoprep inspect <INPUT> to check the rest of the document"),
        GeoprepError::ProjectionFailure { reason, .. } => CliError::new("Projection failed")
            .with_context(format!("Location: {}\nReason: {}\n\nNo output was written.", location, reason))
            .with_suggestion("Check that --from names the CRS the coordinates are really in")
            .with_help("Run: geoprep reproject --help"),
        other => CliError::new(other.to_string()),
    }
}

/// Create error for a missing Kakao API key
pub fn kakao_key_missing() -> CliError {
    CliError::new("Kakao API key not configured")
        .with_context("Geocoding needs a Kakao REST API key.")
        .with_suggestion("Set KAKAO_API_KEY: export KAKAO_API_KEY=\"your-rest-api-key\"")
        .with_suggestion("Or add to geoprep.toml:\n  [geocode]\n  api_key = \"your-rest-api-key\"")
        .with_help("Run: geoprep config")
}

/// Create error for invalid configuration
pub fn invalid_config(key: &str, reason: &str) -> CliError {
    CliError::new(format!("Invalid configuration: {}", key))
        .with_context(format!("Configuration value is invalid.\n\nReason: {}", reason))
        .with_suggestion("Check geoprep.toml for syntax errors")
        .with_suggestion("Check GEOPREP_* environment variables")
        .with_help("Run: geoprep config")
}

/// Create error for an unsupported input format
pub fn unsupported_format(extension: &str, supported: &[String]) -> CliError {
    CliError::new(format!("Unsupported input format: .{}", extension))
        .with_context(format!("Supported extensions: {}", supported.join(", ")))
        .with_suggestion("Convert the input to GeoJSON or Shapefile first")
}

/// Convert anyhow::Error to CliError with context
pub fn from_anyhow(error: anyhow::Error) -> CliError {
    if let Some(cli_error) = error.downcast_ref::<CliError>() {
        return cli_error.clone();
    }

    if let Some(geoprep_error) = error.downcast_ref::<GeoprepError>() {
        return match geoprep_error {
            GeoprepError::MalformedGeometry { .. } | GeoprepError::ProjectionFailure { .. } => {
                geometry_error(geoprep_error)
            }
            GeoprepError::ConfigMissing { key } if key == "KAKAO_API_KEY" => kakao_key_missing(),
            GeoprepError::ConfigInvalid { key, reason } => invalid_config(key, reason),
            GeoprepError::UnsupportedFormat { extension, supported } => {
                unsupported_format(extension, supported)
            }
            other => CliError::new(other.to_string()),
        };
    }

    let message = format!("{:#}", error);

    if message.contains("No such file or directory") {
        CliError::new("File not found")
            .with_context(format!("Error: {}", message))
            .with_suggestion("Check the file path and try again")
    } else if message.to_lowercase().contains("permission denied") {
        CliError::new("Permission denied")
            .with_context(format!("Error: {}", message))
            .with_suggestion("Check file permissions")
            .with_suggestion("Or run with appropriate privileges")
    } else {
        CliError::new(message)
    }
}
