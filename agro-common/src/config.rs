//! Configuration loading and config file resolution
//!
//! Bootstrap configuration comes from a TOML file. The file is located with
//! the following priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. `~/.config/agro/<file_name>` if it exists
//! 4. Built-in defaults (no file)
//!
//! Individual settings that may also come from the environment (classifier
//! endpoint, API token) are resolved with [`resolve_setting`].

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default HTTP port for agro-ai
pub const DEFAULT_PORT: u16 = 5780;

/// Default image-classification model
pub const DEFAULT_MODEL: &str = "google/vit-base-patch16-224";

/// Default inference endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api-inference.huggingface.co";

/// Bootstrap configuration loaded from TOML file
///
/// Settings cannot change while the service runs.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Classifier collaborator settings (optional)
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Crop catalog override; the built-in catalog is used when empty
    #[serde(default)]
    pub crops: Vec<CropConfig>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            logging: LoggingConfig::default(),
            classifier: ClassifierConfig::default(),
            crops: Vec::new(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Classifier collaborator settings
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Base URL of the inference endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model identity requested from the endpoint
    #[serde(default = "default_model")]
    pub model: String,

    /// Acceleration preference ("webgpu", "wasm", "cpu")
    #[serde(default = "default_device")]
    pub device: String,

    /// Numeric precision ("fp32", "fp16", "q8")
    #[serde(default = "default_dtype")]
    pub dtype: String,

    /// Classifier call timeout in milliseconds; no timeout when absent
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Bearer token for the inference endpoint
    #[serde(default)]
    pub api_token: Option<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            device: default_device(),
            dtype: default_dtype(),
            timeout_ms: None,
            api_token: None,
        }
    }
}

/// One crop category entry of a catalog override
///
/// ```toml
/// [[crops]]
/// id = "tomate"
/// name = "Tomate"
/// aliases = ["tomato", "red pepper"]
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CropConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_device() -> String {
    "webgpu".to_string()
}

fn default_dtype() -> String {
    "fp32".to_string()
}

impl TomlConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load configuration from `path`, or built-in defaults when no path is given
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Self::load(path)
            }
            None => {
                info!("No configuration file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Locate the TOML configuration file
///
/// Returns `None` when neither the CLI nor the environment names a file and
/// no file exists at the default location.
pub fn resolve_config_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    file_name: &str,
) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Default per-user location
    default_config_path(file_name).filter(|p| p.exists())
}

/// Get the default per-user configuration file path
pub fn default_config_path(file_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("agro").join(file_name))
}

/// Resolve a single string setting from CLI → ENV → TOML
///
/// Blank values are ignored. Warns when the setting is present in more than
/// one source.
pub fn resolve_setting(
    name: &str,
    cli_value: Option<&str>,
    env_var_name: &str,
    toml_value: Option<&str>,
) -> Option<String> {
    let env_value = std::env::var(env_var_name).ok();

    let candidates = [
        ("command line", cli_value),
        ("environment", env_value.as_deref()),
        ("TOML", toml_value),
    ];

    let present: Vec<(&str, &str)> = candidates
        .iter()
        .filter_map(|(source, value)| value.filter(|v| is_set(v)).map(|v| (*source, v)))
        .collect();

    if present.len() > 1 {
        let sources: Vec<&str> = present.iter().map(|(source, _)| *source).collect();
        warn!(
            "{} found in multiple sources: {}. Using {} (highest priority).",
            name,
            sources.join(", "),
            sources[0]
        );
    }

    present.first().map(|(source, value)| {
        info!("{} loaded from {}", name, source);
        value.trim().to_string()
    })
}

/// Setting value is non-empty and not only whitespace
fn is_set(value: &str) -> bool {
    !value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.classifier.model, DEFAULT_MODEL);
        assert_eq!(config.classifier.device, "webgpu");
        assert_eq!(config.classifier.dtype, "fp32");
        assert!(config.classifier.timeout_ms.is_none());
        assert!(config.crops.is_empty());
    }

    #[test]
    fn test_parse_partial_file_keeps_defaults() {
        let config = TomlConfig::parse(
            r#"
            port = 6000

            [classifier]
            timeout_ms = 2500
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 6000);
        assert_eq!(config.classifier.timeout_ms, Some(2500));
        assert_eq!(config.classifier.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_invalid_toml_is_config_error() {
        let err = TomlConfig::parse("port = \"not a number\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
