//! Configuration resolution for agro-ai
//!
//! Classifier endpoint and token: CLI → ENV → TOML → built-in default.
//! Crop catalog: `[[crops]]` from TOML when present, else the built-in catalog.

use crate::catalog::CropCatalog;
use crate::classifier::{ClassifierSettings, ExecutionDevice, Precision};
use agro_common::config::{resolve_setting, TomlConfig, DEFAULT_ENDPOINT};
use agro_common::Result;
use std::time::Duration;
use tracing::info;

/// Environment variable overriding the classifier endpoint
pub const ENDPOINT_ENV: &str = "AGRO_CLASSIFIER_ENDPOINT";

/// Environment variable supplying the classifier bearer token
pub const TOKEN_ENV: &str = "AGRO_CLASSIFIER_TOKEN";

/// Command-line overrides for classifier settings
#[derive(Debug, Clone, Default)]
pub struct ClassifierOverrides {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub timeout_ms: Option<u64>,
}

/// Resolve classifier settings from CLI overrides, environment and TOML
pub fn resolve_classifier_settings(
    config: &TomlConfig,
    overrides: &ClassifierOverrides,
) -> Result<ClassifierSettings> {
    let toml = &config.classifier;

    let endpoint = resolve_setting(
        "Classifier endpoint",
        overrides.endpoint.as_deref(),
        ENDPOINT_ENV,
        Some(toml.endpoint.as_str()),
    )
    .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

    let api_token = resolve_setting("Classifier token", None, TOKEN_ENV, toml.api_token.as_deref());

    let model = overrides
        .model
        .clone()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| toml.model.clone());

    let device: ExecutionDevice = toml.device.parse()?;
    let precision: Precision = toml.dtype.parse()?;

    let timeout = overrides
        .timeout_ms
        .or(toml.timeout_ms)
        .map(Duration::from_millis);

    info!(
        "Classifier: {} (model: {}, device: {}, dtype: {}, timeout: {})",
        endpoint,
        model,
        device.as_str(),
        precision.as_str(),
        timeout
            .map(|t| format!("{}ms", t.as_millis()))
            .unwrap_or_else(|| "none".to_string())
    );

    Ok(ClassifierSettings {
        endpoint,
        model,
        device,
        precision,
        timeout,
        api_token,
    })
}

/// Resolve the crop catalog
pub fn resolve_catalog(config: &TomlConfig) -> Result<CropCatalog> {
    if config.crops.is_empty() {
        info!("Using built-in crop catalog");
        return Ok(CropCatalog::default());
    }

    let catalog = CropCatalog::from_crop_configs(&config.crops)?;
    info!(
        "Using configured crop catalog ({} categories, fallback: {})",
        catalog.categories().len(),
        catalog.fallback_category().id
    );
    Ok(catalog)
}
