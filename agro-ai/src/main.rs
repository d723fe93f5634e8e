//! agro-ai - Crop Identification Service
//!
//! Identifies the crop in a photograph through an external image classifier
//! and serves the result to the diagnosis flow over HTTP.
//!
//! Run `agro-ai --identify <IMAGE>` for a one-shot identification printed as JSON.

use agro_ai::catalog::CropCatalog;
use agro_ai::classifier::{HttpClassifier, ImageRef};
use agro_ai::config::{resolve_catalog, resolve_classifier_settings, ClassifierOverrides};
use agro_ai::resolver::CropResolver;
use agro_ai::tracker::IdentificationTracker;
use agro_ai::AppState;
use agro_common::config::{resolve_config_path, TomlConfig};
use agro_common::events::EventBus;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(version, about = "agro.IA crop identification service")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "AGRO_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides TOML)
    #[arg(short, long)]
    port: Option<u16>,

    /// Classifier endpoint base URL (overrides ENV and TOML)
    #[arg(long)]
    endpoint: Option<String>,

    /// Classifier model identity (overrides TOML)
    #[arg(long)]
    model: Option<String>,

    /// Classifier call timeout in milliseconds (default: no timeout)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Identify a single image (URL, data URL or path), print the result and exit
    #[arg(long, value_name = "IMAGE")]
    identify: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref(), "AGRO_CONFIG", "agro-ai.toml");
    let config = TomlConfig::load_or_default(config_path.as_deref())
        .context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    let default_filter = format!(
        "agro_ai={0},agro_common={0},tower_http=info",
        config.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting agro-ai (Crop Identification) v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        info!("Configuration: {}", path.display());
    }

    let overrides = ClassifierOverrides {
        endpoint: args.endpoint.clone(),
        model: args.model.clone(),
        timeout_ms: args.timeout_ms,
    };
    let settings = resolve_classifier_settings(&config, &overrides)?;
    let catalog: Arc<CropCatalog> = Arc::new(resolve_catalog(&config)?);

    let classifier = Arc::new(HttpClassifier::new(&settings)?);
    let resolver =
        Arc::new(CropResolver::new(classifier, catalog.clone()).with_timeout(settings.timeout));

    if let Some(image) = args.identify {
        let image = ImageRef::parse(&image)?;
        let outcome = resolver.identify(&image).await;
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    let event_bus = EventBus::new(100);
    let tracker = Arc::new(IdentificationTracker::new(resolver, event_bus.clone()));
    let state = AppState::new(tracker, catalog, event_bus);
    let app = agro_ai::build_router(state);

    let port = args.port.unwrap_or(config.port);
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!("Listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}
