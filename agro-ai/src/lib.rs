//! agro-ai library interface
//!
//! Crop identification from photographs: the crop catalog, the classifier
//! collaborator, the resolver and its HTTP surface.

pub mod api;
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod error;
pub mod resolver;
pub mod tracker;

pub use crate::error::{ApiError, ApiResult};

use agro_common::events::EventBus;
use axum::Router;
use catalog::CropCatalog;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracker::IdentificationTracker;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Resolver wrapped with observable loading/error state
    pub tracker: Arc<IdentificationTracker>,
    /// Crop catalog used by the resolver
    pub catalog: Arc<CropCatalog>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        tracker: Arc<IdentificationTracker>,
        catalog: Arc<CropCatalog>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            tracker,
            catalog,
            event_bus,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// CORS is permissive so the browser upload flow can call the service directly.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::crop_routes())
        .merge(api::identify_routes())
        .merge(api::event_routes())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(state)
}
