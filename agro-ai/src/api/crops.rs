//! Crop catalog endpoint (drives the manual crop picker)

use axum::{extract::State, routing::get, Json, Router};

use crate::catalog::CropCategory;
use crate::AppState;

/// GET /crops
///
/// Supported crop categories in declaration order.
pub async fn list_crops(State(state): State<AppState>) -> Json<Vec<CropCategory>> {
    Json(state.catalog.categories().to_vec())
}

pub fn crop_routes() -> Router<AppState> {
    Router::new().route("/crops", get(list_crops))
}
