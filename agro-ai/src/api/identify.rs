//! Crop identification endpoints

use agro_common::{ErrorInfo, IdentificationResult};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::classifier::ImageRef;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /identify request body
#[derive(Debug, Deserialize)]
pub struct IdentifyRequest {
    /// Image reference: http(s) URL or base64 data URL
    pub image: String,
}

/// POST /identify response body
#[derive(Debug, Serialize, Deserialize)]
pub struct IdentifyResponse {
    pub invocation: Uuid,
    pub result: IdentificationResult,
    /// Default identification used because the classifier failed
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

/// GET /identify/state response body
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyStateResponse {
    pub is_loading: bool,
    pub last_error: Option<String>,
}

/// POST /identify
///
/// Always answers 200 with a crop identity once the image reference parses;
/// classifier failures are reported through `degraded` and `error`.
/// Server-local paths are rejected: only the CLI may read local files.
///
/// The identification runs in its own task so a disconnecting client does
/// not cancel it halfway.
pub async fn identify(
    State(state): State<AppState>,
    Json(request): Json<IdentifyRequest>,
) -> ApiResult<Json<IdentifyResponse>> {
    let image = ImageRef::parse(&request.image)?;
    if let ImageRef::Path(_) = image {
        return Err(ApiError::BadRequest(
            "Image must be an http(s) URL or a base64 data URL".to_string(),
        ));
    }
    info!("Identification requested for {}", image.describe());

    let tracker = state.tracker.clone();
    let tracked = tokio::spawn(async move { tracker.track(&image).await })
        .await
        .map_err(|e| ApiError::Internal(format!("Identification task failed: {}", e)))?;

    Ok(Json(IdentifyResponse {
        invocation: tracked.invocation,
        degraded: tracked.outcome.is_degraded(),
        error: tracked.outcome.error().cloned(),
        result: tracked.outcome.into_result(),
    }))
}

/// GET /identify/state
pub async fn identify_state(State(state): State<AppState>) -> Json<IdentifyStateResponse> {
    Json(IdentifyStateResponse {
        is_loading: state.tracker.is_loading(),
        last_error: state.tracker.last_error(),
    })
}

pub fn identify_routes() -> Router<AppState> {
    Router::new()
        .route("/identify", post(identify))
        .route("/identify/state", get(identify_state))
}
