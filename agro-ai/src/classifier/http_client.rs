// Image Classification HTTP Client
//
// Posts an image to `{endpoint}/models/{model}` and reads back a JSON array
// of `{label, score}` observations.

use super::{
    ClassifierError, ClassifierObservation, ClassifierSettings, ExecutionDevice, ImageClassifier,
    ImageRef, Precision,
};
use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Maximum number of response body characters kept in error messages
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Deserialize)]
struct RawObservation {
    label: String,
    score: f64,
}

/// Inference endpoint client
pub struct HttpClassifier {
    client: Client,
    endpoint: String,
    model: String,
    device: ExecutionDevice,
    precision: Precision,
    api_token: Option<String>,
}

impl HttpClassifier {
    /// Create a client from resolved settings
    ///
    /// Only the connection phase is bounded here; the overall call timeout
    /// is applied by the resolver.
    pub fn new(settings: &ClassifierSettings) -> agro_common::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                agro_common::Error::Internal(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            device: settings.device,
            precision: settings.precision,
            api_token: settings.api_token.clone(),
        })
    }

    /// URL the classification request is posted to
    pub fn model_url(&self) -> String {
        format!("{}/models/{}", self.endpoint, self.model)
    }
}

#[async_trait]
impl ImageClassifier for HttpClassifier {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn classify(
        &self,
        image: &ImageRef,
    ) -> Result<Vec<ClassifierObservation>, ClassifierError> {
        let inputs = encode_inputs(image).await?;

        let body = json!({
            "inputs": inputs,
            "parameters": {
                "device": self.device.as_str(),
                "dtype": self.precision.as_str(),
            },
        });

        debug!("Posting classification request to {} ({})", self.model_url(), image.describe());

        let mut request = self.client.post(self.model_url()).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClassifierError::Fetch(format!("Classifier request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| {
                ClassifierError::Fetch(format!("Failed to read classifier response: {}", e))
            })?;

        if !status.is_success() {
            return Err(error_for_status(status, &text, self.device));
        }

        parse_observations(&text)
    }
}

/// Encode the image as the `inputs` value of the request
///
/// URLs are passed through; files and raw bytes are sent base64-encoded.
async fn encode_inputs(image: &ImageRef) -> Result<String, ClassifierError> {
    match image {
        ImageRef::Url(url) => Ok(url.clone()),
        ImageRef::Path(path) => {
            let data = tokio::fs::read(path).await.map_err(|e| {
                ClassifierError::Fetch(format!("Failed to read image {}: {}", path.display(), e))
            })?;
            Ok(base64::engine::general_purpose::STANDARD.encode(data))
        }
        ImageRef::Bytes { data, .. } => Ok(base64::engine::general_purpose::STANDARD.encode(data)),
    }
}

/// Map a non-success HTTP status to a classifier error
fn error_for_status(status: StatusCode, body: &str, device: ExecutionDevice) -> ClassifierError {
    let excerpt: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    let lowered = body.to_lowercase();

    match status {
        StatusCode::NOT_FOUND | StatusCode::SERVICE_UNAVAILABLE => {
            ClassifierError::ModelUnavailable(format!("{}: {}", status, excerpt))
        }
        StatusCode::NOT_IMPLEMENTED => ClassifierError::AccelerationUnsupported(format!(
            "{} ({}): {}",
            device.as_str(),
            status,
            excerpt
        )),
        _ if lowered.contains(device.as_str()) && lowered.contains("unsupported") => {
            ClassifierError::AccelerationUnsupported(format!(
                "{} ({}): {}",
                device.as_str(),
                status,
                excerpt
            ))
        }
        _ => ClassifierError::Inference(format!("{}: {}", status, excerpt)),
    }
}

/// Parse the response body into observations
///
/// Anything other than an array of `{label: string, score: number}` with
/// finite scores in 0.0-1.0 is malformed.
fn parse_observations(body: &str) -> Result<Vec<ClassifierObservation>, ClassifierError> {
    let raw: Vec<RawObservation> = serde_json::from_str(body)
        .map_err(|e| {
            ClassifierError::Malformed(format!("Expected array of {{label, score}}: {}", e))
        })?;

    raw.into_iter()
        .map(|obs| {
            if !obs.score.is_finite() || !(0.0..=1.0).contains(&obs.score) {
                return Err(ClassifierError::Malformed(format!(
                    "Score out of range for '{}': {}",
                    obs.label, obs.score
                )));
            }
            Ok(ClassifierObservation::new(obs.label, obs.score))
        })
        .collect()
}
