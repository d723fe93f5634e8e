// Image Classifier Collaborator
//
// The classifier is an external, open-vocabulary image-classification model.
// It is consumed through the `ImageClassifier` trait; `HttpClassifier` talks
// to a remote inference endpoint.

pub mod http_client;

use agro_common::{ClassifierErrorKind, Error, ErrorInfo};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub use http_client::HttpClassifier;

/// One ranked output of the classifier for a single image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierObservation {
    /// Free-text label (English, any case)
    pub label: String,
    /// Probability-like score (0.0-1.0)
    pub score: f64,
}

impl ClassifierObservation {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Reference to the image to classify
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// Remote image the classifier fetches itself
    Url(String),
    /// Local image file
    Path(PathBuf),
    /// Raw image bytes (e.g. decoded from a `data:` URL produced by the upload widget)
    Bytes {
        data: Vec<u8>,
        media_type: Option<String>,
    },
}

impl ImageRef {
    /// Parse an image reference from its textual form
    ///
    /// Accepts `http(s)://` URLs, base64 `data:` URLs, or a filesystem path.
    pub fn parse(input: &str) -> agro_common::Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::InvalidInput("Image reference is empty".to_string()));
        }

        if input.starts_with("http://") || input.starts_with("https://") {
            return Ok(ImageRef::Url(input.to_string()));
        }

        if let Some(rest) = input.strip_prefix("data:") {
            return parse_data_url(rest);
        }

        Ok(ImageRef::Path(PathBuf::from(input)))
    }

    /// Short description for logs (never includes image bytes)
    pub fn describe(&self) -> String {
        match self {
            ImageRef::Url(url) => format!("url {}", url),
            ImageRef::Path(path) => format!("file {}", path.display()),
            ImageRef::Bytes { data, media_type } => format!(
                "{} bytes ({})",
                data.len(),
                media_type.as_deref().unwrap_or("unknown type")
            ),
        }
    }
}

/// Parse the part of a data URL after `data:`
fn parse_data_url(rest: &str) -> agro_common::Result<ImageRef> {
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::InvalidInput("Data URL has no payload".to_string()))?;

    let (media_type, is_base64) = match header.strip_suffix(";base64") {
        Some(media_type) => (media_type, true),
        None => (header, false),
    };

    if !is_base64 {
        return Err(Error::InvalidInput(
            "Only base64-encoded data URLs are supported".to_string(),
        ));
    }

    let data = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::InvalidInput(format!("Invalid base64 image data: {}", e)))?;

    if data.is_empty() {
        return Err(Error::InvalidInput("Data URL contains no image bytes".to_string()));
    }

    Ok(ImageRef::Bytes {
        data,
        media_type: (!media_type.is_empty()).then(|| media_type.to_string()),
    })
}

/// Acceleration preference passed to the classifier (performance hint only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionDevice {
    Webgpu,
    Wasm,
    Cpu,
}

impl ExecutionDevice {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionDevice::Webgpu => "webgpu",
            ExecutionDevice::Wasm => "wasm",
            ExecutionDevice::Cpu => "cpu",
        }
    }
}

impl FromStr for ExecutionDevice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "webgpu" | "gpu" => Ok(ExecutionDevice::Webgpu),
            "wasm" => Ok(ExecutionDevice::Wasm),
            "cpu" => Ok(ExecutionDevice::Cpu),
            other => Err(Error::Config(format!("Unknown classifier device: {}", other))),
        }
    }
}

/// Numeric precision passed to the classifier (performance hint only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Fp32,
    Fp16,
    Q8,
}

impl Precision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Fp32 => "fp32",
            Precision::Fp16 => "fp16",
            Precision::Q8 => "q8",
        }
    }
}

impl FromStr for Precision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fp32" => Ok(Precision::Fp32),
            "fp16" => Ok(Precision::Fp16),
            "q8" => Ok(Precision::Q8),
            other => Err(Error::Config(format!("Unknown classifier dtype: {}", other))),
        }
    }
}

/// Resolved classifier settings
#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    /// Base URL of the inference endpoint
    pub endpoint: String,
    /// Model identity
    pub model: String,
    pub device: ExecutionDevice,
    pub precision: Precision,
    /// Classifier call timeout; `None` waits indefinitely
    pub timeout: Option<Duration>,
    /// Bearer token for the endpoint
    pub api_token: Option<String>,
}

/// Classifier failure
///
/// Every variant is recoverable: the resolver degrades to the default
/// identity and surfaces the error as advisory information.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Model cannot be loaded or is not served by the endpoint
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Requested hardware acceleration is not supported
    #[error("Hardware acceleration unsupported: {0}")]
    AccelerationUnsupported(String),

    /// Network or image asset fetch failure
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Inference ran but failed
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Response did not have the expected shape
    #[error("Malformed classifier response: {0}")]
    Malformed(String),

    /// Classifier did not answer within the configured timeout
    #[error("Classifier timed out after {0:?}")]
    Timeout(Duration),
}

impl ClassifierError {
    /// Failure category
    pub fn kind(&self) -> ClassifierErrorKind {
        match self {
            ClassifierError::ModelUnavailable(_) => ClassifierErrorKind::ModelUnavailable,
            ClassifierError::AccelerationUnsupported(_) => {
                ClassifierErrorKind::AccelerationUnsupported
            }
            ClassifierError::Fetch(_) => ClassifierErrorKind::Fetch,
            ClassifierError::Inference(_) => ClassifierErrorKind::Inference,
            ClassifierError::Malformed(_) => ClassifierErrorKind::Malformed,
            ClassifierError::Timeout(_) => ClassifierErrorKind::Timeout,
        }
    }

    /// Advisory error information for the consuming flow
    pub fn to_error_info(&self) -> ErrorInfo {
        ErrorInfo::advisory(self.kind(), self.to_string())
    }
}

/// Image classifier collaborator
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    /// Model identity used for classification
    fn model_id(&self) -> &str;

    /// Classify an image
    ///
    /// # Returns
    /// * `Ok(observations)` - Ranked labels in the order produced by the model
    ///   (not necessarily sorted, possibly empty)
    /// * `Err(_)` - Classifier unavailable or inference failed
    async fn classify(
        &self,
        image: &ImageRef,
    ) -> Result<Vec<ClassifierObservation>, ClassifierError>;
}
