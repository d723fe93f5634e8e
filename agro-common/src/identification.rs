//! Identification types shared between the resolver and its consumers
//!
//! These are the values the diagnosis flow receives: the resolved crop
//! identity and, when the classifier could not be used, the advisory error
//! that explains why the default identity was returned.

use serde::{Deserialize, Serialize};

/// Advisory message shown to the user whenever the default identity is used
/// because the classifier failed.
pub const FALLBACK_ADVISORY: &str = "Erro ao identificar a cultura. Usando identificação padrão.";

/// Resolved crop identity for one identification request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentificationResult {
    /// Stable category slug (e.g. "tomate")
    pub crop_id: String,
    /// Display name of the category (e.g. "Tomate")
    pub crop_name: String,
    /// Confidence (0.0-1.0)
    pub confidence: f64,
}

/// Classifier failure categories surfaced to the consuming flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierErrorKind {
    ModelUnavailable,
    AccelerationUnsupported,
    Fetch,
    Inference,
    Malformed,
    Timeout,
}

impl std::fmt::Display for ClassifierErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifierErrorKind::ModelUnavailable => write!(f, "model_unavailable"),
            ClassifierErrorKind::AccelerationUnsupported => write!(f, "acceleration_unsupported"),
            ClassifierErrorKind::Fetch => write!(f, "fetch"),
            ClassifierErrorKind::Inference => write!(f, "inference"),
            ClassifierErrorKind::Malformed => write!(f, "malformed"),
            ClassifierErrorKind::Timeout => write!(f, "timeout"),
        }
    }
}

/// Recoverable error attached to a degraded identification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Failure category
    pub kind: ClassifierErrorKind,
    /// Human-readable advisory text for display
    pub message: String,
    /// Underlying error description (diagnostics)
    pub detail: String,
}

impl ErrorInfo {
    /// Build an error carrying the standard fallback advisory
    pub fn advisory(kind: ClassifierErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            message: FALLBACK_ADVISORY.to_string(),
            detail: detail.into(),
        }
    }
}
