// Crop Identification Resolver
//
// One classifier invocation per request. Observations are scored through the
// catalog; the best category replaces the fallback identity only with a
// strictly higher score. Classifier failures never propagate: the caller
// always receives an identity, degraded to the fallback when needed.

use crate::catalog::{score_observation, CropCatalog};
use crate::classifier::{ClassifierError, ClassifierObservation, ImageClassifier, ImageRef};
use agro_common::events::IdentificationStage;
use agro_common::{ErrorInfo, IdentificationResult};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Confidence of the fallback identity
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

/// Outcome of one identification
///
/// Both variants carry a usable result; `Degraded` also carries the advisory
/// error explaining why the fallback identity was used.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IdentificationOutcome {
    Resolved(IdentificationResult),
    Degraded {
        result: IdentificationResult,
        error: ErrorInfo,
    },
}

impl IdentificationOutcome {
    pub fn result(&self) -> &IdentificationResult {
        match self {
            IdentificationOutcome::Resolved(result) => result,
            IdentificationOutcome::Degraded { result, .. } => result,
        }
    }

    pub fn into_result(self) -> IdentificationResult {
        match self {
            IdentificationOutcome::Resolved(result) => result,
            IdentificationOutcome::Degraded { result, .. } => result,
        }
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        match self {
            IdentificationOutcome::Resolved(_) => None,
            IdentificationOutcome::Degraded { error, .. } => Some(error),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, IdentificationOutcome::Degraded { .. })
    }
}

/// Fallback identity: first declared category at the fallback confidence
pub fn fallback_result(catalog: &CropCatalog) -> IdentificationResult {
    let category = catalog.fallback_category();
    IdentificationResult {
        crop_id: category.id.clone(),
        crop_name: category.display_name.clone(),
        confidence: FALLBACK_CONFIDENCE,
    }
}

/// Select the best identity for an ordered observation sequence
///
/// Starts from the fallback identity and walks observations in arrival
/// order; a matched observation replaces the current best only if its score
/// is strictly greater. Equal scores keep the earlier candidate.
pub fn select_best(
    observations: &[ClassifierObservation],
    catalog: &CropCatalog,
) -> IdentificationResult {
    let mut best = fallback_result(catalog);

    for observation in observations {
        let Some((category, score)) = score_observation(observation, catalog) else {
            continue;
        };

        debug!(
            "Label '{}' maps to {} (score {:.3})",
            observation.label, category.id, score
        );

        if score > best.confidence {
            best = IdentificationResult {
                crop_id: category.id.clone(),
                crop_name: category.display_name.clone(),
                confidence: score,
            };
        }
    }

    best
}

/// Resolves crop identity from an image through the classifier collaborator
///
/// Holds no per-call mutable state; overlapping calls are independent.
pub struct CropResolver {
    classifier: Arc<dyn ImageClassifier>,
    catalog: Arc<CropCatalog>,
    timeout: Option<Duration>,
}

impl CropResolver {
    /// Create a resolver with no classifier timeout
    pub fn new(classifier: Arc<dyn ImageClassifier>, catalog: Arc<CropCatalog>) -> Self {
        Self {
            classifier,
            catalog,
            timeout: None,
        }
    }

    /// Bound the classifier call; expiry degrades to the fallback identity
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Identify the crop in an image
    pub async fn identify(&self, image: &ImageRef) -> IdentificationOutcome {
        self.identify_with_progress(image, |_| {}).await
    }

    /// Identify the crop in an image, reporting stage transitions to `progress`
    pub async fn identify_with_progress<F>(
        &self,
        image: &ImageRef,
        mut progress: F,
    ) -> IdentificationOutcome
    where
        F: FnMut(IdentificationStage) + Send,
    {
        info!(
            "Identifying crop from {} (model: {})",
            image.describe(),
            self.classifier.model_id()
        );

        progress(IdentificationStage::AnalyzingImage);
        let classified = self.invoke_classifier(image).await;

        let outcome = match classified {
            Ok(observations) => {
                progress(IdentificationStage::IdentifyingCrop);
                debug!("Classifier returned {} observations", observations.len());

                let result = select_best(&observations, &self.catalog);
                info!(
                    "Crop identified: {} (confidence: {:.3})",
                    result.crop_id, result.confidence
                );
                IdentificationOutcome::Resolved(result)
            }
            Err(e) => {
                warn!("Crop identification failed, using default identification: {}", e);
                IdentificationOutcome::Degraded {
                    result: fallback_result(&self.catalog),
                    error: e.to_error_info(),
                }
            }
        };

        progress(IdentificationStage::Finalizing);
        outcome
    }

    /// Single await point: the classifier call, bounded by the optional timeout
    async fn invoke_classifier(
        &self,
        image: &ImageRef,
    ) -> Result<Vec<ClassifierObservation>, ClassifierError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.classifier.classify(image))
                .await
                .map_err(|_| ClassifierError::Timeout(limit))?,
            None => self.classifier.classify(image).await,
        }
    }
}
