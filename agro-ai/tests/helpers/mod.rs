//! Shared test doubles for the image classifier collaborator

#![allow(dead_code)]

use agro_ai::classifier::{ClassifierError, ClassifierObservation, ImageClassifier, ImageRef};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

pub fn obs(label: &str, score: f64) -> ClassifierObservation {
    ClassifierObservation::new(label, score)
}

pub fn url(name: &str) -> ImageRef {
    ImageRef::Url(format!("https://example.com/{}.jpg", name))
}

/// Classifier returning the same observations for every image
pub struct FixedClassifier {
    observations: Vec<ClassifierObservation>,
    calls: AtomicUsize,
}

impl FixedClassifier {
    pub fn new(observations: Vec<ClassifierObservation>) -> Arc<Self> {
        Arc::new(Self {
            observations,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageClassifier for FixedClassifier {
    fn model_id(&self) -> &str {
        "test/fixed"
    }

    async fn classify(
        &self,
        _image: &ImageRef,
    ) -> Result<Vec<ClassifierObservation>, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.observations.clone())
    }
}

/// Classifier that always fails with the error produced by `make_error`
pub struct FailingClassifier {
    make_error: fn() -> ClassifierError,
}

impl FailingClassifier {
    pub fn new(make_error: fn() -> ClassifierError) -> Arc<Self> {
        Arc::new(Self { make_error })
    }

    pub fn unavailable() -> Arc<Self> {
        Self::new(|| ClassifierError::ModelUnavailable("model not loaded".to_string()))
    }
}

#[async_trait]
impl ImageClassifier for FailingClassifier {
    fn model_id(&self) -> &str {
        "test/failing"
    }

    async fn classify(
        &self,
        _image: &ImageRef,
    ) -> Result<Vec<ClassifierObservation>, ClassifierError> {
        Err((self.make_error)())
    }
}

/// Classifier that answers only after `delay`
pub struct SlowClassifier {
    delay: Duration,
    observations: Vec<ClassifierObservation>,
}

impl SlowClassifier {
    pub fn new(delay: Duration, observations: Vec<ClassifierObservation>) -> Arc<Self> {
        Arc::new(Self { delay, observations })
    }
}

#[async_trait]
impl ImageClassifier for SlowClassifier {
    fn model_id(&self) -> &str {
        "test/slow"
    }

    async fn classify(
        &self,
        _image: &ImageRef,
    ) -> Result<Vec<ClassifierObservation>, ClassifierError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.observations.clone())
    }
}

/// Scripted response for one image in a [`GatedClassifier`]
pub struct Script {
    pub gate: Arc<Semaphore>,
    pub response: Result<Vec<ClassifierObservation>, String>,
}

/// Classifier whose answers per image are held until the test opens the gate
///
/// Responses are keyed by image URL. An `Err` script fails with
/// `ClassifierError::Inference`.
pub struct GatedClassifier {
    scripts: HashMap<String, Script>,
}

impl GatedClassifier {
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
        }
    }

    /// Register a response; returns the gate to release it
    pub fn script(
        &mut self,
        image: &ImageRef,
        response: Result<Vec<ClassifierObservation>, String>,
    ) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        let key = match image {
            ImageRef::Url(url) => url.clone(),
            other => other.describe(),
        };
        self.scripts.insert(
            key,
            Script {
                gate: gate.clone(),
                response,
            },
        );
        gate
    }
}

#[async_trait]
impl ImageClassifier for GatedClassifier {
    fn model_id(&self) -> &str {
        "test/gated"
    }

    async fn classify(
        &self,
        image: &ImageRef,
    ) -> Result<Vec<ClassifierObservation>, ClassifierError> {
        let key = match image {
            ImageRef::Url(url) => url.clone(),
            other => other.describe(),
        };
        let script = self
            .scripts
            .get(&key)
            .ok_or_else(|| ClassifierError::Fetch(format!("no script for {}", key)))?;

        let _permit = script
            .gate
            .acquire()
            .await
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        script.response.clone().map_err(ClassifierError::Inference)
    }
}

/// Wait until `condition` holds, polling briefly
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}
