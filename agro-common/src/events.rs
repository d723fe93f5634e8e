//! Event types and event bus for identification progress
//!
//! Events are broadcast with `tokio::sync::broadcast`; subscribers that lag
//! or are absent never block the identification flow.

use crate::identification::{ErrorInfo, IdentificationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Progress stage of a running identification
///
/// These mirror the messages shown on the loading screen while the
/// classifier works.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentificationStage {
    /// Classifier model/runtime is being prepared
    LoadingModel,
    /// Image is being submitted to the classifier
    AnalyzingImage,
    /// Classifier labels are being mapped to crop categories
    IdentifyingCrop,
    /// Result is being assembled
    Finalizing,
}

impl IdentificationStage {
    /// Message displayed for this stage
    pub fn message(&self) -> &'static str {
        match self {
            IdentificationStage::LoadingModel => "Carregando modelo de IA...",
            IdentificationStage::AnalyzingImage => "Analisando imagem...",
            IdentificationStage::IdentifyingCrop => "Identificando cultura...",
            IdentificationStage::Finalizing => "Finalizando identificação...",
        }
    }

    /// Approximate progress percentage at the start of this stage
    pub fn progress_percent(&self) -> u8 {
        match self {
            IdentificationStage::LoadingModel => 0,
            IdentificationStage::AnalyzingImage => 25,
            IdentificationStage::IdentifyingCrop => 50,
            IdentificationStage::Finalizing => 75,
        }
    }
}

/// Identification lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IdentificationEvent {
    /// An identification request started
    Started {
        invocation: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A running identification moved to a new stage
    ///
    /// `message` and `progress` are what the loading screen displays.
    StageChanged {
        invocation: Uuid,
        stage: IdentificationStage,
        message: String,
        progress: u8,
        timestamp: DateTime<Utc>,
    },

    /// Identification settled with a classifier-backed (or no-match) result
    Completed {
        invocation: Uuid,
        result: IdentificationResult,
        timestamp: DateTime<Utc>,
    },

    /// Identification settled on the default identity because the classifier failed
    Degraded {
        invocation: Uuid,
        result: IdentificationResult,
        error: ErrorInfo,
        timestamp: DateTime<Utc>,
    },
}

impl IdentificationEvent {
    /// Stage transition event carrying the stage's display message and progress
    pub fn stage_changed(invocation: Uuid, stage: IdentificationStage) -> Self {
        IdentificationEvent::StageChanged {
            invocation,
            stage,
            message: stage.message().to_string(),
            progress: stage.progress_percent(),
            timestamp: Utc::now(),
        }
    }

    /// Event type name (used as the SSE event name)
    pub fn event_type(&self) -> &str {
        match self {
            IdentificationEvent::Started { .. } => "IdentificationStarted",
            IdentificationEvent::StageChanged { .. } => "IdentificationStageChanged",
            IdentificationEvent::Completed { .. } => "IdentificationCompleted",
            IdentificationEvent::Degraded { .. } => "IdentificationDegraded",
        }
    }

    /// Invocation this event belongs to
    pub fn invocation(&self) -> Uuid {
        match self {
            IdentificationEvent::Started { invocation, .. }
            | IdentificationEvent::StageChanged { invocation, .. }
            | IdentificationEvent::Completed { invocation, .. }
            | IdentificationEvent::Degraded { invocation, .. } => *invocation,
        }
    }
}

/// Broadcast bus for identification events
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<IdentificationEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<IdentificationEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if nobody is listening.
    pub fn emit(
        &self,
        event: IdentificationEvent,
    ) -> Result<usize, broadcast::error::SendError<IdentificationEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: IdentificationEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
