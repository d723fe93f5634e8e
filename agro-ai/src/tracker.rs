// Identification Tracker - observable loading/error state
//
// Wraps the resolver for a consuming flow that wants `is_loading` and
// `last_error`. State lives in a watch channel; every invocation gets a
// generation number and only the newest invocation may publish its settled
// state. Older invocations still return their own outcome to their caller.
// An invocation dropped before settling resets the state to `Idle` if it is
// still the newest one.

use crate::classifier::ImageRef;
use crate::resolver::{CropResolver, IdentificationOutcome};
use agro_common::events::{EventBus, IdentificationEvent, IdentificationStage};
use agro_common::{ErrorInfo, IdentificationResult};
use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

/// Observable resolver state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ResolverState {
    Idle,
    Running {
        invocation: Uuid,
    },
    Succeeded {
        invocation: Uuid,
        result: IdentificationResult,
    },
    Failed {
        invocation: Uuid,
        result: IdentificationResult,
        error: ErrorInfo,
    },
}

impl ResolverState {
    pub fn is_loading(&self) -> bool {
        matches!(self, ResolverState::Running { .. })
    }

    pub fn last_error(&self) -> Option<&ErrorInfo> {
        match self {
            ResolverState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Outcome of a tracked identification together with its invocation id
#[derive(Debug, Clone)]
pub struct TrackedIdentification {
    pub invocation: Uuid,
    pub outcome: IdentificationOutcome,
}

/// Resolver wrapper publishing observable state and lifecycle events
pub struct IdentificationTracker {
    resolver: Arc<CropResolver>,
    event_bus: EventBus,
    state: watch::Sender<ResolverState>,
    generation: AtomicU64,
}

impl IdentificationTracker {
    pub fn new(resolver: Arc<CropResolver>, event_bus: EventBus) -> Self {
        let (state, _) = watch::channel(ResolverState::Idle);
        Self {
            resolver,
            event_bus,
            state,
            generation: AtomicU64::new(0),
        }
    }

    /// Run one identification, publishing `Running` and then the settled state
    ///
    /// Always returns an outcome; classifier failures arrive as
    /// `IdentificationOutcome::Degraded`.
    pub async fn track(&self, image: &ImageRef) -> TrackedIdentification {
        let invocation = Uuid::new_v4();
        let mut generation = 0;

        // Generation bump and Running publish happen under the channel lock
        self.state.send_modify(|state| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = ResolverState::Running { invocation };
        });
        let mut in_flight = InFlight {
            tracker: self,
            generation,
            invocation,
            settled: false,
        };

        self.event_bus.emit_lossy(IdentificationEvent::Started {
            invocation,
            timestamp: Utc::now(),
        });
        self.emit_stage(invocation, IdentificationStage::LoadingModel);

        let outcome = self
            .resolver
            .identify_with_progress(image, |stage| self.emit_stage(invocation, stage))
            .await;

        let settled = match &outcome {
            IdentificationOutcome::Resolved(result) => ResolverState::Succeeded {
                invocation,
                result: result.clone(),
            },
            IdentificationOutcome::Degraded { result, error } => ResolverState::Failed {
                invocation,
                result: result.clone(),
                error: error.clone(),
            },
        };

        if !in_flight.settle(settled) {
            debug!(
                "Identification {} settled after a newer request started; state not published",
                invocation
            );
        }

        let event = match &outcome {
            IdentificationOutcome::Resolved(result) => IdentificationEvent::Completed {
                invocation,
                result: result.clone(),
                timestamp: Utc::now(),
            },
            IdentificationOutcome::Degraded { result, error } => IdentificationEvent::Degraded {
                invocation,
                result: result.clone(),
                error: error.clone(),
                timestamp: Utc::now(),
            },
        };
        self.event_bus.emit_lossy(event);

        TrackedIdentification { invocation, outcome }
    }

    /// Current observable state
    pub fn state(&self) -> ResolverState {
        self.state.borrow().clone()
    }

    /// An identification is in flight
    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    /// Advisory message of the most recent settled identification, if it failed
    pub fn last_error(&self) -> Option<String> {
        self.state.borrow().last_error().map(|e| e.message.clone())
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<ResolverState> {
        self.state.subscribe()
    }

    fn emit_stage(&self, invocation: Uuid, stage: IdentificationStage) {
        self.event_bus.emit_lossy(IdentificationEvent::stage_changed(invocation, stage));
    }

    /// Replace the state if `generation` is still the newest invocation
    fn publish_if_latest(&self, generation: u64, next: ResolverState) -> bool {
        self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) == generation {
                *state = next;
                true
            } else {
                false
            }
        })
    }
}

/// Running invocation; publishes `Idle` on drop unless it settled first
struct InFlight<'a> {
    tracker: &'a IdentificationTracker,
    generation: u64,
    invocation: Uuid,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(&mut self, state: ResolverState) -> bool {
        self.settled = true;
        self.tracker.publish_if_latest(self.generation, state)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled && self.tracker.publish_if_latest(self.generation, ResolverState::Idle) {
            debug!(
                "Identification {} dropped before settling; state reset to idle",
                self.invocation
            );
        }
    }
}
