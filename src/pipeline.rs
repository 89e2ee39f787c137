//! The per-turn pipeline: fixed-order orchestration and the catch boundary.
//!
//! Drives the five operations in the order the host runs them every turn:
//! `dispatch.observe`, `evaluator.should_run`, `evaluator.capture` (gated),
//! `guidance.render`, `dispatch.deliver`. Every operation failure is caught
//! here, logged exactly once with its component and operation, recorded as a
//! typed [`TurnFailure`], and replaced by that operation's safe default, so
//! the host can see what a failed turn meant without digging through logs.

use tracing::{debug, error};

use crate::dispatch::{DeliveryOutcome, DispatchError, MaterialDispatch, SightingReport};
use crate::evaluator::{CaptureReport, CompletionEvaluator, EvaluatorError};
use crate::guidance::{GuidanceProvider, FALLBACK_GUIDANCE};
use crate::history::TurnContext;

/// Which collaborator a turn failure originated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The record store.
    Store,
    /// The extraction oracle.
    Oracle,
    /// The conversation history source.
    History,
    /// The mail transport.
    Transport,
}

/// One caught operation failure.
#[derive(Debug, Clone)]
pub struct TurnFailure {
    /// Component that failed: `"dispatch"`, `"evaluator"`, or `"guidance"`.
    pub component: &'static str,
    /// Operation that failed, e.g. `"observe"` or `"render"`.
    pub operation: &'static str,
    /// Collaborator the failure originated in.
    pub kind: FailureKind,
    /// Rendered error message.
    pub message: String,
}

/// Per-operation outcomes of one pipeline pass.
#[derive(Debug)]
pub struct TurnReport {
    /// Sighting sweep outcome, when `observe` completed.
    pub sighting: Option<SightingReport>,
    /// The evaluator gate value used this turn (`false` on gate failure).
    pub capture_gate: bool,
    /// Capture outcome, when the gate let it run and it completed.
    pub capture: Option<CaptureReport>,
    /// Guidance text for the host's next prompt context.
    pub guidance: String,
    /// Delivery outcome, when `deliver` completed.
    pub delivery: Option<DeliveryOutcome>,
    /// Typed failures caught at operation boundaries this turn.
    pub failures: Vec<TurnFailure>,
}

/// Fixed-order per-turn orchestrator and single catch boundary.
pub struct TurnPipeline {
    guidance: GuidanceProvider,
    evaluator: CompletionEvaluator,
    dispatch: MaterialDispatch,
}

impl TurnPipeline {
    /// Wire the three components into a pipeline.
    pub fn new(
        guidance: GuidanceProvider,
        evaluator: CompletionEvaluator,
        dispatch: MaterialDispatch,
    ) -> Self {
        Self {
            guidance,
            evaluator,
            dispatch,
        }
    }

    /// Run one full turn.
    ///
    /// Never fails: every operation error degrades to that operation's safe
    /// default and is carried in [`TurnReport::failures`].
    pub async fn run_turn(&self, turn: &TurnContext) -> TurnReport {
        debug!(user = %turn.user_id, "turn pipeline starting");
        let mut failures = Vec::new();

        let sighting = match self.dispatch.observe(turn).await {
            Ok(report) => Some(report),
            Err(e) => {
                failures.push(caught("dispatch", "observe", dispatch_kind(&e), &e));
                None
            }
        };

        let capture_gate = match self.evaluator.should_run(&turn.user_id).await {
            Ok(gate) => gate,
            Err(e) => {
                failures.push(caught("evaluator", "should_run", evaluator_kind(&e), &e));
                false
            }
        };

        let capture = if capture_gate {
            match self.evaluator.capture(turn).await {
                Ok(report) => Some(report),
                Err(e) => {
                    failures.push(caught("evaluator", "capture", evaluator_kind(&e), &e));
                    None
                }
            }
        } else {
            None
        };

        let guidance = match self.guidance.render(&turn.user_id).await {
            Ok(text) => text,
            Err(e) => {
                failures.push(caught("guidance", "render", FailureKind::Store, &e));
                FALLBACK_GUIDANCE.to_owned()
            }
        };

        let delivery = match self.dispatch.deliver(&turn.user_id).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                failures.push(caught("dispatch", "deliver", dispatch_kind(&e), &e));
                None
            }
        };

        TurnReport {
            sighting,
            capture_gate,
            capture,
            guidance,
            delivery,
            failures,
        }
    }
}

/// Log a caught operation failure exactly once and convert it to a record.
fn caught(
    component: &'static str,
    operation: &'static str,
    kind: FailureKind,
    err: &dyn std::fmt::Display,
) -> TurnFailure {
    error!(component, operation, error = %err, "turn operation failed");
    TurnFailure {
        component,
        operation,
        kind,
        message: err.to_string(),
    }
}

fn evaluator_kind(error: &EvaluatorError) -> FailureKind {
    match error {
        EvaluatorError::Store(_) => FailureKind::Store,
        EvaluatorError::Oracle(_) => FailureKind::Oracle,
    }
}

fn dispatch_kind(error: &DispatchError) -> FailureKind {
    match error {
        DispatchError::Store(_) => FailureKind::Store,
        DispatchError::Oracle(_) => FailureKind::Oracle,
        DispatchError::History(_) => FailureKind::History,
        DispatchError::Transport(_) => FailureKind::Transport,
    }
}
