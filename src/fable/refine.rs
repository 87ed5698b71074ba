// SPDX-License-Identifier: MIT

//! Bounded refinement loop
//!
//! Runs critique then refine in strict alternation, at most `max_iterations`
//! full cycles. The loop ends early only when the refine step signals
//! completion, which `SentinelGuard` does exactly when the critique equals
//! [`COMPLETION_SENTINEL`] byte for byte. Running out of cycles is a normal
//! outcome that keeps the last document.

use crate::adk::error::{ConfigError, StepError};
use crate::adk::state::{StateField, StateView, WorkflowState};
use crate::adk::step::{ExitReason, Step, StepResult};
use crate::fable::collect::DEFAULT_MAX_ITERATIONS;
use crate::fable::error::WorkflowError;
use crate::fable::events::{EventSink, Phase, WorkflowEvent};
use crate::fable::pipeline::run_step;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Critique text meaning "the document needs no further change"
pub const COMPLETION_SENTINEL: &str = "No major issues found.";

/// Exact, case-sensitive comparison with [`COMPLETION_SENTINEL`]
pub fn is_completion_sentinel(critique: &str) -> bool {
    critique == COMPLETION_SENTINEL
}

/// Wraps the refine step and owns the exit decision.
///
/// On the sentinel it completes without invoking the inner step, so the
/// document is left untouched. On any other critique the inner step must
/// produce text; an exit from it is a contract violation.
pub struct SentinelGuard {
    inner: Arc<dyn Step>,
}

impl SentinelGuard {
    pub fn new(inner: Arc<dyn Step>) -> Result<Self, ConfigError> {
        if !inner.reads().contains(&StateField::Critique) {
            return Err(ConfigError::invalid(
                format!("steps.refiner ({})", inner.name()),
                "the refine step must read `critique`",
            ));
        }
        if inner.writes() != StateField::Document {
            return Err(ConfigError::invalid(
                format!("steps.refiner ({})", inner.name()),
                format!("the refine step must write `document`, not `{}`", inner.writes()),
            ));
        }
        Ok(Self { inner })
    }
}

#[async_trait]
impl Step for SentinelGuard {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn reads(&self) -> &[StateField] {
        self.inner.reads()
    }

    fn writes(&self) -> StateField {
        self.inner.writes()
    }

    async fn invoke(&self, view: &StateView) -> Result<StepResult, StepError> {
        let critique = view.get(StateField::Critique).unwrap_or_default();
        if is_completion_sentinel(critique) {
            log::info!("Step {} sees the completion sentinel, exiting loop", self.name());
            return Ok(StepResult::Complete(ExitReason::Sentinel));
        }

        if critique.trim().is_empty() {
            log::warn!(
                "Step {} received an empty critique; applying it as feedback",
                self.name()
            );
        }

        match self.inner.invoke(view).await? {
            StepResult::Complete(reason) => {
                log::error!(
                    "Step {} exited ({:?}) on a critique that is not the sentinel",
                    self.name(),
                    reason
                );
                Err(StepError::unexpected_exit(self.name()))
            }
            result => Ok(result),
        }
    }
}

/// How the refinement loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopExit {
    /// The critic approved the document
    Completed,
    /// The cap was reached without approval
    Exhausted,
}

impl fmt::Display for LoopExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopExit::Completed => f.write_str("completed"),
            LoopExit::Exhausted => f.write_str("exhausted"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopOutcome {
    pub exit: LoopExit,
    /// Full (critique, refine) cycles executed
    pub cycles: u32,
}

/// Critique/refine loop with an iteration cap
pub struct RefinementLoop {
    critic: Arc<dyn Step>,
    refiner: SentinelGuard,
    max_iterations: u32,
}

impl RefinementLoop {
    pub fn new(critic: Arc<dyn Step>, refiner: SentinelGuard) -> Result<Self, ConfigError> {
        if critic.writes() != StateField::Critique {
            return Err(ConfigError::invalid(
                format!("steps.critic ({})", critic.name()),
                format!("the critique step must write `critique`, not `{}`", critic.writes()),
            ));
        }
        Ok(Self {
            critic,
            refiner,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        })
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Run until the refiner completes or the cap is reached
    pub async fn run(
        &self,
        state: &mut WorkflowState,
        events: &EventSink,
    ) -> Result<LoopOutcome, WorkflowError> {
        for iteration in 1..=self.max_iterations {
            let critique = run_step(
                self.critic.as_ref(),
                state,
                Phase::Refinement,
                iteration,
                events,
            )
            .await?;
            if critique.is_complete() {
                return Err(WorkflowError::step(
                    Phase::Refinement,
                    self.critic.name(),
                    iteration,
                    StepError::unexpected_exit(self.critic.name()),
                ));
            }

            let refined = run_step(&self.refiner, state, Phase::Refinement, iteration, events).await;
            state.consume_critique();

            if refined?.is_complete() {
                log::info!("Refinement completed after {} cycles", iteration);
                return Ok(self.finish(LoopExit::Completed, iteration, events).await);
            }
        }

        log::info!(
            "Refinement reached its cap of {} cycles without approval",
            self.max_iterations
        );
        Ok(self
            .finish(LoopExit::Exhausted, self.max_iterations, events)
            .await)
    }

    async fn finish(&self, exit: LoopExit, cycles: u32, events: &EventSink) -> LoopOutcome {
        events.emit(WorkflowEvent::LoopFinished { exit, cycles }).await;
        LoopOutcome { exit, cycles }
    }
}
