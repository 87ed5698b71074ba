// SPDX-License-Identifier: MIT

//! Workflow-level errors
//!
//! Step failures are wrapped with the phase, step and iteration they
//! happened in. The state itself is never moved into an error: the caller
//! owns it and can inspect it after a failed run.

use crate::adk::error::{ConfigError, StepError};
use crate::fable::events::Phase;
use thiserror::Error;

/// Errors that end a workflow run without a story
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A step failed; nothing is retried
    #[error("{phase} failed in step '{step}' (iteration {iteration}): {source}")]
    Step {
        phase: Phase,
        step: String,
        iteration: u32,
        #[source]
        source: StepError,
    },

    /// The collector produced an empty topic
    #[error("topic collection produced an empty topic (iteration {iteration})")]
    EmptyTopic { iteration: u32 },

    /// The topic loop hit its cap without a canonical topic
    #[error("no canonical topic after {iterations} iterations")]
    TopicUnresolved { iterations: u32 },

    /// The user typed `exit` or closed the input
    #[error("cancelled by user")]
    Cancelled,

    /// The user rejected the confirmed topic
    #[error("topic declined by user")]
    Declined,

    /// Reading user input failed
    #[error("failed to read user input: {0}")]
    Input(#[from] std::io::Error),
}

impl WorkflowError {
    /// Wrap a step error with its position in the workflow
    pub fn step(phase: Phase, step: impl Into<String>, iteration: u32, source: StepError) -> Self {
        Self::Step {
            phase,
            step: step.into(),
            iteration,
            source,
        }
    }

    /// Phase the failure happened in, when known
    pub fn phase(&self) -> Option<Phase> {
        match self {
            WorkflowError::Step { phase, .. } => Some(*phase),
            WorkflowError::EmptyTopic { .. } | WorkflowError::TopicUnresolved { .. } => {
                Some(Phase::TopicCollection)
            }
            WorkflowError::Declined => Some(Phase::Confirmation),
            WorkflowError::Cancelled | WorkflowError::Input(_) => None,
        }
    }
}

/// Top-level error type for the binary
#[derive(Debug, Error)]
pub enum FableError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::error::GenerationFailure;

    #[test]
    fn test_step_error_carries_context() {
        let err = WorkflowError::step(
            Phase::Refinement,
            "CriticAgent",
            3,
            StepError::generation("CriticAgent", GenerationFailure::EmptyResponse),
        );
        let msg = err.to_string();
        assert!(msg.starts_with("refinement failed in step 'CriticAgent' (iteration 3)"));
        assert_eq!(err.phase(), Some(Phase::Refinement));
    }

    #[test]
    fn test_topic_errors_belong_to_collection() {
        assert_eq!(
            WorkflowError::EmptyTopic { iteration: 1 }.phase(),
            Some(Phase::TopicCollection)
        );
        assert_eq!(
            WorkflowError::TopicUnresolved { iterations: 5 }.to_string(),
            "no canonical topic after 5 iterations"
        );
    }

    #[test]
    fn test_fable_error_wraps_workflow_error() {
        let err: FableError = WorkflowError::Cancelled.into();
        assert_eq!(err.to_string(), "Workflow error: cancelled by user");
    }
}
