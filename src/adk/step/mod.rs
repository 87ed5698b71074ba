// SPDX-License-Identifier: MIT

//! Step module - the generation step contract
//!
//! A step is one bounded invocation of a backend with a declared input and
//! output contract:
//! - it declares which state fields it may read (`reads`)
//! - it declares the single field its text is merged into (`writes`)
//! - it returns either a delta for that field or an exit signal
//!
//! Implementations:
//! - `LlmStep` - model-backed step with an instruction template

mod llm;
mod template;

#[cfg(test)]
pub(crate) mod testing;

pub use llm::{LlmStep, DEFAULT_STEP_TIMEOUT_SECS};
pub use template::PromptTemplate;

use crate::adk::error::StepError;
use crate::adk::state::{StateDelta, StateField, StateView, WorkflowState};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Why a step asked its enclosing loop to stop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// The critique matched the completion sentinel
    Sentinel,
    /// The model called an offered exit tool
    ExitTool { tool: String },
}

/// Outcome of a single step invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    /// New text for the step's output field
    Continue(StateDelta),
    /// The enclosing loop must terminate now, as a success
    Complete(ExitReason),
}

impl StepResult {
    pub fn is_complete(&self) -> bool {
        matches!(self, StepResult::Complete(_))
    }
}

/// Core step trait for all workflow steps
#[async_trait]
pub trait Step: Send + Sync {
    /// Returns the step name
    fn name(&self) -> &str;

    /// Fields this step may see
    fn reads(&self) -> &[StateField];

    /// Field this step's text is written to
    fn writes(&self) -> StateField;

    /// Run the step against a view of its declared fields
    async fn invoke(&self, view: &StateView) -> Result<StepResult, StepError>;
}

/// Run one step against the shared state and merge its output.
///
/// The caller stays the sole owner of `state`: the step only sees the view
/// built from its declared fields, and only a delta for its declared output
/// field is accepted.
pub async fn execute(step: &dyn Step, state: &mut WorkflowState) -> Result<StepResult, StepError> {
    let view = state.view(step.reads())?;
    let result = step.invoke(&view).await?;

    if let StepResult::Continue(delta) = &result {
        if delta.field != step.writes() {
            return Err(StepError::UndeclaredWrite {
                step: step.name().to_string(),
                field: delta.field,
                declared: step.writes(),
            });
        }
        state.apply(delta.clone())?;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedStep;
    use super::*;
    use crate::adk::error::StateError;

    #[tokio::test]
    async fn test_execute_merges_declared_output() {
        let step = ScriptedStep::texts("drafter", &[StateField::Topic], StateField::Document, &["draft"]);
        let mut state = WorkflowState::new();

        let result = execute(&step, &mut state).await.unwrap();
        assert!(!result.is_complete());
        assert_eq!(state.document(), "draft");
        assert!(state.is_drafted());
    }

    #[tokio::test]
    async fn test_execute_rejects_undeclared_write() {
        let step = ScriptedStep::new(
            "rogue",
            &[],
            StateField::Document,
            vec![Ok(StepResult::Continue(StateDelta::new(StateField::Topic, "hijack")))],
        );
        let mut state = WorkflowState::new();

        let err = execute(&step, &mut state).await.unwrap_err();
        assert!(matches!(err, StepError::UndeclaredWrite { .. }));
        assert_eq!(state.topic(), "");
    }

    #[tokio::test]
    async fn test_execute_complete_leaves_state_untouched() {
        let step = ScriptedStep::new(
            "refiner",
            &[],
            StateField::Document,
            vec![Ok(StepResult::Complete(ExitReason::Sentinel))],
        );
        let mut state = WorkflowState::new();

        let result = execute(&step, &mut state).await.unwrap();
        assert_eq!(result, StepResult::Complete(ExitReason::Sentinel));
        assert_eq!(state.document(), "");
    }

    #[tokio::test]
    async fn test_execute_refuses_view_before_draft() {
        let step = ScriptedStep::texts("critic", &[StateField::Document], StateField::Critique, &["x"]);
        let mut state = WorkflowState::new();

        let err = execute(&step, &mut state).await.unwrap_err();
        assert!(matches!(err, StepError::State(StateError::DocumentNotDrafted)));
        assert_eq!(step.calls(), 0);
    }
}
