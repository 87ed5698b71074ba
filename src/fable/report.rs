// SPDX-License-Identifier: MIT

//! Machine-readable summary of one workflow run

use crate::adk::state::WorkflowState;
use crate::fable::error::WorkflowError;
use crate::fable::events::Phase;
use crate::fable::pipeline::StoryOutcome;
use crate::fable::refine::LoopOutcome;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub workflow: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refinement: Option<LoopOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_phase: Option<Phase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Final state snapshot, also kept on failure
    pub state: serde_json::Value,
}

impl RunReport {
    /// Summarize a finished run; the finish time is taken now
    pub fn new(
        run_id: Uuid,
        workflow: impl Into<String>,
        started_at: DateTime<Utc>,
        state: &WorkflowState,
        result: &Result<StoryOutcome, WorkflowError>,
    ) -> Self {
        let mut report = Self {
            run_id,
            workflow: workflow.into(),
            started_at,
            finished_at: Utc::now(),
            status: RunStatus::Succeeded,
            topic: None,
            theme: None,
            refinement: None,
            failed_phase: None,
            error: None,
            state: state.to_json(),
        };

        match result {
            Ok(outcome) => {
                report.topic = outcome.topic.topic().map(str::to_string);
                report.theme = outcome.topic.theme().map(str::to_string);
                report.refinement = Some(outcome.refinement);
            }
            Err(e) => {
                report.status = match e {
                    WorkflowError::Cancelled | WorkflowError::Declined => RunStatus::Cancelled,
                    _ => RunStatus::Failed,
                };
                report.failed_phase = e.phase();
                report.error = Some(e.to_string());
            }
        }
        report
    }

    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::state::{StateDelta, StateField};
    use crate::fable::refine::LoopExit;
    use crate::fable::topic::CanonicalTopic;

    #[test]
    fn test_success_report() {
        let mut state = WorkflowState::with_raw_input("a robot");
        state
            .apply(StateDelta::new(StateField::Document, "The robot painted."))
            .unwrap();
        let outcome = StoryOutcome {
            topic: CanonicalTopic::format("a robot who learns to paint", "comedy"),
            document: "The robot painted.".to_string(),
            refinement: LoopOutcome {
                exit: LoopExit::Exhausted,
                cycles: 5,
            },
            topic_cycles: 2,
        };

        let report = RunReport::new(Uuid::new_v4(), "StoryWriter", Utc::now(), &state, &Ok(outcome));
        assert!(report.succeeded());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "succeeded");
        assert_eq!(json["theme"], "comedy");
        assert_eq!(json["refinement"]["exit"], "exhausted");
        assert_eq!(json["state"]["document"], "The robot painted.");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_failure_report_keeps_state() {
        let state = WorkflowState::with_raw_input("a robot");
        let result = Err(WorkflowError::EmptyTopic { iteration: 1 });

        let report = RunReport::new(Uuid::new_v4(), "StoryWriter", Utc::now(), &state, &result);

        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.failed_phase, Some(Phase::TopicCollection));
        assert_eq!(report.state["raw_input"], "a robot");
        assert!(report.error.unwrap().contains("empty topic"));
    }

    #[test]
    fn test_cancellation_is_not_a_failure_status() {
        let state = WorkflowState::new();
        let report = RunReport::new(
            Uuid::new_v4(),
            "StoryWriter",
            Utc::now(),
            &state,
            &Err(WorkflowError::Cancelled),
        );
        assert_eq!(report.status, RunStatus::Cancelled);
        assert!(!report.succeeded());
    }
}
