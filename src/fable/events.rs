// SPDX-License-Identifier: MIT

//! Progress events emitted while a workflow runs

use crate::fable::refine::LoopExit;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

/// Phases of the story workflow, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    TopicCollection,
    Confirmation,
    Drafting,
    Refinement,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::TopicCollection => "topic collection",
            Phase::Confirmation => "confirmation",
            Phase::Drafting => "drafting",
            Phase::Refinement => "refinement",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkflowEvent {
    PhaseStarted {
        phase: Phase,
    },
    StepStarted {
        step: String,
        iteration: u32,
    },
    StepFinished {
        step: String,
        iteration: u32,
        exited: bool,
    },
    AwaitingInput {
        iteration: u32,
        provisional: String,
    },
    TopicSettled {
        topic: String,
        cycles: u32,
    },
    LoopFinished {
        exit: LoopExit,
        cycles: u32,
    },
    WorkflowFinished {
        success: bool,
    },
}

impl fmt::Display for WorkflowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowEvent::PhaseStarted { phase } => write!(f, "==> {}", phase),
            WorkflowEvent::StepStarted { step, iteration } => {
                write!(f, "  -> {} (iteration {})", step, iteration)
            }
            WorkflowEvent::StepFinished {
                step,
                exited: true,
                ..
            } => write!(f, "  <- {} signalled exit", step),
            WorkflowEvent::StepFinished { step, .. } => write!(f, "  <- {} done", step),
            WorkflowEvent::AwaitingInput { iteration, .. } => {
                write!(f, "  .. waiting for more details (iteration {})", iteration)
            }
            WorkflowEvent::TopicSettled { topic, cycles } => {
                write!(f, "  == {} (after {} cycles)", topic, cycles)
            }
            WorkflowEvent::LoopFinished { exit, cycles } => {
                write!(f, "  == refinement {} after {} cycles", exit, cycles)
            }
            WorkflowEvent::WorkflowFinished { success: true } => f.write_str("==> finished"),
            WorkflowEvent::WorkflowFinished { success: false } => f.write_str("==> failed"),
        }
    }
}

/// Optional event channel; a closed or missing receiver is ignored
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::Sender<WorkflowEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<WorkflowEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that drops every event
    pub fn disabled() -> Self {
        Self::default()
    }

    pub async fn emit(&self, event: WorkflowEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event).await;
        }
    }
}
