// SPDX-License-Identifier: MIT

//! Sequential story pipeline
//!
//! Fixed order, no branching: topic collection, an optional confirmation
//! gate, one drafting step, then the refinement loop. The caller owns the
//! `WorkflowState`; the pipeline only borrows it, so whatever was produced
//! before a failure stays inspectable.

use crate::adk::error::{ConfigError, StepError};
use crate::adk::state::{StateField, WorkflowState};
use crate::adk::step::{execute, Step, StepResult};
use crate::fable::collect::TopicCollector;
use crate::fable::error::WorkflowError;
use crate::fable::events::{EventSink, Phase, WorkflowEvent};
use crate::fable::input::{is_exit_command, UserInput};
use crate::fable::refine::{LoopOutcome, RefinementLoop};
use crate::fable::topic::CanonicalTopic;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Run one step, merge its output and report it.
///
/// Every step failure leaves here wrapped with its phase, step name and
/// iteration.
pub(crate) async fn run_step(
    step: &dyn Step,
    state: &mut WorkflowState,
    phase: Phase,
    iteration: u32,
    events: &EventSink,
) -> Result<StepResult, WorkflowError> {
    events
        .emit(WorkflowEvent::StepStarted {
            step: step.name().to_string(),
            iteration,
        })
        .await;
    log::info!("[{}] running {} (iteration {})", phase, step.name(), iteration);

    let result = execute(step, state).await.map_err(|e| {
        log::error!("[{}] {} failed (iteration {}): {}", phase, step.name(), iteration, e);
        WorkflowError::step(phase, step.name(), iteration, e)
    })?;

    events
        .emit(WorkflowEvent::StepFinished {
            step: step.name().to_string(),
            iteration,
            exited: result.is_complete(),
        })
        .await;
    Ok(result)
}

/// What a successful run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryOutcome {
    pub topic: CanonicalTopic,
    pub document: String,
    pub refinement: LoopOutcome,
    /// Collect invocations needed to settle the topic
    pub topic_cycles: u32,
}

/// Collection, drafting and refinement wired in their fixed order
pub struct StoryPipeline {
    name: String,
    collector: TopicCollector,
    drafter: Arc<dyn Step>,
    refinement: RefinementLoop,
    confirm_topic: bool,
    events: EventSink,
}

impl StoryPipeline {
    pub fn new(
        name: impl Into<String>,
        collector: TopicCollector,
        drafter: Arc<dyn Step>,
        refinement: RefinementLoop,
    ) -> Result<Self, ConfigError> {
        if drafter.writes() != StateField::Document {
            return Err(ConfigError::invalid(
                format!("steps.drafter ({})", drafter.name()),
                format!("the drafting step must write `document`, not `{}`", drafter.writes()),
            ));
        }
        if drafter.reads().contains(&StateField::Document) {
            return Err(ConfigError::invalid(
                format!("steps.drafter ({})", drafter.name()),
                "the drafting step cannot read `document` before it exists",
            ));
        }
        Ok(Self {
            name: name.into(),
            collector,
            drafter,
            refinement,
            confirm_topic: false,
            events: EventSink::disabled(),
        })
    }

    /// Ask the user to confirm the settled topic before drafting
    pub fn with_confirmation(mut self, confirm_topic: bool) -> Self {
        self.confirm_topic = confirm_topic;
        self
    }

    /// Stream progress events to `tx`
    pub fn with_events(mut self, tx: mpsc::Sender<WorkflowEvent>) -> Self {
        self.events = EventSink::new(tx);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the whole workflow with a fresh run id
    pub async fn run(
        &self,
        state: &mut WorkflowState,
        input: &mut dyn UserInput,
    ) -> Result<StoryOutcome, WorkflowError> {
        self.run_with_id(Uuid::new_v4(), state, input).await
    }

    /// Run the whole workflow, tagging log lines with `run_id`
    pub async fn run_with_id(
        &self,
        run_id: Uuid,
        state: &mut WorkflowState,
        input: &mut dyn UserInput,
    ) -> Result<StoryOutcome, WorkflowError> {
        log::info!("[{}] starting workflow '{}'", run_id, self.name);

        let result = self.run_phases(state, input).await;
        match &result {
            Ok(outcome) => log::info!(
                "[{}] workflow '{}' finished: refinement {} after {} cycles",
                run_id,
                self.name,
                outcome.refinement.exit,
                outcome.refinement.cycles
            ),
            Err(e) => log::error!(
                "[{}] workflow '{}' failed: {} (state: {})",
                run_id,
                self.name,
                e,
                state.to_json()
            ),
        }

        self.events
            .emit(WorkflowEvent::WorkflowFinished {
                success: result.is_ok(),
            })
            .await;
        result
    }

    async fn run_phases(
        &self,
        state: &mut WorkflowState,
        input: &mut dyn UserInput,
    ) -> Result<StoryOutcome, WorkflowError> {
        self.start(Phase::TopicCollection).await;
        let settled = self.collector.run(state, input, &self.events).await?;

        if self.confirm_topic {
            self.start(Phase::Confirmation).await;
            confirm(&settled.topic, input).await?;
        }

        self.start(Phase::Drafting).await;
        let drafted = run_step(self.drafter.as_ref(), state, Phase::Drafting, 1, &self.events).await?;
        if drafted.is_complete() {
            return Err(WorkflowError::step(
                Phase::Drafting,
                self.drafter.name(),
                1,
                StepError::unexpected_exit(self.drafter.name()),
            ));
        }

        self.start(Phase::Refinement).await;
        let refinement = self.refinement.run(state, &self.events).await?;

        Ok(StoryOutcome {
            topic: settled.topic,
            document: state.document().to_string(),
            refinement,
            topic_cycles: settled.cycles,
        })
    }

    async fn start(&self, phase: Phase) {
        log::info!("Entering {} phase", phase);
        self.events.emit(WorkflowEvent::PhaseStarted { phase }).await;
    }
}

/// Show the parsed topic and wait for a yes/no answer
async fn confirm(topic: &CanonicalTopic, input: &mut dyn UserInput) -> Result<(), WorkflowError> {
    let prompt = format!(
        "Topic: {}\nTheme: {}\nWrite this story? [Y/n] ",
        topic.topic().unwrap_or(topic.as_str()),
        topic.theme().unwrap_or("unspecified")
    );

    match input.read_line(&prompt).await? {
        None => Err(WorkflowError::Cancelled),
        Some(answer) if is_exit_command(&answer) => Err(WorkflowError::Cancelled),
        Some(answer) => match answer.trim().to_lowercase().as_str() {
            "" | "y" | "yes" => Ok(()),
            _ => {
                log::info!("User declined topic '{}'", topic);
                Err(WorkflowError::Declined)
            }
        },
    }
}
