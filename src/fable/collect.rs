// SPDX-License-Identifier: MIT

//! Interactive topic collection
//!
//! A single state machine drives the collect step and the blocking reads:
//!
//! ```text
//! Collecting(n) --marker--> Settled(n)
//!      |
//!      +--incomplete--> AwaitingUserInput(n) --reply--> Collecting(n+1)
//! ```
//!
//! The orchestrator, not the step, decides when to block for input. A
//! `Complete` from the collect step (an exit tool call) means "classify the
//! topic as it stands".

use crate::adk::error::ConfigError;
use crate::adk::state::{StateField, WorkflowState};
use crate::adk::step::Step;
use crate::fable::error::WorkflowError;
use crate::fable::events::{EventSink, Phase, WorkflowEvent};
use crate::fable::input::{is_exit_command, UserInput};
use crate::fable::pipeline::run_step;
use crate::fable::topic::{CanonicalTopic, TopicStatus};
use std::sync::Arc;

/// Default cap for both loops
pub const DEFAULT_MAX_ITERATIONS: u32 = 5;

/// Prompt shown after the provisional restatement
pub const USER_PROMPT: &str = "[user]: ";

/// Position of the collection state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionState {
    Collecting {
        cycle: u32,
    },
    AwaitingUserInput {
        cycle: u32,
        provisional: String,
    },
    Settled {
        cycle: u32,
        topic: CanonicalTopic,
    },
}

/// Result of a finished collection phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSettled {
    pub topic: CanonicalTopic,
    /// Collect invocations performed
    pub cycles: u32,
    /// Blocking reads performed
    pub reads: u32,
}

pub struct TopicCollector {
    step: Arc<dyn Step>,
    max_iterations: u32,
}

impl TopicCollector {
    pub fn new(step: Arc<dyn Step>) -> Result<Self, ConfigError> {
        if step.writes() != StateField::Topic {
            return Err(ConfigError::invalid(
                format!("steps.collector ({})", step.name()),
                format!("the collect step must write `topic`, not `{}`", step.writes()),
            ));
        }
        Ok(Self {
            step,
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

    /// Run collection until the canonical marker appears
    pub async fn run(
        &self,
        state: &mut WorkflowState,
        input: &mut dyn UserInput,
        events: &EventSink,
    ) -> Result<TopicSettled, WorkflowError> {
        if self.max_iterations == 0 {
            return Err(WorkflowError::TopicUnresolved { iterations: 0 });
        }

        let mut reads = 0;
        let mut machine = CollectionState::Collecting { cycle: 1 };

        loop {
            machine = match machine {
                CollectionState::Collecting { cycle } => {
                    self.collect(state, cycle, events).await?
                }
                CollectionState::AwaitingUserInput { cycle, provisional } => {
                    events
                        .emit(WorkflowEvent::AwaitingInput {
                            iteration: cycle,
                            provisional: provisional.clone(),
                        })
                        .await;

                    let prompt = format!("{}\n{}", provisional, USER_PROMPT);
                    let reply = input.read_line(&prompt).await?;
                    reads += 1;

                    match reply {
                        Some(line) if !is_exit_command(&line) => {
                            state.append_user_input(&line);
                            CollectionState::Collecting { cycle: cycle + 1 }
                        }
                        _ => {
                            log::info!("Topic collection cancelled by user (iteration {})", cycle);
                            return Err(WorkflowError::Cancelled);
                        }
                    }
                }
                CollectionState::Settled { cycle, topic } => {
                    log::info!("Topic settled after {} cycles: {}", cycle, topic);
                    events
                        .emit(WorkflowEvent::TopicSettled {
                            topic: topic.to_string(),
                            cycles: cycle,
                        })
                        .await;
                    return Ok(TopicSettled {
                        topic,
                        cycles: cycle,
                        reads,
                    });
                }
            };
        }
    }

    /// One collect invocation followed by classification
    async fn collect(
        &self,
        state: &mut WorkflowState,
        cycle: u32,
        events: &EventSink,
    ) -> Result<CollectionState, WorkflowError> {
        run_step(self.step.as_ref(), state, Phase::TopicCollection, cycle, events).await?;

        match TopicStatus::parse(state.topic()) {
            TopicStatus::Complete(topic) => {
                state.lock_topic();
                Ok(CollectionState::Settled { cycle, topic })
            }
            TopicStatus::Empty => {
                log::error!("Step {} produced an empty topic (iteration {})", self.step.name(), cycle);
                Err(WorkflowError::EmptyTopic { iteration: cycle })
            }
            TopicStatus::Incomplete(_) if cycle >= self.max_iterations => {
                log::error!("No canonical topic after {} iterations", cycle);
                Err(WorkflowError::TopicUnresolved { iterations: cycle })
            }
            TopicStatus::Incomplete(provisional) => {
                Ok(CollectionState::AwaitingUserInput { cycle, provisional })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::step::testing::ScriptedStep;
    use crate::adk::step::{ExitReason, StepResult};
    use crate::fable::input::ScriptedInput;

    const COLLECTOR_READS: &[StateField] = &[StateField::RawInput, StateField::Topic];
    const CANONICAL: &str = "STORY: [topic: a robot who learns to paint, theme: comedy]";

    fn collector(outputs: &[&str], max: u32) -> (TopicCollector, Arc<ScriptedStep>) {
        let step = Arc::new(ScriptedStep::texts(
            "TopicCollector",
            COLLECTOR_READS,
            StateField::Topic,
            outputs,
        ));
        let collector = TopicCollector::new(step.clone())
            .unwrap()
            .with_max_iterations(max);
        (collector, step)
    }

    #[tokio::test]
    async fn test_settles_on_nth_cycle_with_n_minus_one_reads() {
        let (collector, step) = collector(
            &["Original input: a robot", "Original input: a robot, comedy", CANONICAL],
            5,
        );
        let mut state = WorkflowState::with_raw_input("a robot");
        let mut input = ScriptedInput::new(["who learns to paint", "comedy"]);

        let settled = collector
            .run(&mut state, &mut input, &EventSink::disabled())
            .await
            .unwrap();

        assert_eq!(settled.cycles, 3);
        assert_eq!(settled.reads, 2);
        assert_eq!(settled.topic.theme(), Some("comedy"));
        assert_eq!(step.calls(), 3);
        assert_eq!(input.reads(), 2);
        assert_eq!(
            state.raw_input(),
            "a robot\n and: who learns to paint\n and: comedy"
        );
        assert!(state.is_topic_locked());
    }

    #[tokio::test]
    async fn test_immediate_marker_needs_no_input() {
        let (collector, _) = collector(&[CANONICAL], 5);
        let mut state = WorkflowState::with_raw_input("a robot who learns to paint, comedy");
        let mut input = ScriptedInput::default();

        let settled = collector
            .run(&mut state, &mut input, &EventSink::disabled())
            .await
            .unwrap();

        assert_eq!(settled.cycles, 1);
        assert_eq!(settled.reads, 0);
        assert_eq!(state.topic(), CANONICAL);
    }

    #[tokio::test]
    async fn test_prompt_shows_provisional_restatement() {
        let (collector, _) = collector(&["Original input: a robot", CANONICAL], 5);
        let mut state = WorkflowState::with_raw_input("a robot");
        let mut input = ScriptedInput::new(["comedy"]);

        collector
            .run(&mut state, &mut input, &EventSink::disabled())
            .await
            .unwrap();

        assert_eq!(input.prompts(), ["Original input: a robot\n[user]: "]);
    }

    #[tokio::test]
    async fn test_empty_topic_aborts() {
        let (collector, step) = collector(&[""], 5);
        let mut state = WorkflowState::new();
        let mut input = ScriptedInput::new(["unused"]);

        let err = collector
            .run(&mut state, &mut input, &EventSink::disabled())
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::EmptyTopic { iteration: 1 }));
        assert_eq!(step.calls(), 1);
        assert_eq!(input.reads(), 0);
    }

    #[tokio::test]
    async fn test_empty_topic_on_later_cycle_aborts() {
        let (collector, _) = collector(&["Original input: a robot", "   "], 5);
        let mut state = WorkflowState::with_raw_input("a robot");
        let mut input = ScriptedInput::new(["comedy", "unused"]);

        let err = collector
            .run(&mut state, &mut input, &EventSink::disabled())
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::EmptyTopic { iteration: 2 }));
        assert_eq!(input.reads(), 1);
    }

    #[tokio::test]
    async fn test_cap_without_marker_is_unresolved() {
        let (collector, step) = collector(&["Still vague"], 3);
        let mut state = WorkflowState::with_raw_input("something");
        let mut input = ScriptedInput::new(["more", "more", "more", "more"]);

        let err = collector
            .run(&mut state, &mut input, &EventSink::disabled())
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::TopicUnresolved { iterations: 3 }));
        assert_eq!(step.calls(), 3);
        // No read after the final cycle
        assert_eq!(input.reads(), 2);
        assert!(!state.is_topic_locked());
    }

    #[tokio::test]
    async fn test_exit_reply_cancels() {
        let (collector, step) = collector(&["Original input: a robot"], 5);
        let mut state = WorkflowState::with_raw_input("a robot");
        let mut input = ScriptedInput::new(["Exit"]);

        let err = collector
            .run(&mut state, &mut input, &EventSink::disabled())
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::Cancelled));
        assert_eq!(step.calls(), 1);
        assert_eq!(state.raw_input(), "a robot");
    }

    #[tokio::test]
    async fn test_closed_input_cancels() {
        let (collector, _) = collector(&["Original input: a robot"], 5);
        let mut state = WorkflowState::with_raw_input("a robot");
        let mut input = ScriptedInput::default();

        let err = collector
            .run(&mut state, &mut input, &EventSink::disabled())
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::Cancelled));
    }

    #[tokio::test]
    async fn test_exit_call_classifies_current_topic() {
        let step = Arc::new(ScriptedStep::new(
            "TopicCollector",
            COLLECTOR_READS,
            StateField::Topic,
            vec![Ok(StepResult::Complete(ExitReason::ExitTool {
                tool: "exit_sequence".to_string(),
            }))],
        ));
        let collector = TopicCollector::new(step).unwrap();
        let mut state = WorkflowState::new();
        let mut input = ScriptedInput::default();

        let err = collector
            .run(&mut state, &mut input, &EventSink::disabled())
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::EmptyTopic { iteration: 1 }));
    }

    #[tokio::test]
    async fn test_collector_sees_accumulated_input() {
        let (collector, step) = collector(&["Original input: a robot", CANONICAL], 5);
        let mut state = WorkflowState::with_raw_input("a robot");
        let mut input = ScriptedInput::new(["comedy"]);

        collector
            .run(&mut state, &mut input, &EventSink::disabled())
            .await
            .unwrap();

        let views = step.views();
        assert_eq!(views[0].get(StateField::RawInput), Some("a robot"));
        assert_eq!(
            views[1].get(StateField::RawInput),
            Some("a robot\n and: comedy")
        );
        assert_eq!(
            views[1].get(StateField::Topic),
            Some("Original input: a robot")
        );
    }

    #[test]
    fn test_collector_must_write_topic() {
        let step = Arc::new(ScriptedStep::texts(
            "TopicCollector",
            COLLECTOR_READS,
            StateField::Document,
            &["x"],
        ));
        assert!(TopicCollector::new(step).is_err());
    }
}
