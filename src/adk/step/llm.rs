// SPDX-License-Identifier: MIT

//! LLM Step - a generation step backed by a model
//!
//! The step renders its instruction from the visible state, sends a
//! two-message conversation to the model and turns the reply into either a
//! state delta (text) or an exit signal (a call to the offered exit tool).

use super::template::PromptTemplate;
use super::{ExitReason, Step, StepResult};
use crate::adk::error::{ConfigError, GenerationFailure, StepError};
use crate::adk::model::{Content, GenerationConfig, Model, Part};
use crate::adk::state::{StateDelta, StateField, StateView};
use crate::adk::tool::{ExitTool, Tool};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 120;

/// User turn sent when the step does not see `raw_input`
const PROCEED_MESSAGE: &str = "Proceed.";

/// Model-backed generation step
pub struct LlmStep {
    name: String,
    description: String,
    instruction: PromptTemplate,
    model: Arc<dyn Model>,
    reads: Vec<StateField>,
    writes: StateField,
    exit_tool: Option<ExitTool>,
    tools: Vec<Arc<dyn Tool>>,
    config: Option<GenerationConfig>,
    timeout: Duration,
    blank_replies: bool,
}

impl LlmStep {
    /// Create a step; every placeholder in `instruction` must be declared in `reads`
    pub fn new(
        name: impl Into<String>,
        instruction: &str,
        model: Arc<dyn Model>,
        reads: Vec<StateField>,
        writes: StateField,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let instruction = PromptTemplate::parse(instruction);
        if let Some(field) = instruction.undeclared(&reads) {
            return Err(ConfigError::UndeclaredPlaceholder { step: name, field });
        }

        Ok(Self {
            name,
            description: String::new(),
            instruction,
            model,
            reads,
            writes,
            exit_tool: None,
            tools: Vec::new(),
            config: None,
            timeout: Duration::from_secs(DEFAULT_STEP_TIMEOUT_SECS),
            blank_replies: false,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Offer an exit tool to the model
    pub fn with_exit_tool(mut self, tool: ExitTool) -> Self {
        self.exit_tool = Some(tool);
        self.tools = vec![Arc::new(tool)];
        self
    }

    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pass blank replies through as a delta instead of failing
    ///
    /// For steps whose output is classified afterwards, where an empty value
    /// has its own meaning.
    pub fn with_blank_replies(mut self) -> Self {
        self.blank_replies = true;
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn exit_tool(&self) -> Option<ExitTool> {
        self.exit_tool
    }

    /// Build the conversation sent to the model
    fn build_history(&self, view: &StateView) -> Vec<Content> {
        let message = match view.get(StateField::RawInput) {
            Some(raw) if !raw.trim().is_empty() => raw.to_string(),
            _ => PROCEED_MESSAGE.to_string(),
        };
        vec![
            Content::system(self.instruction.render(view)),
            Content::user(message),
        ]
    }

    /// Turn a model reply into a step result
    async fn interpret(&self, response: Content) -> Result<StepResult, StepError> {
        let text = response.text_content();

        for part in &response.parts {
            if let Part::FunctionCall { name, args } = part {
                let offered = self.exit_tool.filter(|t| t.name() == name.as_str());
                let Some(tool) = offered else {
                    log::error!("Step {} received call to unknown function {}", self.name, name);
                    return Err(StepError::generation(
                        &self.name,
                        GenerationFailure::UnknownFunction(name.clone()),
                    ));
                };

                if !text.is_empty() {
                    log::warn!(
                        "Step {} discarded {} bytes of text returned next to {}",
                        self.name,
                        text.len(),
                        name
                    );
                }
                if let Err(e) = tool.execute(args.clone()).await {
                    log::warn!("Tool {} failed: {}", name, e);
                }
                return Ok(StepResult::Complete(ExitReason::ExitTool {
                    tool: name.clone(),
                }));
            }
        }

        if text.trim().is_empty() && !self.blank_replies {
            log::error!("Step {} received empty response", self.name);
            return Err(StepError::generation(
                &self.name,
                GenerationFailure::EmptyResponse,
            ));
        }

        log::info!(
            "Step {} returning text (length: {}, preview: '{}')",
            self.name,
            text.len(),
            preview(&text)
        );
        Ok(StepResult::Continue(StateDelta::new(self.writes, text)))
    }
}

/// First 100 characters, cut on a char boundary
fn preview(text: &str) -> &str {
    match text.char_indices().nth(100) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl Step for LlmStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn reads(&self) -> &[StateField] {
        &self.reads
    }

    fn writes(&self) -> StateField {
        self.writes
    }

    async fn invoke(&self, view: &StateView) -> Result<StepResult, StepError> {
        let history = self.build_history(view);
        log::info!("Step {} calling model ({} tools offered)", self.name, self.tools.len());

        let call = self
            .model
            .generate_content(&history, self.config.as_ref(), Some(self.tools.as_slice()));
        let response = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                log::error!("Step {} model call failed: {}", self.name, e);
                return Err(StepError::generation(&self.name, e));
            }
            Err(_) => {
                log::error!("Step {} timed out after {:?}", self.name, self.timeout);
                return Err(StepError::generation(
                    &self.name,
                    GenerationFailure::Timeout(self.timeout.as_secs()),
                ));
            }
        };

        log::info!(
            "Step {} received response with {} parts",
            self.name,
            response.parts.len()
        );
        self.interpret(response).await
    }
}
