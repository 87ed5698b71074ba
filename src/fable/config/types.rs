// SPDX-License-Identifier: MIT

//! YAML schema types for story workflow definitions
//!
//! This module contains the data structures parsed from a workflow file.
//! Field names are the state keys (`raw_input`, `topic`, `document`,
//! `critique`, `title`).

use crate::adk::model::GenerationConfig;
use crate::adk::state::StateField;
use crate::fable::collect::DEFAULT_MAX_ITERATIONS;
use serde::{Deserialize, Serialize};

/// Top-level workflow definition
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WorkflowDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub model: ModelDefinition,
    /// Per-step backend timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Ask the user to confirm the settled topic before drafting
    #[serde(default)]
    pub confirm_topic: bool,
    pub steps: StepsDefinition,
    #[serde(default)]
    pub topic_loop: LoopDefinition,
    #[serde(default)]
    pub refinement_loop: LoopDefinition,
}

/// Model configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ModelDefinition {
    /// Provider is optional - can be inferred from model_name or MODEL_PROVIDER env var
    pub provider: Option<String>,
    pub model_name: Option<String>,
    pub base_url: Option<String>,
    pub parameters: Option<GenerationParameters>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct GenerationParameters {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
}

impl From<&GenerationParameters> for GenerationConfig {
    fn from(params: &GenerationParameters) -> Self {
        GenerationConfig {
            temperature: params.temperature,
            max_output_tokens: params.max_output_tokens,
            top_p: params.top_p,
        }
    }
}

/// The four steps of the story workflow
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StepsDefinition {
    pub collector: StepDefinition,
    pub drafter: StepDefinition,
    pub critic: StepDefinition,
    pub refiner: StepDefinition,
}

impl StepsDefinition {
    /// Steps with their configuration keys, in execution order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &StepDefinition)> {
        [
            ("collector", &self.collector),
            ("drafter", &self.drafter),
            ("critic", &self.critic),
            ("refiner", &self.refiner),
        ]
        .into_iter()
    }
}

/// A single generation step
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StepDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub instruction: String,
    /// Fields the step may see; placeholders must be listed here
    #[serde(default)]
    pub reads: Vec<StateField>,
    /// Field the step's text is written to
    pub output: StateField,
    /// `exit_loop` or `exit_sequence`
    pub exit_tool: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LoopDefinition {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

impl Default for LoopDefinition {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}
