// SPDX-License-Identifier: MIT

//! Workflow loader - YAML file loading, parsing and validation
//!
//! Validation needs no backend, so `fable check` can run it on its own.

use super::types::{StepDefinition, WorkflowDefinition};
use crate::adk::error::ConfigError;
use crate::adk::model::Provider;
use crate::adk::state::StateField;
use crate::adk::step::PromptTemplate;
use crate::adk::tool::ExitTool;
use std::fs;
use std::path::Path;

/// The built-in story workflow
pub const DEFAULT_WORKFLOW_YAML: &str = include_str!("../../../workflows/story_writer.yaml");

/// Loads workflow definitions from YAML files
pub struct WorkflowLoader;

impl WorkflowLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load and validate a workflow definition from a YAML file
    pub fn load_workflow<P: AsRef<Path>>(&self, path: P) -> Result<WorkflowDefinition, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        let def = Self::parse_yaml(&content)?;
        log::info!("Loaded workflow '{}' from {}", def.name, path.display());
        Ok(def)
    }

    /// The embedded default workflow
    pub fn default_workflow(&self) -> Result<WorkflowDefinition, ConfigError> {
        Self::parse_yaml(DEFAULT_WORKFLOW_YAML)
    }

    /// Parse and validate a workflow definition from a YAML string
    pub fn parse_yaml(content: &str) -> Result<WorkflowDefinition, ConfigError> {
        let def: WorkflowDefinition = serde_yaml::from_str(content)?;
        Self::validate(&def)?;
        Ok(def)
    }

    /// Check everything that can be checked without a backend
    pub fn validate(def: &WorkflowDefinition) -> Result<(), ConfigError> {
        if def.name.trim().is_empty() {
            return Err(ConfigError::invalid("name", "must not be empty"));
        }
        if let Some(provider) = &def.model.provider {
            provider.parse::<Provider>()?;
        }
        if def.timeout_secs == Some(0) {
            return Err(ConfigError::invalid("timeout_secs", "must be at least 1"));
        }
        for (key, lp) in [
            ("topic_loop", &def.topic_loop),
            ("refinement_loop", &def.refinement_loop),
        ] {
            if lp.max_iterations == 0 {
                return Err(ConfigError::invalid(
                    format!("{}.max_iterations", key),
                    "must be at least 1",
                ));
            }
        }

        for (key, step) in def.steps.iter() {
            validate_step(key, step)?;
        }

        let steps = &def.steps;
        expect_output("collector", &steps.collector, StateField::Topic)?;
        expect_output("drafter", &steps.drafter, StateField::Document)?;
        expect_output("critic", &steps.critic, StateField::Critique)?;
        expect_output("refiner", &steps.refiner, StateField::Document)?;

        // Fields a step would see before they are written or refreshed
        for (key, step, field) in [
            ("collector", &steps.collector, StateField::Document),
            ("collector", &steps.collector, StateField::Critique),
            ("drafter", &steps.drafter, StateField::Document),
            ("drafter", &steps.drafter, StateField::Critique),
            ("critic", &steps.critic, StateField::Critique),
        ] {
            if step.reads.contains(&field) {
                let reason = match field {
                    StateField::Document => "`document` does not exist before the drafter runs",
                    _ => "`critique` is only fresh for the refiner",
                };
                return Err(ConfigError::invalid(format!("steps.{}.reads", key), reason));
            }
        }
        for (key, step, field) in [
            ("critic", &steps.critic, StateField::Document),
            ("refiner", &steps.refiner, StateField::Critique),
        ] {
            if !step.reads.contains(&field) {
                return Err(ConfigError::invalid(
                    format!("steps.{}.reads", key),
                    format!("must include `{}`", field),
                ));
            }
        }
        Ok(())
    }
}

impl Default for WorkflowLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_step(key: &str, step: &StepDefinition) -> Result<(), ConfigError> {
    if step.name.trim().is_empty() {
        return Err(ConfigError::invalid(
            format!("steps.{}.name", key),
            "must not be empty",
        ));
    }
    if step.instruction.trim().is_empty() {
        return Err(ConfigError::invalid(
            format!("steps.{}.instruction", key),
            "must not be empty",
        ));
    }
    if let Some(field) = PromptTemplate::parse(&step.instruction).undeclared(&step.reads) {
        return Err(ConfigError::UndeclaredPlaceholder {
            step: step.name.clone(),
            field,
        });
    }
    if let Some(tool) = &step.exit_tool {
        if ExitTool::from_name(tool).is_none() {
            return Err(ConfigError::invalid(
                format!("steps.{}.exit_tool", key),
                format!("unknown exit tool '{}'", tool),
            ));
        }
    }
    Ok(())
}

fn expect_output(key: &str, step: &StepDefinition, field: StateField) -> Result<(), ConfigError> {
    if step.output != field {
        return Err(ConfigError::invalid(
            format!("steps.{}.output", key),
            format!("must be `{}`, found `{}`", field, step.output),
        ));
    }
    Ok(())
}
