// SPDX-License-Identifier: MIT

//! Workflow configuration
//!
//! This module contains:
//! - types: YAML schema types for workflow definitions
//! - loader: file loading, parsing and validation

pub mod loader;
pub mod types;

pub use loader::{WorkflowLoader, DEFAULT_WORKFLOW_YAML};
pub use types::{
    GenerationParameters, LoopDefinition, ModelDefinition, StepDefinition, StepsDefinition,
    WorkflowDefinition,
};
