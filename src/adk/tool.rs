// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::error::Error;

/// Trait for tools that can be called by the model.
///
/// - `name()` and `description()` return `&str` to avoid allocation on every call
/// - `schema()` returns `&Value` to avoid cloning the schema on every access
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool name (must be unique within a step's tool set)
    fn name(&self) -> &str;

    /// Returns a human-readable description of what the tool does
    fn description(&self) -> &str;

    /// Returns the JSON schema for the tool's input parameters
    fn schema(&self) -> &Value;

    /// Execute the tool with the given input and return the result
    async fn execute(&self, input: Value) -> Result<Value, Box<dyn Error + Send + Sync>>;
}

static EXIT_LOOP_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "topic": {
                "type": "string",
                "description": "The topic of the story"
            }
        },
        "required": ["topic"]
    })
});

static EXIT_SEQUENCE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "requirement": {
                "type": "string",
                "description": "The confirmed story requirement"
            }
        },
        "required": ["requirement"]
    })
});

/// The only action a step can offer the model: end the enclosing loop.
///
/// Executing it has no side effect; the step that offered it turns the call
/// into `StepResult::Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitTool {
    /// Ends the critique/refine loop
    ExitLoop,
    /// Ends the topic collection sequence
    ExitSequence,
}

impl ExitTool {
    pub fn exit_loop() -> Self {
        ExitTool::ExitLoop
    }

    pub fn exit_sequence() -> Self {
        ExitTool::ExitSequence
    }

    /// Look up an exit tool by its function name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "exit_loop" => Some(ExitTool::ExitLoop),
            "exit_sequence" => Some(ExitTool::ExitSequence),
            _ => None,
        }
    }
}

#[async_trait]
impl Tool for ExitTool {
    fn name(&self) -> &str {
        match self {
            ExitTool::ExitLoop => "exit_loop",
            ExitTool::ExitSequence => "exit_sequence",
        }
    }

    fn description(&self) -> &str {
        match self {
            ExitTool::ExitLoop => {
                "Call this function ONLY when the critique indicates no further changes are needed."
            }
            ExitTool::ExitSequence => {
                "Call this function ONLY when the requirement has both a clear topic and a theme."
            }
        }
    }

    fn schema(&self) -> &Value {
        match self {
            ExitTool::ExitLoop => &EXIT_LOOP_SCHEMA,
            ExitTool::ExitSequence => &EXIT_SEQUENCE_SCHEMA,
        }
    }

    async fn execute(&self, input: Value) -> Result<Value, Box<dyn Error + Send + Sync>> {
        log::info!("[Tool Call] {} triggered with {}", self.name(), input);
        Ok(json!({}))
    }
}
