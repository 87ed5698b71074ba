// SPDX-License-Identifier: MIT

//! Typed error handling for the agent development kit
//!
//! Errors are layered the same way the code is: a backend call fails with a
//! [`ModelError`], a step wraps that into a [`GenerationFailure`] carried by
//! [`StepError`], and the workflow layer adds phase and iteration context on
//! top (see `fable::error`).

use crate::adk::state::StateField;
use thiserror::Error;

/// Model/LLM backend errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// API key not configured
    #[error("API key not configured for provider {provider} (set {variable})")]
    ApiKeyMissing { provider: String, variable: String },

    /// Provider not supported
    #[error("Model provider not supported: {0}")]
    UnsupportedProvider(String),

    /// Non-success status from the backend
    #[error("API error from {provider} ({status}): {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    /// Response could not be interpreted
    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),

    /// Transport errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Why a generation step produced nothing usable
#[derive(Debug, Error)]
pub enum GenerationFailure {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("no response within {0}s")]
    Timeout(u64),

    #[error("response contained neither text nor an exit call")]
    EmptyResponse,

    #[error("model called function '{0}', which was not offered")]
    UnknownFunction(String),
}

/// Violations of the shared-state invariants
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("document read before the initial draft ran")]
    DocumentNotDrafted,

    #[error("critique read again before a critique step refreshed it")]
    StaleCritique,

    #[error("topic is locked once the canonical marker is set")]
    TopicLocked,
}

/// Errors raised while running a single step
#[derive(Debug, Error)]
pub enum StepError {
    /// The backend did not return usable content
    #[error("generation failed in step '{step}': {source}")]
    Generation {
        step: String,
        #[source]
        source: GenerationFailure,
    },

    /// The step signalled exit where its contract forbids it
    #[error("step '{step}' signalled exit where it must produce text")]
    UnexpectedExit { step: String },

    /// The step returned a delta for a field it does not own
    #[error("step '{step}' wrote '{field}' but declares '{declared}' as its output")]
    UndeclaredWrite {
        step: String,
        field: StateField,
        declared: StateField,
    },

    #[error(transparent)]
    State(#[from] StateError),
}

impl StepError {
    /// Create a generation failure for the named step
    pub fn generation(step: impl Into<String>, source: impl Into<GenerationFailure>) -> Self {
        Self::Generation {
            step: step.into(),
            source: source.into(),
        }
    }

    /// Create an unexpected exit error for the named step
    pub fn unexpected_exit(step: impl Into<String>) -> Self {
        Self::UnexpectedExit { step: step.into() }
    }
}

/// Configuration errors (workflow files, step wiring, environment)
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File not found when loading a workflow
    #[error("Workflow file not found: {0}")]
    FileNotFound(String),

    /// A template placeholder names a field the step cannot see
    #[error("step '{step}' uses {{{field}}} but does not declare it in `reads`")]
    UndeclaredPlaceholder { step: String, field: StateField },

    /// Any other invalid value
    #[error("Invalid {field}: {message}")]
    Invalid { field: String, message: String },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl ConfigError {
    /// Create an invalid-value error
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_failure_names_step() {
        let err = StepError::generation("CriticAgent", GenerationFailure::Timeout(30));
        let msg = err.to_string();
        assert!(msg.contains("CriticAgent"));
        assert!(msg.contains("30s"));
    }

    #[test]
    fn test_model_error_converts_into_generation_failure() {
        let err = StepError::generation(
            "RefinerAgent",
            ModelError::InvalidResponse("no choices".to_string()),
        );
        assert!(err.to_string().contains("no choices"));
    }

    #[test]
    fn test_undeclared_placeholder_message() {
        let err = ConfigError::UndeclaredPlaceholder {
            step: "InitialWriterAgent".to_string(),
            field: StateField::Critique,
        };
        assert_eq!(
            err.to_string(),
            "step 'InitialWriterAgent' uses {critique} but does not declare it in `reads`"
        );
    }

    #[test]
    fn test_state_error_converts_into_step_error() {
        let err: StepError = StateError::StaleCritique.into();
        assert!(matches!(err, StepError::State(StateError::StaleCritique)));
    }
}
