// SPDX-License-Identifier: MIT

//! Model module - defines the LLM backend trait and shared message types
//!
//! The workflow only ever needs one narrow capability from a backend: send a
//! short conversation plus the callable actions on offer, get back text or a
//! function call. Implementations live in their own submodules:
//! - [openai] - any OpenAI-compatible chat-completions endpoint (OpenAI, DeepSeek)

pub mod openai;

use crate::adk::error::ModelError;
use crate::adk::tool::Tool;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Configuration for model generation
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn system(text: impl Into<String>) -> Self {
        Self::text("system", text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::text("user", text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::text("model", text)
    }

    fn text(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Concatenated text parts, thinking excluded
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Parts of a message - text, thinking, function calls
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Part {
    /// Regular text output from the model
    Text(String),
    /// Reasoning content from thinking models, never used as step output
    Thinking(String),
    /// Function/tool call requested by the model
    FunctionCall {
        name: String,
        args: serde_json::Value,
    },
}

/// Supported backend providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provider {
    OpenAI,
    DeepSeek,
}

impl Provider {
    /// Environment variable holding the API key
    pub fn api_key_var(self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::DeepSeek => "DEEPSEEK_API_KEY",
        }
    }

    /// Environment variable overriding the base URL
    pub fn base_url_var(self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_BASE_URL",
            Provider::DeepSeek => "DEEPSEEK_BASE_URL",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1",
            Provider::DeepSeek => "https://api.deepseek.com/v1",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::OpenAI => "gpt-4o-mini",
            Provider::DeepSeek => "deepseek-chat",
        }
    }

    /// Infer the provider from the model name prefix
    pub fn infer_from_model(model_name: &str) -> Self {
        let name_lower = model_name.to_lowercase();
        if name_lower.starts_with("gpt") || name_lower.starts_with("o1") {
            Provider::OpenAI
        } else {
            // Default to DeepSeek
            Provider::DeepSeek
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAI => f.write_str("OpenAI"),
            Provider::DeepSeek => f.write_str("DeepSeek"),
        }
    }
}

impl FromStr for Provider {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "deepseek" => Ok(Provider::DeepSeek),
            _ => Err(ModelError::UnsupportedProvider(s.to_string())),
        }
    }
}

/// Core trait for LLM model implementations
#[async_trait]
pub trait Model: Send + Sync {
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Result<Content, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_provider_openai() {
        assert_eq!(Provider::infer_from_model("gpt-4o"), Provider::OpenAI);
        assert_eq!(Provider::infer_from_model("GPT-4"), Provider::OpenAI);
        assert_eq!(Provider::infer_from_model("o1-mini"), Provider::OpenAI);
    }

    #[test]
    fn test_infer_provider_deepseek() {
        assert_eq!(Provider::infer_from_model("deepseek-chat"), Provider::DeepSeek);
        assert_eq!(Provider::infer_from_model("DeepSeek-V2"), Provider::DeepSeek);
    }

    #[test]
    fn test_infer_provider_unknown_defaults_to_deepseek() {
        assert_eq!(Provider::infer_from_model("my-custom-model"), Provider::DeepSeek);
        assert_eq!(Provider::infer_from_model(""), Provider::DeepSeek);
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("OpenAI".parse::<Provider>().unwrap(), Provider::OpenAI);
        assert_eq!("deepseek".parse::<Provider>().unwrap(), Provider::DeepSeek);
        assert!("Gemini".parse::<Provider>().is_err());
    }

    #[test]
    fn test_text_content_skips_thinking() {
        let content = Content {
            role: "model".to_string(),
            parts: vec![
                Part::Thinking("hmm".to_string()),
                Part::Text("Once".to_string()),
                Part::Text(" upon".to_string()),
            ],
        };
        assert_eq!(content.text_content(), "Once upon");
    }
}
