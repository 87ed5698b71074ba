// SPDX-License-Identifier: MIT

//! OpenAI-compatible chat-completions backend
//!
//! DeepSeek exposes the same wire format, so one client serves both
//! providers; only the key variable and the default base URL differ.

use super::{Content, GenerationConfig, Model, Part, Provider};
use crate::adk::error::ModelError;
use crate::adk::tool::Tool;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::sync::Arc;

/// Chat-completions client
pub struct OpenAIModel {
    client: Client,
    provider: Provider,
    api_key: String,
    model_name: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolSpec<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct ChatMessage {
    role: String,
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct ToolCall {
    #[serde(default)]
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: FunctionCall,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct FunctionCall {
    name: String,
    /// JSON-encoded arguments, as the API transmits them
    #[serde(default)]
    arguments: String,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize)]
struct ToolSpec<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: FunctionSpec<'a>,
}

#[derive(Debug, Serialize)]
struct FunctionSpec<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    /// Present on DeepSeek reasoning models
    reasoning_content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

impl OpenAIModel {
    /// Create a client for the given provider
    ///
    /// Reads the provider's API key variable (`OPENAI_API_KEY` or
    /// `DEEPSEEK_API_KEY`) and, when set, its base URL override.
    pub fn new(provider: Provider, model_name: impl Into<String>) -> Result<Self, ModelError> {
        let api_key = env::var(provider.api_key_var()).map_err(|_| ModelError::ApiKeyMissing {
            provider: provider.to_string(),
            variable: provider.api_key_var().to_string(),
        })?;
        let base_url = env::var(provider.base_url_var())
            .unwrap_or_else(|_| provider.default_base_url().to_string());

        Ok(Self::with_credentials(provider, api_key, model_name, base_url))
    }

    /// Create a client with explicit credentials
    pub fn with_credentials(
        provider: Provider,
        api_key: impl Into<String>,
        model_name: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            provider,
            api_key: api_key.into(),
            model_name: model_name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Override the base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Convert internal Content to a chat message
    fn to_chat_message(content: &Content) -> ChatMessage {
        let role = match content.role.as_str() {
            "model" => "assistant",
            other => other,
        };

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for part in &content.parts {
            match part {
                Part::Text(t) => text.push_str(t),
                // Reasoning is never sent back
                Part::Thinking(_) => {}
                Part::FunctionCall { name, args } => tool_calls.push(ToolCall {
                    id: name.clone(),
                    kind: function_kind(),
                    function: FunctionCall {
                        name: name.clone(),
                        arguments: args.to_string(),
                    },
                }),
            }
        }

        ChatMessage {
            role: role.to_string(),
            content: if text.is_empty() && !tool_calls.is_empty() {
                None
            } else {
                Some(text)
            },
            tool_calls,
        }
    }

    fn build_request<'a>(
        &'a self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        tools: Option<&'a [Arc<dyn Tool>]>,
    ) -> ChatRequest<'a> {
        let tools: Vec<ToolSpec<'a>> = tools
            .unwrap_or_default()
            .iter()
            .map(|t| ToolSpec {
                kind: "function",
                function: FunctionSpec {
                    name: t.name(),
                    description: t.description(),
                    parameters: t.schema(),
                },
            })
            .collect();

        ChatRequest {
            model: &self.model_name,
            messages: history.iter().map(Self::to_chat_message).collect(),
            tool_choice: if tools.is_empty() { None } else { Some("auto") },
            tools,
            temperature: config.and_then(|c| c.temperature),
            max_tokens: config.and_then(|c| c.max_output_tokens),
            top_p: config.and_then(|c| c.top_p),
        }
    }

    /// Parse a chat-completions response into Content
    fn parse_response(response: ChatResponse) -> Result<Content, ModelError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::InvalidResponse("no choices in response".to_string()))?;

        let message = choice.message;
        let mut parts = Vec::new();

        if let Some(reasoning) = message.reasoning_content.filter(|r| !r.is_empty()) {
            parts.push(Part::Thinking(reasoning));
        }
        if let Some(text) = message.content.filter(|t| !t.is_empty()) {
            parts.push(Part::Text(text));
        }
        for call in message.tool_calls {
            let args = if call.function.arguments.trim().is_empty() {
                Value::Object(Default::default())
            } else {
                serde_json::from_str(&call.function.arguments).map_err(|e| {
                    ModelError::InvalidResponse(format!(
                        "arguments of '{}' are not JSON: {}",
                        call.function.name, e
                    ))
                })?
            };
            parts.push(Part::FunctionCall {
                name: call.function.name,
                args,
            });
        }

        Ok(Content {
            role: "model".to_string(),
            parts,
        })
    }
}

#[async_trait]
impl Model for OpenAIModel {
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Result<Content, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = self.build_request(history, config, tools);

        log::debug!(
            "{} request body: {}",
            self.provider,
            serde_json::to_string_pretty(&request).unwrap_or_default()
        );

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await?;
            return Err(ModelError::Api {
                provider: self.provider.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = resp.json().await?;
        log::debug!("{} response: {:?}", self.provider, body);

        Self::parse_response(body)
    }
}
