//! OpenAI-compatible chat-completions provider
//!
//! Speaks the `/chat/completions` wire format, which Gemini exposes under
//! its OpenAI compatibility endpoint. Any other compatible server (OpenAI
//! itself, vLLM, LM Studio) works by changing `api_base`.
//!
//! ```no_run
//! use crew_llm::{CompletionRequest, LLMProvider, Message};
//! use crew_llm::providers::{OpenAIConfig, OpenAIProvider};
//!
//! # async fn demo() -> crew_llm::Result<()> {
//! let provider = OpenAIProvider::with_config(OpenAIConfig::new("key").with_timeout(60))?;
//! let request =
//!     CompletionRequest::new("gemini-2.0-flash", vec![Message::user("Summarise AAPL in one line")]);
//! let response = provider.complete(request).await?;
//! println!("{}", response.message.text().unwrap_or_default());
//! # Ok(())
//! # }
//! ```

use crate::{
    CompletionRequest, CompletionResponse, LLMError, LLMProvider, Result, StopReason, TokenUsage,
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

/// Gemini's OpenAI-compatible endpoint
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for the OpenAI-compatible provider
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key sent as a bearer token
    pub api_key: String,

    /// Base URL; `/chat/completions` is appended
    pub api_base: String,

    /// Request timeout in seconds (default: 120)
    pub timeout_secs: u64,
}

impl OpenAIConfig {
    /// Create a new config with the given API key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Set custom API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Set request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// OpenAI-compatible provider
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    /// Create a provider with custom configuration
    pub fn with_config(config: OpenAIConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LLMError::ConfigurationError(
                "API key must not be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Create a provider with API key and default settings
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(OpenAIConfig::new(api_key))
    }

    /// Get the current configuration
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    #[instrument(skip(self, request), fields(model = %request.model, api_base = %self.config.api_base))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!("Sending chat completion request");

        let body = wire::ChatRequest::from(&request);
        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.api_base))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await?;
            return Err(error_for_status(status.as_u16(), detail, request.model));
        }

        let reply: wire::ChatResponse = response.json().await.map_err(|e| {
            LLMError::UnexpectedResponse(format!("Failed to parse response: {e}"))
        })?;
        let usage = reply.usage.unwrap_or_default();
        let Some(choice) = reply.choices.into_iter().next() else {
            return Err(LLMError::UnexpectedResponse(
                "No choices in response".to_string(),
            ));
        };

        debug!(
            finish_reason = %choice.finish_reason.as_deref().unwrap_or("none"),
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "Received chat completion"
        );

        let message = choice.message.into_message()?;
        // Some servers report "stop" even when the turn carries tool calls
        let stop_reason = if message.has_tool_uses() {
            StopReason::ToolUse
        } else {
            map_stop_reason(choice.finish_reason.as_deref().unwrap_or("stop"))
        };

        Ok(CompletionResponse {
            message,
            stop_reason,
            usage: TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
        })
    }

    fn name(&self) -> &'static str {
        "openai-compatible"
    }
}

fn error_for_status(status: u16, detail: String, model: String) -> LLMError {
    match status {
        401 | 403 => LLMError::AuthenticationFailed,
        429 => LLMError::RateLimitExceeded(detail),
        400 => LLMError::InvalidRequest(detail),
        404 => LLMError::ModelNotFound(model),
        _ => LLMError::RequestFailed(format!("HTTP {status}: {detail}")),
    }
}

fn map_stop_reason(reason: &str) -> StopReason {
    match reason {
        "length" => StopReason::MaxTokens,
        "tool_calls" => StopReason::ToolUse,
        "stop" => StopReason::EndTurn,
        other => {
            debug!(finish_reason = other, "Unrecognised finish reason");
            StopReason::EndTurn
        }
    }
}

/// `/chat/completions` request and response bodies
mod wire {
    use crate::{ContentBlock, LLMError, Message, MessageContent, Result, Role, ToolDefinition};
    use serde::{Deserialize, Serialize};
    use serde_json::Value;

    #[derive(Debug, Serialize)]
    pub(super) struct ChatRequest {
        pub model: String,
        pub messages: Vec<Turn>,
        pub max_tokens: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub temperature: Option<f32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub tools: Option<Vec<FunctionTool>>,
    }

    impl From<&crate::CompletionRequest> for ChatRequest {
        fn from(request: &crate::CompletionRequest) -> Self {
            let system = request.system.iter().map(|s| Turn::text("system", s.clone()));
            let conversation = request.messages.iter().cloned().flat_map(Turn::expand);
            Self {
                model: request.model.clone(),
                messages: system.chain(conversation).collect(),
                max_tokens: request.max_tokens,
                temperature: request.temperature,
                tools: request
                    .tools
                    .as_ref()
                    .map(|tools| tools.iter().map(FunctionTool::from).collect()),
            }
        }
    }

    #[derive(Debug, Serialize)]
    pub(super) struct Turn {
        pub role: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub tool_calls: Option<Vec<OutgoingCall>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub tool_call_id: Option<String>,
    }

    impl Turn {
        fn text(role: &'static str, content: String) -> Self {
            Self {
                role,
                content: Some(content),
                tool_calls: None,
                tool_call_id: None,
            }
        }

        /// One message may become several turns: each tool result is its own
        /// `tool` turn, placed after the turn holding text and calls
        pub(super) fn expand(message: Message) -> Vec<Self> {
            let role = match message.role {
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::System => "system",
            };
            let blocks = match message.content {
                Some(MessageContent::Blocks(blocks)) => blocks,
                Some(MessageContent::Text(text)) => return vec![Self::text(role, text)],
                None => return vec![Self::text(role, String::new())],
            };

            let mut text = Vec::new();
            let mut calls = Vec::new();
            let mut answers = Vec::new();
            for block in blocks {
                match block {
                    ContentBlock::Text { text: part } => text.push(part),
                    ContentBlock::ToolUse { id, name, input } => calls.push(OutgoingCall {
                        id,
                        kind: "function",
                        function: FunctionCall {
                            name,
                            arguments: input.to_string(),
                        },
                    }),
                    ContentBlock::ToolResult {
                        tool_use_id,
                        content,
                        ..
                    } => answers.push(Self {
                        role: "tool",
                        content: Some(content),
                        tool_calls: None,
                        tool_call_id: Some(tool_use_id),
                    }),
                }
            }

            let mut turns = Vec::with_capacity(answers.len() + 1);
            if !text.is_empty() || !calls.is_empty() {
                turns.push(Self {
                    role,
                    content: (!text.is_empty()).then(|| text.join("\n")),
                    tool_calls: (!calls.is_empty()).then_some(calls),
                    tool_call_id: None,
                });
            }
            turns.extend(answers);
            turns
        }
    }

    #[derive(Debug, Serialize)]
    pub(super) struct FunctionTool {
        #[serde(rename = "type")]
        pub kind: &'static str,
        pub function: FunctionSpec,
    }

    impl From<&ToolDefinition> for FunctionTool {
        fn from(tool: &ToolDefinition) -> Self {
            Self {
                kind: "function",
                function: FunctionSpec {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.input_schema.clone(),
                },
            }
        }
    }

    #[derive(Debug, Serialize)]
    pub(super) struct FunctionSpec {
        pub name: String,
        pub description: String,
        pub parameters: Value,
    }

    #[derive(Debug, Serialize)]
    pub(super) struct OutgoingCall {
        pub id: String,
        #[serde(rename = "type")]
        pub kind: &'static str,
        pub function: FunctionCall,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub(super) struct FunctionCall {
        pub name: String,
        pub arguments: String,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct ChatResponse {
        pub choices: Vec<Choice>,
        pub usage: Option<Usage>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct Choice {
        pub message: Reply,
        pub finish_reason: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct Reply {
        pub content: Option<String>,
        pub tool_calls: Option<Vec<IncomingCall>>,
    }

    impl Reply {
        pub(super) fn into_message(self) -> Result<Message> {
            let mut blocks = Vec::new();
            if let Some(text) = self.content.filter(|c| !c.is_empty()) {
                blocks.push(ContentBlock::Text { text });
            }
            for call in self.tool_calls.unwrap_or_default() {
                blocks.push(ContentBlock::ToolUse {
                    input: parse_arguments(&call.function.arguments)?,
                    id: call.id,
                    name: call.function.name,
                });
            }
            Ok(Message {
                role: Role::Assistant,
                content: Some(MessageContent::Blocks(blocks)),
            })
        }
    }

    /// Argument-less calls arrive as `""` from some servers
    fn parse_arguments(raw: &str) -> Result<Value> {
        if raw.trim().is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }
        serde_json::from_str(raw).map_err(|e| {
            LLMError::UnexpectedResponse(format!("Failed to parse tool arguments: {e}"))
        })
    }

    #[derive(Debug, Deserialize)]
    pub(super) struct IncomingCall {
        pub id: String,
        pub function: FunctionCall,
    }

    #[derive(Debug, Default, Deserialize)]
    pub(super) struct Usage {
        #[serde(default)]
        pub prompt_tokens: usize,
        #[serde(default)]
        pub completion_tokens: usize,
    }
}
