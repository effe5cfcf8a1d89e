//! Tool-calling loop that turns an [`LLMProvider`] into a [`NarrativeBackend`]
//!
//! Each request runs the usual agent loop:
//! 1. Call the LLM with the conversation and the offered tools
//! 2. If it asks for tools, run them and append the results
//! 3. Stop on a final answer or when the iteration budget runs out

use crate::{
    CompletionRequest, ContentBlock, LLMError, LLMProvider, Message, NarrativeBackend,
    NarrativeRequest, Result, StopReason, TokenUsage, ToolDefinition,
};
use async_trait::async_trait;
use crew_core::ToolRegistry;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const PREVIEW_CHARS: usize = 300;

/// Configuration for the tool loop
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum LLM round trips per request
    pub max_iterations: usize,

    /// Model to use
    pub model: String,

    /// Max tokens per completion
    pub max_tokens: usize,

    /// Temperature
    pub temperature: Option<f32>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            model: "gemini-2.0-flash".to_string(),
            max_tokens: 4096,
            temperature: Some(0.7),
        }
    }
}

/// [`NarrativeBackend`] backed by a chat-completions provider
pub struct ToolLoopBackend {
    provider: Arc<dyn LLMProvider>,
    config: ExecutorConfig,
}

impl ToolLoopBackend {
    pub fn new(provider: Arc<dyn LLMProvider>, config: ExecutorConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    fn build_request(
        &self,
        request: &NarrativeRequest,
        conversation: &[Message],
        tools: &[ToolDefinition],
    ) -> CompletionRequest {
        CompletionRequest::new(&self.config.model, conversation.to_vec())
            .with_system(request.system.clone())
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature)
            .with_tools(tools.to_vec())
    }

    /// Run every tool call in `message`, one at a time, in order
    async fn execute_tools(&self, message: &Message, tools: &ToolRegistry) -> Vec<Message> {
        let mut results = Vec::new();

        for block in message.tool_uses() {
            let ContentBlock::ToolUse { id, name, input } = block else {
                continue;
            };
            results.push(run_tool(tools, id, name, input).await);
        }

        results
    }
}

async fn run_tool(tools: &ToolRegistry, id: &str, name: &str, input: &Value) -> Message {
    let input_preview: String = input.to_string().chars().take(PREVIEW_CHARS).collect();
    info!(tool_name = %name, tool_id = %id, input_preview = %input_preview, "Executing tool");

    let Some(tool) = tools.get(name) else {
        warn!(tool_name = %name, offered = ?tools.names(), "Backend requested a tool outside the allow-list");
        return Message::tool_error(
            id.to_string(),
            format!("Tool '{name}' is not available for this task"),
        );
    };

    let start = Instant::now();
    match tool.execute(input.clone()).await {
        Ok(result) => {
            let result_str = result.to_string();
            let result_preview: String = result_str.chars().take(PREVIEW_CHARS).collect();
            info!(
                tool_name = %name,
                duration_ms = start.elapsed().as_millis() as u64,
                result_length = result_str.len(),
                result_preview = %result_preview,
                "Tool execution succeeded"
            );
            Message::tool_result(id.to_string(), result_str)
        }
        Err(e) => {
            warn!(
                tool_name = %name,
                duration_ms = start.elapsed().as_millis() as u64,
                error = %e,
                "Tool execution failed"
            );
            Message::tool_error(id.to_string(), format!("Error: {e}"))
        }
    }
}

#[async_trait]
impl NarrativeBackend for ToolLoopBackend {
    async fn generate(&self, request: &NarrativeRequest, tools: &ToolRegistry) -> Result<String> {
        let definitions: Vec<ToolDefinition> = tools
            .list_tools()
            .iter()
            .map(|tool| ToolDefinition::from(tool.as_ref()))
            .collect();
        let mut conversation = vec![Message::user(request.prompt.clone())];
        let mut usage = TokenUsage::default();

        for iteration in 1..=self.config.max_iterations {
            info!(
                iteration,
                max_iterations = self.config.max_iterations,
                model = %self.config.model,
                tool_count = definitions.len(),
                "Sending request to LLM"
            );

            let response = self
                .provider
                .complete(self.build_request(request, &conversation, &definitions))
                .await?;

            info!(
                stop_reason = ?response.stop_reason,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                "LLM response received"
            );
            usage += response.usage;

            let text = response.message.text().unwrap_or_default();
            let preview: String = text.chars().take(PREVIEW_CHARS).collect();
            debug!(response_preview = %preview, "LLM response content preview");

            match response.stop_reason {
                StopReason::ToolUse if response.message.has_tool_uses() => {
                    let results = self.execute_tools(&response.message, tools).await;
                    conversation.push(response.message);
                    conversation.extend(results);
                }
                StopReason::MaxTokens if text.trim().is_empty() => {
                    return Err(LLMError::UnexpectedResponse(
                        "response truncated at the token limit before any text".to_string(),
                    ));
                }
                StopReason::MaxTokens => {
                    warn!("Hit max tokens in LLM response, keeping truncated text");
                    return Ok(text);
                }
                _ if text.trim().is_empty() => {
                    return Err(LLMError::UnexpectedResponse(
                        "LLM returned an empty answer".to_string(),
                    ));
                }
                _ => {
                    info!(
                        iteration,
                        response_length = text.len(),
                        total_tokens = usage.total(),
                        "Narrative completed"
                    );
                    return Ok(text);
                }
            }
        }

        warn!(
            max_iterations = self.config.max_iterations,
            "Max iterations reached without a final answer"
        );
        Err(LLMError::IterationLimit(self.config.max_iterations))
    }

    fn name(&self) -> &str {
        self.provider.name()
    }
}
