//! The narrative generation capability consumed by pipeline stages

use crate::Result;
use async_trait::async_trait;
use crew_core::ToolRegistry;

/// One narrative request: who is speaking and what they are asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrativeRequest {
    /// Persona framing, sent as the system prompt
    pub system: String,
    /// Task description, sent as the user turn
    pub prompt: String,
}

impl NarrativeRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
        }
    }
}

/// Text generation that may call tools along the way.
///
/// `tools` is the complete set the backend may use for this request;
/// implementations must not reach for tools outside it.
#[async_trait]
pub trait NarrativeBackend: Send + Sync {
    /// Produce the final text for `request`
    async fn generate(&self, request: &NarrativeRequest, tools: &ToolRegistry) -> Result<String>;

    /// Backend name for logs
    fn name(&self) -> &str;
}
