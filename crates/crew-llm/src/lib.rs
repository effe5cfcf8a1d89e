//! Narrative generation for the stock analysis crew
//!
//! This crate provides:
//!
//! - Message and completion types for chat-style LLM APIs
//! - The [`LLMProvider`] trait and an OpenAI-compatible implementation
//!   (Gemini, OpenAI, local servers)
//! - The [`NarrativeBackend`] capability used by pipeline stages, and
//!   [`ToolLoopBackend`], which drives the provider through tool calls

pub mod backend;
pub mod completion;
pub mod error;
pub mod executor;
pub mod messages;
pub mod provider;
pub mod providers;
pub mod tools;

pub use backend::{NarrativeBackend, NarrativeRequest};
pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use executor::{ExecutorConfig, ToolLoopBackend};
pub use messages::{ContentBlock, Message, MessageContent, Role};
pub use provider::LLMProvider;
pub use tools::ToolDefinition;
