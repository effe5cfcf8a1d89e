//! Error types for the analysis pipeline

use crate::stage::StageId;
use crew_llm::LLMError;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failures that abort a whole analysis run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The symbol was empty or whitespace
    #[error("Symbol must not be empty")]
    EmptySymbol,

    /// A stage allow-list names a tool the registry does not hold
    #[error("Tool error: {0}")]
    Tool(#[from] crew_core::Error),

    /// A task description could not be rendered
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    /// A stage output was recorded twice in one run
    #[error("Output for stage {0} is already recorded")]
    ContextConflict(StageId),

    /// The narrative backend failed in a way that is not a known outage
    #[error("Backend failure in stage {stage}: {source}")]
    Backend {
        stage: StageId,
        #[source]
        source: LLMError,
    },

    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<crew_market::MarketError> for PipelineError {
    fn from(err: crew_market::MarketError) -> Self {
        Self::Config(err.to_string())
    }
}
