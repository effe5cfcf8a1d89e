//! Failures of narrative generation

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LLMError>;

/// Everything that can go wrong between a stage prompt and its narrative.
///
/// All variants except [`LLMError::Internal`] describe the service being
/// unreachable, refusing, or answering badly. See [`LLMError::is_degradable`].
#[derive(Error, Debug)]
pub enum LLMError {
    // Transport
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API request failed: {0}")]
    RequestFailed(String),

    // Rejections by the service
    #[error("Invalid API key or authentication failed")]
    AuthenticationFailed,

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    // Answers that cannot be used
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// The tool loop spent its budget without a final answer
    #[error("No final answer after {0} iterations")]
    IterationLimit(usize),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A defect in the backend itself rather than in the service
    #[error("Internal backend error: {0}")]
    Internal(String),
}

impl LLMError {
    /// Whether a caller may substitute a placeholder narrative and carry on.
    ///
    /// Anything that is not degradable should abort the surrounding run.
    pub fn is_degradable(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_failures_are_degradable() {
        assert!(LLMError::AuthenticationFailed.is_degradable());
        assert!(LLMError::RateLimitExceeded("slow down".into()).is_degradable());
        assert!(LLMError::IterationLimit(10).is_degradable());
        assert!(LLMError::UnexpectedResponse("no choices".into()).is_degradable());
    }

    #[test]
    fn internal_failures_are_not_degradable() {
        assert!(!LLMError::Internal("poisoned state".into()).is_degradable());
    }
}
