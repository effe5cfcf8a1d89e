//! Failures while fetching or computing market data

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MarketError>;

#[derive(Debug, Error)]
pub enum MarketError {
    /// Upstream answered with something unusable
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    /// Too few observations for a calculation
    #[error("Insufficient data points ({points}) for ticker {symbol}")]
    InsufficientData { symbol: String, points: usize },

    /// History range outside the supported set, e.g. "7w"
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    #[error("Technical indicator error: {0}")]
    IndicatorError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

// Tools surface market failures as execution failures of the tool call
impl From<MarketError> for crew_core::Error {
    fn from(err: MarketError) -> Self {
        crew_core::Error::ExecutionFailed(err.to_string())
    }
}

impl From<ta::errors::TaError> for MarketError {
    fn from(err: ta::errors::TaError) -> Self {
        MarketError::IndicatorError(format!("{err:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_symbol() {
        let err = MarketError::InsufficientData {
            symbol: "NEWCO".to_string(),
            points: 12,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient data points (12) for ticker NEWCO"
        );

        let err = MarketError::DataUnavailable {
            symbol: "AAPL".to_string(),
            reason: "No data found".to_string(),
        };
        assert_eq!(err.to_string(), "Data not available for AAPL: No data found");
    }

    #[test]
    fn converts_into_tool_execution_failure() {
        let core: crew_core::Error = MarketError::ApiError("down".to_string()).into();
        assert!(matches!(core, crew_core::Error::ExecutionFailed(msg) if msg.contains("API error")));
    }
}
