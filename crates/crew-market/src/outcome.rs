//! Tagged tool results
//!
//! Each tool computes into a typed success payload or a [`ToolFailure`].
//! Failures are data: they are serialized into the JSON the narrative
//! backend reads, never raised past the tool.

use serde::Serialize;
use serde_json::{Value, json};

/// Wire layout of a failure payload.
///
/// Tools differ in how they report errors to the backend, and the layouts
/// are part of each tool's contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureShape {
    /// `{error, ticker}`
    Plain,
    /// `{ticker, error, status: "failed"}`
    Failed,
    /// `{status: "error", message, ticker}`
    Status,
}

/// A tool-level failure carrying a human-readable message and the ticker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFailure {
    pub ticker: String,
    pub message: String,
    pub shape: FailureShape,
}

impl ToolFailure {
    pub fn new(ticker: impl Into<String>, message: impl Into<String>, shape: FailureShape) -> Self {
        Self {
            ticker: ticker.into(),
            message: message.into(),
            shape,
        }
    }

    /// Render in the tool's wire layout
    pub fn into_value(self) -> Value {
        match self.shape {
            FailureShape::Plain => json!({ "error": self.message, "ticker": self.ticker }),
            FailureShape::Failed => {
                json!({ "ticker": self.ticker, "error": self.message, "status": "failed" })
            }
            FailureShape::Status => {
                json!({ "status": "error", "message": self.message, "ticker": self.ticker })
            }
        }
    }
}

/// Result of one tool call
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome<T> {
    Success(T),
    Failure(ToolFailure),
}

impl<T: Serialize> ToolOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// JSON handed to the narrative backend.
    ///
    /// A payload that cannot be serialized becomes a failure in `shape`,
    /// so this never errors.
    pub fn into_value(self, ticker: &str, shape: FailureShape) -> Value {
        match self {
            Self::Success(payload) => match serde_json::to_value(payload) {
                Ok(value) => value,
                Err(e) => ToolFailure::new(ticker, format!("Could not encode result: {e}"), shape)
                    .into_value(),
            },
            Self::Failure(failure) => failure.into_value(),
        }
    }
}

/// Serialize an `f64` as JSON `null` when it is not finite
pub(crate) fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_shapes() {
        let plain = ToolFailure::new("X", "boom", FailureShape::Plain).into_value();
        assert_eq!(plain, json!({"error": "boom", "ticker": "X"}));

        let failed = ToolFailure::new("ZZZINVALID", "no data", FailureShape::Failed).into_value();
        assert_eq!(
            failed,
            json!({"ticker": "ZZZINVALID", "error": "no data", "status": "failed"})
        );

        let status = ToolFailure::new("X", "no sector", FailureShape::Status).into_value();
        assert_eq!(
            status,
            json!({"status": "error", "message": "no sector", "ticker": "X"})
        );
    }

    #[test]
    fn success_serializes_payload() {
        #[derive(Serialize)]
        struct Payload {
            rsi: Option<f64>,
        }
        let outcome = ToolOutcome::Success(Payload { rsi: finite(f64::NAN) });
        assert!(outcome.is_success());
        assert_eq!(
            outcome.into_value("X", FailureShape::Plain),
            json!({"rsi": null})
        );
    }
}
