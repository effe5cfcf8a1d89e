//! The capability offered to the narrative backend

use crate::Result;
use async_trait::async_trait;
use serde_json::Value;

/// A callable the narrative backend may use while working on a stage.
///
/// Quantitative tools report data problems inside the returned JSON payload
/// and reserve `Err` for inputs they cannot even parse.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Run with JSON arguments shaped by [`input_schema`](Tool::input_schema)
    async fn execute(&self, params: Value) -> Result<Value>;

    /// Registry key; stage allow-lists refer to tools by this name
    fn name(&self) -> &str;

    /// Shown to the model so it can decide when the tool helps
    fn description(&self) -> &str;

    /// JSON Schema of the arguments, e.g.
    ///
    /// ```
    /// use serde_json::json;
    ///
    /// let schema = json!({
    ///     "type": "object",
    ///     "properties": { "ticker": { "type": "string" } },
    ///     "required": ["ticker"]
    /// });
    /// assert_eq!(schema["required"][0], "ticker");
    /// ```
    fn input_schema(&self) -> Value;
}
