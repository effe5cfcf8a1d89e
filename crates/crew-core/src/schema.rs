//! Helpers to build JSON schemas for tool inputs

use serde_json::{Value, json};

/// Create a JSON schema for an object with properties
///
/// # Example
///
/// ```
/// use crew_core::schema;
/// use serde_json::json;
///
/// let schema = schema::object(
///     json!({
///         "ticker": schema::string("Stock ticker symbol"),
///         "num_competitors": schema::integer("How many peers to compare"),
///     }),
///     &["ticker"],
/// );
/// assert_eq!(schema["type"], "object");
/// ```
pub fn object(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// String property schema
pub fn string(description: &str) -> Value {
    json!({
        "type": "string",
        "description": description,
    })
}

/// Number property schema
pub fn number(description: &str) -> Value {
    json!({
        "type": "number",
        "description": description,
    })
}

/// Integer property schema
pub fn integer(description: &str) -> Value {
    json!({
        "type": "integer",
        "description": description,
    })
}
