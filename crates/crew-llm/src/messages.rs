//! Conversation turns exchanged with a chat-completions provider
//!
//! A turn carries either bare text or a list of [`ContentBlock`]s; blocks are
//! only needed once tool calls and their answers enter the conversation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One piece of a structured turn
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },

    /// The model asking for a tool run; `id` pairs it with its answer
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },

    /// Output of a tool run, sent back on the user side
    ToolResult {
        tool_use_id: String,
        content: String,
        /// `Some(true)` marks a refused or failed tool call
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    /// Absent on assistant turns that only request tools
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
}

impl Message {
    fn plain(role: Role, text: String) -> Self {
        Self {
            role,
            content: Some(MessageContent::Text(text)),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::plain(Role::User, text.into())
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, text.into())
    }

    /// Successful tool output answering the call `tool_use_id`
    pub fn tool_result(tool_use_id: String, result: String) -> Self {
        Self::answer(tool_use_id, result, None)
    }

    /// Tool call that could not be served; the model sees `error` instead
    pub fn tool_error(tool_use_id: String, error: String) -> Self {
        Self::answer(tool_use_id, error, Some(true))
    }

    fn answer(tool_use_id: String, content: String, is_error: Option<bool>) -> Self {
        let block = ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        };
        Self {
            role: Role::User,
            content: Some(MessageContent::Blocks(vec![block])),
        }
    }

    fn blocks(&self) -> &[ContentBlock] {
        match &self.content {
            Some(MessageContent::Blocks(blocks)) => blocks,
            _ => &[],
        }
    }

    /// Text of the turn, text blocks joined by newlines
    ///
    /// `None` when the turn has no text at all, e.g. a pure tool request.
    pub fn text(&self) -> Option<String> {
        if let Some(MessageContent::Text(text)) = &self.content {
            return Some(text.clone());
        }
        let joined = self
            .blocks()
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        (!joined.is_empty()).then_some(joined)
    }

    /// The `ToolUse` blocks, in the order the model issued them
    pub fn tool_uses(&self) -> Vec<&ContentBlock> {
        self.blocks()
            .iter()
            .filter(|block| matches!(block, ContentBlock::ToolUse { .. }))
            .collect()
    }

    pub fn has_tool_uses(&self) -> bool {
        self.blocks()
            .iter()
            .any(|block| matches!(block, ContentBlock::ToolUse { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_user_turn() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text().as_deref(), Some("Hello"));
        assert!(!msg.has_tool_uses());
    }

    #[test]
    fn tool_error_is_flagged() {
        let msg = Message::tool_error("call_1".to_string(), "boom".to_string());
        assert_eq!(msg.role, Role::User);
        assert!(matches!(
            msg.blocks(),
            [ContentBlock::ToolResult { is_error: Some(true), .. }]
        ));
        assert_eq!(msg.text(), None);
    }

    #[test]
    fn text_joins_blocks_and_skips_tool_uses() {
        let msg = Message {
            role: Role::Assistant,
            content: Some(MessageContent::Blocks(vec![
                ContentBlock::Text { text: "first".into() },
                ContentBlock::ToolUse {
                    id: "1".into(),
                    name: "risk_assessment".into(),
                    input: json!({}),
                },
                ContentBlock::Text { text: "second".into() },
            ])),
        };
        assert_eq!(msg.text().as_deref(), Some("first\nsecond"));
        assert_eq!(msg.tool_uses().len(), 1);
    }

    #[test]
    fn tool_result_wire_format() {
        let msg = Message::tool_result("call_7".to_string(), "{}".to_string());
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["content"][0]["type"], "tool_result");
        assert_eq!(json["content"][0]["tool_use_id"], "call_7");
        assert!(json["content"][0].get("is_error").is_none());
    }
}
