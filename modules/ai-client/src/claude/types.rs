//! Anthropic Messages API wire types, limited to what forced-tool JSON
//! extraction needs.

use serde::{Deserialize, Serialize};

pub(crate) const MAX_TOKENS: u32 = 8192;

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Message {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Tool {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ToolChoice {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub system: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub tools: Vec<Tool>,
    pub tool_choice: ToolChoice,
}

impl MessagesRequest {
    /// A single-turn request that must be answered by calling `tool`.
    pub fn forced(model: &str, system: String, prompt: String, tool: Tool) -> Self {
        Self {
            model: model.to_string(),
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            temperature: None,
            tool_choice: ToolChoice {
                kind: "tool",
                name: tool.name,
            },
            tools: vec![tool],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum Block {
    Text { text: String },
    ToolUse { name: String, input: serde_json::Value },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MessagesResponse {
    pub content: Vec<Block>,
    pub stop_reason: Option<String>,
}

impl MessagesResponse {
    /// Input of the first call to `tool`, if the model made one.
    pub fn tool_input(&self, tool: &str) -> Option<&serde_json::Value> {
        self.content.iter().find_map(|block| match block {
            Block::ToolUse { name, input } if name == tool => Some(input),
            _ => None,
        })
    }

    /// Concatenated text blocks.
    pub fn text(&self) -> Option<String> {
        let text: Vec<&str> = self
            .content
            .iter()
            .filter_map(|block| match block {
                Block::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        (!text.is_empty()).then(|| text.join(""))
    }
}
