mod client;
pub(crate) mod types;

use async_trait::async_trait;
use tracing::debug;

use crate::error::AiError;
use crate::traits::{JsonRequest, JsonResponse, StructuredAgent};

use client::ClaudeClient;
use types::{MessagesRequest, Tool};

const TOOL_NAME: &str = "structured_response";

// =============================================================================
// Claude Agent
// =============================================================================

/// Anthropic Messages API agent.
///
/// Structured output is obtained by registering a single tool whose input
/// schema is the requested schema and forcing the model to call it. Claude has
/// no built-in web search here, so grounded requests are answered from the
/// model's own knowledge.
#[derive(Clone)]
pub struct Claude {
    api_key: String,
    pub(crate) model: String,
    base_url: Option<String>,
    http: reqwest::Client,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            http: reqwest::Client::new(),
        }
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self, AiError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| AiError::Config("ANTHROPIC_API_KEY environment variable not set".into()))?;
        Ok(Self::new(api_key, model))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Same credentials, different model. Shares the HTTP connection pool.
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }

    fn client(&self) -> ClaudeClient<'_> {
        ClaudeClient::new(&self.api_key, &self.http, self.base_url.as_deref())
    }
}

#[async_trait]
impl StructuredAgent for Claude {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate_json(&self, request: JsonRequest) -> Result<JsonResponse, AiError> {
        let mut body = MessagesRequest::forced(
            &self.model,
            request.system,
            request.prompt,
            Tool {
                name: TOOL_NAME,
                description: "Return the requested records.",
                input_schema: request.schema,
            },
        );
        body.temperature = request.temperature;

        let response = self.client().messages(&body).await?;
        debug!(stop_reason = ?response.stop_reason, "Claude response received");

        if let Some(input) = response.tool_input(TOOL_NAME) {
            return Ok(JsonResponse {
                payload: input.to_string(),
                sources: Vec::new(),
            });
        }

        // A model that ignores tool_choice still occasionally answers in text.
        match response.text() {
            Some(text) => Ok(JsonResponse {
                payload: text,
                sources: Vec::new(),
            }),
            None => Err(AiError::EmptyResponse(
                "no structured output in Claude response".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_model_keeps_credentials() {
        let ai = Claude::new("sk-ant-test", "claude-haiku-4-5-20251001")
            .with_base_url("https://proxy.internal");
        let bigger = ai.with_model("claude-sonnet-4-5-20250929");

        assert_eq!(bigger.model(), "claude-sonnet-4-5-20250929");
        assert_eq!(bigger.api_key, "sk-ant-test");
        assert_eq!(bigger.base_url.as_deref(), Some("https://proxy.internal"));
    }

    #[test]
    fn forced_request_names_the_tool() {
        let request = MessagesRequest::forced(
            "claude-haiku-4-5-20251001",
            String::new(),
            "find leads".to_string(),
            Tool {
                name: TOOL_NAME,
                description: "test",
                input_schema: serde_json::json!({"type": "object"}),
            },
        );
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["tool_choice"], serde_json::json!({"type": "tool", "name": TOOL_NAME}));
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
        assert_eq!(body["messages"][0]["role"], "user");
        assert!(body.get("system").is_none());
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn tool_input_is_found_among_blocks() {
        let response: types::MessagesResponse = serde_json::from_value(serde_json::json!({
            "content": [
                {"type": "text", "text": "Searching..."},
                {"type": "server_tool_use", "id": "st_1"},
                {"type": "tool_use", "id": "tu_1", "name": TOOL_NAME, "input": {"leads": []}}
            ],
            "stop_reason": "tool_use"
        }))
        .unwrap();

        assert_eq!(
            response.tool_input(TOOL_NAME),
            Some(&serde_json::json!({"leads": []}))
        );
        assert_eq!(response.text().as_deref(), Some("Searching..."));
    }
}
