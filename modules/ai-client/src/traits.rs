use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AiError;

// =============================================================================
// Request / Response
// =============================================================================

/// A request for a single JSON document shaped by `schema`.
#[derive(Debug, Clone)]
pub struct JsonRequest {
    pub system: String,
    pub prompt: String,
    /// Plain JSON schema (see [`crate::StructuredOutput::tool_schema`]).
    pub schema: serde_json::Value,
    /// Schema in Gemini's OpenAPI subset. Ignored by providers that take `schema`.
    pub gemini_schema: Option<serde_json::Value>,
    /// Let the provider consult live web search while answering.
    pub grounded: bool,
    pub temperature: Option<f32>,
}

impl JsonRequest {
    pub fn new(
        system: impl Into<String>,
        prompt: impl Into<String>,
        schema: serde_json::Value,
    ) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            schema,
            gemini_schema: None,
            grounded: false,
            temperature: None,
        }
    }

    pub fn gemini_schema(mut self, schema: serde_json::Value) -> Self {
        self.gemini_schema = Some(schema);
        self
    }

    pub fn grounded(mut self, grounded: bool) -> Self {
        self.grounded = grounded;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A web page the provider cited while grounding its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub title: String,
    pub url: String,
}

/// Raw model output. `payload` is untrusted text that should contain JSON.
#[derive(Debug, Clone, Default)]
pub struct JsonResponse {
    pub payload: String,
    pub sources: Vec<GroundingSource>,
}

// =============================================================================
// StructuredAgent Trait
// =============================================================================

#[async_trait]
pub trait StructuredAgent: Send + Sync {
    fn model(&self) -> &str;

    async fn generate_json(&self, request: JsonRequest) -> Result<JsonResponse, AiError>;
}
