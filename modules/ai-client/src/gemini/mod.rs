mod client;
pub(crate) mod types;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::AiError;
use crate::traits::{JsonRequest, JsonResponse, StructuredAgent};

use client::GeminiClient;
use types::*;

// =============================================================================
// Gemini Agent
// =============================================================================

/// Google Gemini `generateContent` agent.
///
/// Ungrounded requests use native JSON mode (`responseMimeType` +
/// `responseSchema`). Grounded requests enable the Google Search tool, which
/// the API does not allow together with JSON mode, so the schema is appended
/// to the prompt instead and the caller must tolerate prose around the JSON.
#[derive(Clone)]
pub struct Gemini {
    api_key: String,
    pub(crate) model: String,
    base_url: Option<String>,
    http: reqwest::Client,
}

impl Gemini {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            http: reqwest::Client::new(),
        }
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self, AiError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| AiError::Config("GEMINI_API_KEY environment variable not set".into()))?;
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

    fn client(&self) -> GeminiClient {
        let client = GeminiClient::new(&self.api_key, self.http.clone());
        if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        }
    }
}

pub(crate) fn build_request(request: JsonRequest) -> GenerateRequest {
    let JsonRequest {
        system,
        prompt,
        schema,
        gemini_schema,
        grounded,
        temperature,
    } = request;

    if grounded {
        let prompt = format!(
            "{prompt}\n\nRespond ONLY with JSON that matches this JSON schema, with no commentary:\n{schema}"
        );
        return GenerateRequest {
            system_instruction: Some(Content::system(system)),
            contents: vec![Content::user(prompt)],
            tools: vec![Tool {
                google_search: GoogleSearch {},
            }],
            generation_config: GenerationConfig {
                temperature,
                ..Default::default()
            },
        };
    }

    GenerateRequest {
        system_instruction: Some(Content::system(system)),
        contents: vec![Content::user(prompt)],
        tools: Vec::new(),
        generation_config: GenerationConfig {
            temperature,
            response_mime_type: Some("application/json"),
            response_schema: Some(gemini_schema.unwrap_or(schema)),
        },
    }
}

#[async_trait]
impl StructuredAgent for Gemini {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate_json(&self, request: JsonRequest) -> Result<JsonResponse, AiError> {
        let wire = build_request(request);
        let response = self.client().generate(&self.model, &wire).await?;

        if let Some(reason) = response.block_reason() {
            warn!(reason, "Gemini blocked the prompt");
            return Err(AiError::EmptyResponse(format!("prompt blocked: {reason}")));
        }

        let sources = response.sources();
        debug!(
            finish_reason = ?response.finish_reason(),
            sources = sources.len(),
            "Gemini response received"
        );

        let payload = response.text().ok_or_else(|| {
            AiError::EmptyResponse(format!(
                "no text in Gemini response (finish reason: {})",
                response.finish_reason().unwrap_or("unknown")
            ))
        })?;

        Ok(JsonResponse { payload, sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(grounded: bool) -> JsonRequest {
        JsonRequest::new(
            "You find leads.",
            "Find 3 dentists in Brazil.",
            serde_json::json!({"type": ["array", "null"]}),
        )
        .gemini_schema(serde_json::json!({"type": "array"}))
        .grounded(grounded)
    }

    #[test]
    fn ungrounded_request_uses_json_mode() {
        let body = serde_json::to_value(build_request(request(false))).unwrap();

        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "array");
        assert!(body.get("tools").is_none());
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You find leads.");
        assert_eq!(body["contents"][0]["role"], "user");
    }

    #[test]
    fn grounded_request_enables_search_and_inlines_schema() {
        let body = serde_json::to_value(build_request(request(true))).unwrap();

        assert!(body["tools"][0].get("google_search").is_some());
        assert!(body["generationConfig"].get("responseSchema").is_none());
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.starts_with("Find 3 dentists in Brazil."));
        assert!(prompt.contains("Respond ONLY with JSON"));
    }

    #[test]
    fn response_text_and_sources_are_collected() {
        let response: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {"parts": [{"text": "[{\"name\":"}, {"text": "\"Ana\"}]"}]},
                "finishReason": "STOP",
                "groundingMetadata": {
                    "groundingChunks": [
                        {"web": {"uri": "https://clinica.example/equipe", "title": "Equipe"}},
                        {"web": {"uri": "https://clinica.example/equipe", "title": "Dup"}},
                        {"web": {"uri": "https://cro.example/busca"}}
                    ]
                }
            }]
        }))
        .unwrap();

        assert_eq!(response.text().as_deref(), Some("[{\"name\":\"Ana\"}]"));
        let sources = response.sources();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].title, "Equipe");
        assert_eq!(sources[1].title, "https://cro.example/busca");
    }

    #[test]
    fn empty_candidates_have_no_text() {
        let response: GenerateResponse =
            serde_json::from_value(serde_json::json!({"promptFeedback": {"blockReason": "SAFETY"}}))
                .unwrap();

        assert!(response.text().is_none());
        assert_eq!(response.block_reason(), Some("SAFETY"));
    }

    #[test]
    fn with_model_keeps_key() {
        let ai = Gemini::new("g-key", "gemini-2.5-flash").with_model("gemini-2.5-pro");
        assert_eq!(ai.model(), "gemini-2.5-pro");
        assert_eq!(ai.api_key, "g-key");
    }
}
