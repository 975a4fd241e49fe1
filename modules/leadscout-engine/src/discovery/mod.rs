//! Discovery: turning one remote model call into a list of plausible candidates.
//!
//! The remote service is an untrusted oracle. [`DiscoveryProvider`] is the
//! seam where its output enters the system; [`DiscoveryClient`] applies the
//! [`AcceptancePolicy`] before anything reaches the working set.

pub mod llm;
pub mod policy;
pub mod prompt;

use std::sync::Arc;

use ai_client::{extract_json_text, truncate_to_char_boundary, AiError};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use leadscout_common::SearchCriteria;

pub use llm::LlmDiscovery;
pub use policy::{AcceptancePolicy, Rejection};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A failed discovery call. Never partial: any of these discards the whole batch.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("discovery failed: remote call error: {0}")]
    Remote(#[from] AiError),

    #[error("discovery failed: response is not JSON: {0}")]
    Malformed(String),

    #[error("discovery failed: response does not match the lead schema: {0}")]
    Schema(String),
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// A web page the model cited for a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CandidateSource {
    pub title: Option<String>,
    pub url: String,
}

/// One unvalidated lead as returned by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawCandidate {
    /// Real full name of the decision-maker.
    pub name: String,
    /// Company the person works for.
    #[serde(default)]
    pub company: Option<String>,
    /// Role or professional headline.
    #[serde(default)]
    pub headline: Option<String>,
    /// Professional e-mail address.
    #[serde(default)]
    pub email: Option<String>,
    /// Phone number, digits only, country code first (e.g. 5511...).
    #[serde(default, deserialize_with = "deserialize_phone")]
    pub phone_number: Option<String>,
    /// Attention-grabbing e-mail subject in the country's language.
    #[serde(default)]
    pub email_subject: Option<String>,
    /// Outreach script in the country's language.
    #[serde(default)]
    pub localized_pitch: Option<String>,
    /// 0-100 certainty that this contact was verified against real sources.
    #[serde(deserialize_with = "deserialize_score")]
    pub integrity: f64,
    /// Pages that back this contact.
    #[serde(default)]
    pub sources: Vec<CandidateSource>,
}

/// Object wrapper used as the response schema. Some providers (Claude tool
/// input) require the top level to be an object.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DiscoveryBatch {
    pub leads: Vec<RawCandidate>,
}

/// Models sometimes emit phone numbers as JSON numbers.
fn deserialize_phone<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) => Ok(Some(s)),
        serde_json::Value::Number(n) => Ok(Some(n.to_string())),
        _ => Err(de::Error::custom("phoneNumber must be a string")),
    }
}

/// Accept `96`, `96.5` or `"96"`.
fn deserialize_score<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| de::Error::custom("integrity is not a finite number")),
        serde_json::Value::String(s) => s
            .trim()
            .trim_end_matches('%')
            .parse()
            .map_err(|_| de::Error::custom(format!("integrity '{s}' is not a number"))),
        _ => Err(de::Error::custom("integrity must be a number")),
    }
}

/// Parse the model's raw text into candidates.
///
/// Accepts a bare array, `{"leads": [...]}`, a JSON string holding either of
/// those, and any of them wrapped in prose or code fences. A single entry
/// that violates the schema fails the whole batch.
pub fn parse_candidates(payload: &str) -> Result<Vec<RawCandidate>, DiscoveryError> {
    let text = extract_json_text(payload);
    let value: serde_json::Value = serde_json::from_str(text).map_err(|e| {
        DiscoveryError::Malformed(format!(
            "{e} (payload starts with: {:?})",
            truncate_to_char_boundary(text, 120)
        ))
    })?;
    candidates_from_value(value, true)
}

fn candidates_from_value(
    value: serde_json::Value,
    allow_string: bool,
) -> Result<Vec<RawCandidate>, DiscoveryError> {
    match value {
        serde_json::Value::Array(_) => {
            serde_json::from_value(value).map_err(|e| DiscoveryError::Schema(e.to_string()))
        }
        serde_json::Value::Object(mut map) => match map.remove("leads") {
            Some(inner) => candidates_from_value(inner, allow_string),
            None => Err(DiscoveryError::Schema(
                "object response has no 'leads' array".to_string(),
            )),
        },
        serde_json::Value::String(s) if allow_string => {
            let inner: serde_json::Value = serde_json::from_str(extract_json_text(&s))
                .map_err(|e| DiscoveryError::Malformed(e.to_string()))?;
            candidates_from_value(inner, false)
        }
        serde_json::Value::Null => Ok(Vec::new()),
        other => Err(DiscoveryError::Schema(format!(
            "expected an array of leads, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Provider seam
// ---------------------------------------------------------------------------

#[async_trait]
pub trait DiscoveryProvider: Send + Sync {
    /// Ask the remote service for candidates matching `criteria`.
    async fn fetch(&self, criteria: &SearchCriteria) -> Result<Vec<RawCandidate>, DiscoveryError>;
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Candidates that survived the acceptance policy.
#[derive(Debug, Default)]
pub struct Discovery {
    pub accepted: Vec<RawCandidate>,
    pub rejected: usize,
}

/// Stateless wrapper: provider call plus acceptance filtering.
#[derive(Clone)]
pub struct DiscoveryClient {
    provider: Arc<dyn DiscoveryProvider>,
    policy: AcceptancePolicy,
}

impl DiscoveryClient {
    pub fn new(provider: Arc<dyn DiscoveryProvider>, policy: AcceptancePolicy) -> Self {
        Self { provider, policy }
    }

    pub fn policy(&self) -> &AcceptancePolicy {
        &self.policy
    }

    /// Fetch and filter. An empty `accepted` list is a normal outcome.
    pub async fn discover(&self, criteria: &SearchCriteria) -> Result<Discovery, DiscoveryError> {
        let candidates = self.provider.fetch(criteria).await?;

        let mut discovery = Discovery::default();
        for candidate in candidates {
            match self.policy.evaluate(&candidate) {
                Ok(()) => discovery.accepted.push(candidate),
                Err(reason) => {
                    debug!(name = %candidate.name, %reason, "Candidate rejected");
                    discovery.rejected += 1;
                }
            }
        }
        Ok(discovery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_array_with_optional_fields_missing() {
        let payload = r#"[{"name": "Ana Souza", "phoneNumber": "5511988887777", "integrity": 96}]"#;
        let candidates = parse_candidates(payload).unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "Ana Souza");
        assert_eq!(candidates[0].company, None);
        assert!(candidates[0].sources.is_empty());
    }

    #[test]
    fn parses_wrapped_and_fenced_responses() {
        let wrapped = r#"{"leads": [{"name": "Ana Souza", "integrity": 90}]}"#;
        assert_eq!(parse_candidates(wrapped).unwrap().len(), 1);

        let fenced = "Found these:\n```json\n[{\"name\": \"Ana Souza\", \"integrity\": 90}]\n```";
        assert_eq!(parse_candidates(fenced).unwrap().len(), 1);
    }

    #[test]
    fn parses_stringified_array() {
        let payload = r#"{"leads": "[{\"name\": \"Ana Souza\", \"integrity\": 90}]"}"#;
        assert_eq!(parse_candidates(payload).unwrap().len(), 1);
    }

    #[test]
    fn tolerates_numeric_phone_and_string_score() {
        let payload = r#"[{"name": "Ana Souza", "phoneNumber": 5511988887777, "integrity": "88%"}]"#;
        let candidates = parse_candidates(payload).unwrap();

        assert_eq!(candidates[0].phone_number.as_deref(), Some("5511988887777"));
        assert_eq!(candidates[0].integrity, 88.0);
    }

    #[test]
    fn one_invalid_entry_rejects_the_batch() {
        let payload = r#"[
            {"name": "Ana Souza", "integrity": 96},
            {"company": "No Name Ltda", "integrity": 91}
        ]"#;
        assert!(matches!(parse_candidates(payload), Err(DiscoveryError::Schema(_))));
    }

    #[test]
    fn non_json_is_malformed() {
        assert!(matches!(
            parse_candidates("I could not find any verified leads, sorry."),
            Err(DiscoveryError::Malformed(_))
        ));
    }

    #[test]
    fn scalar_response_is_a_schema_violation() {
        assert!(matches!(parse_candidates("42"), Err(DiscoveryError::Schema(_))));
    }

    #[test]
    fn null_response_is_empty() {
        assert!(parse_candidates("null").unwrap().is_empty());
    }
}
