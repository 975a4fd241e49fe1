use ai_client::{
    Claude, Gemini, GroundingSource, JsonRequest, StructuredAgent, StructuredOutput,
};
use async_trait::async_trait;
use tracing::{info, warn};

use leadscout_common::{Config, Mode, ProviderKind, SearchCriteria};

use super::prompt::{build_prompt, SYSTEM_PROMPT};
use super::{parse_candidates, CandidateSource, DiscoveryBatch, DiscoveryError, DiscoveryProvider, RawCandidate};

#[derive(Clone)]
enum Backend {
    Gemini(Gemini),
    Claude(Claude),
}

/// Discovery backed by a hosted model. The model is picked per call from the
/// criteria's mode.
#[derive(Clone)]
pub struct LlmDiscovery {
    backend: Backend,
}

impl LlmDiscovery {
    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self {
            backend: Backend::Gemini(Gemini::new(api_key, Mode::default().gemini_model())),
        }
    }

    pub fn claude(api_key: impl Into<String>) -> Self {
        Self {
            backend: Backend::Claude(Claude::new(api_key, Mode::default().claude_model())),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        match config.provider {
            ProviderKind::Gemini => Self::gemini(config.provider_api_key.clone()),
            ProviderKind::Claude => Self::claude(config.provider_api_key.clone()),
        }
    }

    /// Point the underlying client at another host (mock servers, proxies).
    pub fn with_base_url(self, url: impl Into<String>) -> Self {
        let backend = match self.backend {
            Backend::Gemini(g) => Backend::Gemini(g.with_base_url(url)),
            Backend::Claude(c) => Backend::Claude(c.with_base_url(url)),
        };
        Self { backend }
    }

    fn agent_for(&self, mode: Mode) -> Box<dyn StructuredAgent> {
        match &self.backend {
            Backend::Gemini(g) => Box::new(g.with_model(mode.gemini_model())),
            Backend::Claude(c) => Box::new(c.with_model(mode.claude_model())),
        }
    }
}

#[async_trait]
impl DiscoveryProvider for LlmDiscovery {
    async fn fetch(&self, criteria: &SearchCriteria) -> Result<Vec<RawCandidate>, DiscoveryError> {
        let agent = self.agent_for(criteria.mode);
        let request = JsonRequest::new(
            SYSTEM_PROMPT,
            build_prompt(criteria),
            DiscoveryBatch::tool_schema(),
        )
        .gemini_schema(DiscoveryBatch::gemini_schema())
        .grounded(criteria.mode.grounded());

        let response = agent.generate_json(request).await?;
        let mut candidates = parse_candidates(&response.payload)?;

        if candidates.len() > criteria.mode.lead_count() {
            warn!(
                returned = candidates.len(),
                requested = criteria.mode.lead_count(),
                "Model returned more leads than requested"
            );
        }

        attach_grounding(&mut candidates, &response.sources);

        info!(
            model = agent.model(),
            niche = %criteria.niche,
            country = %criteria.country,
            candidates = candidates.len(),
            grounding_sources = response.sources.len(),
            "Discovery call complete"
        );

        Ok(candidates)
    }
}

/// Candidates that cite nothing themselves inherit the batch's grounding pages.
fn attach_grounding(candidates: &mut [RawCandidate], sources: &[GroundingSource]) {
    if sources.is_empty() {
        return;
    }
    for candidate in candidates.iter_mut().filter(|c| c.sources.is_empty()) {
        candidate.sources = sources
            .iter()
            .map(|s| CandidateSource {
                title: Some(s.title.clone()),
                url: s.url.clone(),
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, sources: Vec<CandidateSource>) -> RawCandidate {
        RawCandidate {
            name: name.to_string(),
            company: None,
            headline: None,
            email: None,
            phone_number: None,
            email_subject: None,
            localized_pitch: None,
            integrity: 90.0,
            sources,
        }
    }

    #[test]
    fn grounding_fills_only_sourceless_candidates() {
        let own = CandidateSource {
            title: None,
            url: "https://clinica.example/equipe".to_string(),
        };
        let mut candidates = vec![candidate("Ana", vec![own.clone()]), candidate("Bruno", vec![])];
        let grounding = vec![GroundingSource {
            title: "Diretório CRO".to_string(),
            url: "https://cro.example/busca".to_string(),
        }];

        attach_grounding(&mut candidates, &grounding);

        assert_eq!(candidates[0].sources, vec![own]);
        assert_eq!(candidates[1].sources.len(), 1);
        assert_eq!(candidates[1].sources[0].url, "https://cro.example/busca");
    }

    #[test]
    fn response_schema_is_an_object_with_leads() {
        let schema = DiscoveryBatch::tool_schema();
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"]["leads"].is_object());
    }
}
