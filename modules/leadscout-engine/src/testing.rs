// Test mocks and helpers for the acquisition engine.
//
// - MockProvider (DiscoveryProvider): scripted responses, records call
//   instants, optional gate that holds each call in flight until released.
// - MemoryStore lives in `store` and is re-exported here.
// - candidate(), engine_with(), wait_until() keep tests short.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ai_client::AiError;
use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use leadscout_common::SearchCriteria;

use crate::discovery::{
    AcceptancePolicy, DiscoveryClient, DiscoveryError, DiscoveryProvider, RawCandidate,
};
use crate::engine::{AcquisitionEngine, EngineSettings};
pub use crate::store::MemoryStore;

// ---------------------------------------------------------------------------
// Candidates
// ---------------------------------------------------------------------------

/// A well-formed candidate with a Portuguese pitch.
pub fn candidate(name: &str, phone: &str, integrity: f64) -> RawCandidate {
    RawCandidate {
        name: name.to_string(),
        company: Some(format!("{name} Odontologia")),
        headline: Some("Diretora Clínica".to_string()),
        email: None,
        phone_number: Some(phone.to_string()),
        email_subject: Some("Agenda cheia em 30 dias".to_string()),
        localized_pitch: Some(format!("Olá {name}, podemos conversar 15 minutos?")),
        integrity,
        sources: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// MockProvider
// ---------------------------------------------------------------------------

enum Reply {
    Leads(Vec<RawCandidate>),
    Fail(String),
}

/// Scripted discovery provider. Replies are consumed in order; once the
/// script runs out every call returns an empty batch.
#[derive(Default)]
pub struct MockProvider {
    script: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<(Instant, SearchCriteria)>>,
    gate: Option<Arc<Semaphore>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_leads(self, leads: Vec<RawCandidate>) -> Self {
        self.push(Reply::Leads(leads));
        self
    }

    pub fn then_fail(self, message: &str) -> Self {
        self.push(Reply::Fail(message.to_string()));
        self
    }

    /// Every call waits for one permit on `gate` before replying.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    fn push(&self, reply: Reply) {
        self.script.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// When each call started, on tokio's clock.
    pub fn call_instants(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    pub fn last_criteria(&self) -> Option<SearchCriteria> {
        self.calls.lock().unwrap().last().map(|(_, c)| c.clone())
    }
}

#[async_trait]
impl DiscoveryProvider for MockProvider {
    async fn fetch(&self, criteria: &SearchCriteria) -> Result<Vec<RawCandidate>, DiscoveryError> {
        self.calls
            .lock()
            .unwrap()
            .push((Instant::now(), criteria.clone()));

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .expect("mock gate closed")
                .forget();
        }

        let reply = self.script.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Leads(leads)) => Ok(leads),
            Some(Reply::Fail(message)) => Err(DiscoveryError::Remote(AiError::Network(message))),
            None => Ok(Vec::new()),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine helpers
// ---------------------------------------------------------------------------

/// Engine over a mock provider and memory store, default policy and settings.
pub fn engine_with(provider: Arc<MockProvider>, store: Arc<MemoryStore>) -> AcquisitionEngine {
    engine_with_settings(provider, store, EngineSettings::default())
}

pub fn engine_with_settings(
    provider: Arc<MockProvider>,
    store: Arc<MemoryStore>,
    settings: EngineSettings,
) -> AcquisitionEngine {
    let discovery = DiscoveryClient::new(provider, AcceptancePolicy::default());
    AcquisitionEngine::new(discovery, store, settings).expect("memory store never fails")
}

/// Poll `condition` every 10ms of tokio time, panicking after `limit`.
pub async fn wait_until(limit: Duration, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + limit;
    while !condition() {
        if Instant::now() >= deadline {
            panic!("condition not met within {limit:?}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
