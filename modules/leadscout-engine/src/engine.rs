//! The acquisition loop and the operator commands around it.
//!
//! One tokio task drives each run: discovery call, commit, delay, repeat.
//! The delay races the run's [`CancellationToken`]; an in-flight discovery
//! call is never aborted, its result is dropped at commit time instead when
//! the run it belongs to is over.
//!
//! Writes to the working set go through one async writer lock. The store is
//! written on the blocking pool outside the state lock, and operator
//! commands only touch memory once the store accepted the change.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use leadscout_common::config::{DEFAULT_ACTIVITY_LOG_CAP, DEFAULT_STOP_SETTLE};
use leadscout_common::{
    Config, EngineStatus, Lead, LeadScoutError, LeadStatus, Mode, SearchCriteria,
};

use crate::activity::{ActivityEntry, ActivityLog};
use crate::discovery::{AcceptancePolicy, DiscoveryClient, LlmDiscovery};
use crate::export::{self, ExportFormat};
use crate::store::{load_or_empty, JsonFileStore, LeadStore, StoreError};
use crate::working_set::{admit, WorkingSet};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] LeadScoutError),

    #[error("engine is {0}, stop it before starting a new run")]
    NotIdle(EngineStatus),

    #[error("engine is not running")]
    NotRunning,

    #[error("lead {0} not found")]
    LeadNotFound(Uuid),

    #[error("cannot move a lead from {from} to {to}")]
    InvalidTransition { from: LeadStatus, to: LeadStatus },

    #[error("clearing all leads requires explicit confirmation")]
    ConfirmationRequired,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub activity_log_cap: usize,
    /// How long `Stopping` lasts before the engine reports idle.
    pub stop_settle: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            activity_log_cap: DEFAULT_ACTIVITY_LOG_CAP,
            stop_settle: DEFAULT_STOP_SETTLE,
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            activity_log_cap: config.activity_log_cap,
            stop_settle: config.stop_settle,
        }
    }
}

/// Point-in-time view of the engine for dashboards and the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub status: EngineStatus,
    pub epoch: u64,
    pub criteria: Option<SearchCriteria>,
    pub lead_count: usize,
    /// Cycles committed in the current (or last) run.
    pub cycles: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

struct EngineState {
    status: EngineStatus,
    epoch: u64,
    criteria: Option<SearchCriteria>,
    cancel: Option<CancellationToken>,
    leads: WorkingSet,
    activity: ActivityLog,
    cycles: u64,
    last_cycle_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
    /// Leads merged by a cycle whose save failed.
    unsaved: bool,
}

impl EngineState {
    /// Whether work tagged with `epoch` may still commit.
    fn is_current(&self, epoch: u64) -> bool {
        self.status == EngineStatus::Running && self.epoch == epoch
    }
}

struct Shared {
    discovery: DiscoveryClient,
    store: Arc<dyn LeadStore>,
    settings: EngineSettings,
    state: Mutex<EngineState>,
    writer: tokio::sync::Mutex<()>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn persist(&self, leads: Vec<Lead>) -> Result<(), StoreError> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.save(&leads))
            .await
            .map_err(|e| StoreError::Interrupted(e.to_string()))?
    }

    async fn wipe(&self) -> Result<(), StoreError> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.clear())
            .await
            .map_err(|e| StoreError::Interrupted(e.to_string()))?
    }
}

/// Cloneable handle to the acquisition engine.
#[derive(Clone)]
pub struct AcquisitionEngine {
    shared: Arc<Shared>,
}

impl AcquisitionEngine {
    /// Build an engine and load the working set from `store`. A corrupt
    /// store is logged and replaced by an empty set.
    pub fn new(
        discovery: DiscoveryClient,
        store: Arc<dyn LeadStore>,
        settings: EngineSettings,
    ) -> Result<Self, EngineError> {
        let leads = WorkingSet::from_leads(load_or_empty(store.as_ref())?);
        info!(leads = leads.len(), "Working set loaded");

        let state = EngineState {
            status: EngineStatus::Idle,
            epoch: 0,
            criteria: None,
            cancel: None,
            leads,
            activity: ActivityLog::new(settings.activity_log_cap),
            cycles: 0,
            last_cycle_at: None,
            last_error: None,
            unsaved: false,
        };

        Ok(Self {
            shared: Arc::new(Shared {
                discovery,
                store,
                settings,
                state: Mutex::new(state),
                writer: tokio::sync::Mutex::new(()),
            }),
        })
    }

    /// Production wiring: hosted model discovery and `{DATA_DIR}/leads.json`.
    pub fn from_config(config: &Config) -> Result<Self, EngineError> {
        let discovery = DiscoveryClient::new(
            Arc::new(LlmDiscovery::from_config(config)),
            AcceptancePolicy::from_config(config),
        );
        let store = Arc::new(JsonFileStore::new(&config.data_dir));
        Self::new(discovery, store, EngineSettings::from_config(config))
    }

    // -----------------------------------------------------------------------
    // Run control
    // -----------------------------------------------------------------------

    /// Begin a run. Must be called from within a tokio runtime.
    ///
    /// Returns the new run's epoch.
    pub fn start(&self, niche: &str, country: &str, mode: Mode) -> Result<u64, EngineError> {
        let criteria = SearchCriteria::new(niche, country, mode)?;

        let mut state = self.shared.lock();
        if state.status != EngineStatus::Idle {
            return Err(EngineError::NotIdle(state.status));
        }

        state.epoch += 1;
        let epoch = state.epoch;
        let cancel = CancellationToken::new();
        state.status = EngineStatus::Running;
        state.cancel = Some(cancel.clone());
        state.cycles = 0;
        state.last_error = None;
        state.activity.info(format!(
            "Engine started: {} in {} ({} mode)",
            criteria.niche,
            display_country(&criteria.country),
            criteria.mode
        ));
        info!(epoch, niche = %criteria.niche, country = %criteria.country, mode = %criteria.mode, "Acquisition run started");
        state.criteria = Some(criteria);
        drop(state);

        tokio::spawn(run_loop(self.shared.clone(), epoch, cancel));
        Ok(epoch)
    }

    /// Stop the current run. The pending cycle is revoked immediately; the
    /// engine reports `Stopping` until the settle delay elapses.
    pub fn stop(&self) -> Result<(), EngineError> {
        let mut state = self.shared.lock();
        if state.status != EngineStatus::Running {
            return Err(EngineError::NotRunning);
        }

        state.status = EngineStatus::Stopping;
        if let Some(cancel) = state.cancel.take() {
            cancel.cancel();
        }
        state.activity.info("Stop requested");
        let epoch = state.epoch;
        info!(epoch, cycles = state.cycles, "Acquisition run stopping");
        drop(state);

        let shared = self.shared.clone();
        tokio::spawn(async move {
            tokio::time::sleep(shared.settings.stop_settle).await;
            let mut state = shared.lock();
            if state.status == EngineStatus::Stopping && state.epoch == epoch {
                state.status = EngineStatus::Idle;
                state.activity.info("Operation finished");
                info!(epoch, "Engine idle");
            }
        });
        Ok(())
    }

    pub fn status(&self) -> EngineStatus {
        self.shared.lock().status
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let state = self.shared.lock();
        EngineSnapshot {
            status: state.status,
            epoch: state.epoch,
            criteria: state.criteria.clone(),
            lead_count: state.leads.len(),
            cycles: state.cycles,
            last_cycle_at: state.last_cycle_at,
            last_error: state.last_error.clone(),
        }
    }

    pub fn activity(&self) -> Vec<ActivityEntry> {
        self.shared.lock().activity.entries()
    }

    // -----------------------------------------------------------------------
    // Working set commands
    // -----------------------------------------------------------------------

    /// Newest first, optionally filtered by name, company or phone.
    pub fn leads(&self, filter: Option<&str>) -> Vec<Lead> {
        self.shared.lock().leads.list(filter)
    }

    pub fn lead(&self, id: Uuid) -> Result<Lead, EngineError> {
        self.shared
            .lock()
            .leads
            .get(id)
            .cloned()
            .ok_or(EngineError::LeadNotFound(id))
    }

    pub async fn delete_record(&self, id: Uuid) -> Result<Lead, EngineError> {
        let _writer = self.shared.writer.lock().await;
        let (lead, next) = {
            let state = self.shared.lock();
            let mut next = state.leads.clone();
            let lead = next.remove(id).ok_or(EngineError::LeadNotFound(id))?;
            (lead, next)
        };

        self.commit(next).await?;
        info!(%id, name = %lead.name, "Lead deleted");
        Ok(lead)
    }

    /// Move a lead along the status lattice. Re-applying the current status
    /// is a no-op.
    pub async fn set_status(&self, id: Uuid, status: LeadStatus) -> Result<Lead, EngineError> {
        let _writer = self.shared.writer.lock().await;
        let (current, mut next) = {
            let state = self.shared.lock();
            let lead = state.leads.get(id).ok_or(EngineError::LeadNotFound(id))?;
            if lead.status == status {
                return Ok(lead.clone());
            }
            (lead.status, state.leads.clone())
        };

        if !current.can_transition_to(status) {
            return Err(EngineError::InvalidTransition {
                from: current,
                to: status,
            });
        }
        next.set_status(id, status);
        let lead = next.get(id).cloned().ok_or(EngineError::LeadNotFound(id))?;

        self.commit(next).await?;
        info!(%id, from = %current, to = %status, "Lead status changed");
        Ok(lead)
    }

    /// Empty the store, then the working set. Returns how many leads were dropped.
    pub async fn clear_all(&self, confirmed: bool) -> Result<usize, EngineError> {
        if !confirmed {
            return Err(EngineError::ConfirmationRequired);
        }
        let _writer = self.shared.writer.lock().await;
        self.shared.wipe().await?;

        let mut state = self.shared.lock();
        let dropped = state.leads.len();
        state.leads.clear();
        state.unsaved = false;
        state.activity.warning(format!("Cleared {dropped} leads"));
        info!(dropped, "Working set cleared");
        Ok(dropped)
    }

    /// Save `next` and make it the working set. Caller holds the writer lock.
    async fn commit(&self, next: WorkingSet) -> Result<(), EngineError> {
        self.shared.persist(next.as_slice().to_vec()).await?;
        let mut state = self.shared.lock();
        state.leads = next;
        state.unsaved = false;
        Ok(())
    }

    pub fn export(&self, format: ExportFormat) -> String {
        let leads = self.shared.lock().leads.list(None);
        export::render(format, &leads)
    }
}

fn display_country(country: &str) -> &str {
    if country.is_empty() {
        "any country"
    } else {
        country
    }
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

async fn run_loop(shared: Arc<Shared>, epoch: u64, cancel: CancellationToken) {
    loop {
        let Some(delay) = run_cycle(&shared, epoch).await else {
            break;
        };
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }
    debug!(epoch, "Acquisition loop exited");
}

/// One cycle. Returns the delay before the next one, or `None` when the run
/// this cycle belongs to is over.
async fn run_cycle(shared: &Shared, epoch: u64) -> Option<Duration> {
    let criteria = {
        let mut state = shared.lock();
        if !state.is_current(epoch) {
            return None;
        }
        let criteria = state.criteria.clone()?;
        state.activity.info(format!(
            "Scanning for {} leads in {}",
            criteria.niche,
            display_country(&criteria.country)
        ));
        criteria
    };

    let result = shared.discovery.discover(&criteria).await;

    let _writer = shared.writer.lock().await;
    let (delay, pending) = {
        let mut state = shared.lock();
        if !state.is_current(epoch) {
            debug!(epoch, "Run ended during discovery call, result discarded");
            return None;
        }
        state.cycles += 1;
        state.last_cycle_at = Some(Utc::now());

        match result {
            Ok(discovery) => {
                let accepted = discovery.accepted.len();
                let now = Utc::now();
                let batch = discovery
                    .accepted
                    .into_iter()
                    .map(|candidate| admit(candidate, &criteria, now))
                    .collect();
                let outcome = state.leads.merge(batch);

                if accepted > 0 {
                    state
                        .activity
                        .success(format!("{accepted} verified leads, {} new", outcome.added));
                } else {
                    state.activity.warning("No verified leads this cycle");
                }

                info!(
                    epoch,
                    accepted,
                    rejected = discovery.rejected,
                    added = outcome.added,
                    duplicates = outcome.duplicates,
                    total = state.leads.len(),
                    "Cycle complete"
                );

                let pending = (outcome.added > 0 || state.unsaved)
                    .then(|| state.leads.as_slice().to_vec());
                (criteria.mode.success_delay(), pending)
            }
            Err(e) => {
                warn!(epoch, error = %e, "Discovery failed, backing off");
                state.activity.error(e.to_string());
                state.last_error = Some(e.to_string());
                (criteria.mode.failure_backoff(), None)
            }
        }
    };

    if let Some(leads) = pending {
        let saved = shared.persist(leads).await;
        let mut state = shared.lock();
        match saved {
            Ok(()) => state.unsaved = false,
            Err(e) => {
                warn!(epoch, error = %e, "Failed to persist working set");
                state.activity.error(format!("Failed to save leads: {e}"));
                state.last_error = Some(e.to_string());
                state.unsaved = true;
            }
        }
    }

    Some(delay)
}
