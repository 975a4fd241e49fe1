//! Durable storage for the working set.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use leadscout_common::Lead;

pub const LEADS_FILE: &str = "leads.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("stored leads are corrupt: {0}")]
    Corrupt(String),

    #[error("failed to serialize leads: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("storage task did not complete: {0}")]
    Interrupted(String),
}

/// Whole-collection persistence. Every save replaces what was stored.
pub trait LeadStore: Send + Sync {
    fn load(&self) -> Result<Vec<Lead>, StoreError>;
    fn save(&self, leads: &[Lead]) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

/// Load for engine startup: a corrupt store is logged and treated as empty.
pub fn load_or_empty(store: &dyn LeadStore) -> Result<Vec<Lead>, StoreError> {
    match store.load() {
        Ok(leads) => Ok(leads),
        Err(StoreError::Corrupt(reason)) => {
            warn!(%reason, "Stored leads are corrupt, starting with an empty working set");
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// JsonFileStore (production)
// ---------------------------------------------------------------------------

/// One JSON array in `{dir}/leads.json`, rewritten through a temp file and
/// an atomic rename.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(LEADS_FILE)
    }

    fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
        move |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl LeadStore for JsonFileStore {
    fn load(&self) -> Result<Vec<Lead>, StoreError> {
        let path = self.path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Self::io_err(&path)(e)),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt(format!("{}: {e}", path.display())))
    }

    fn save(&self, leads: &[Lead]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(Self::io_err(&self.dir))?;
        let json = serde_json::to_vec_pretty(leads)?;

        let path = self.path();
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(Self::io_err(&self.dir))?;
        tmp.write_all(&json).map_err(Self::io_err(&path))?;
        tmp.as_file().sync_all().map_err(Self::io_err(&path))?;
        tmp.persist(&path).map_err(|e| StoreError::Io {
            path: path.clone(),
            source: e.error,
        })?;

        debug!(path = %path.display(), leads = leads.len(), "Leads saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let path = self.path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_err(&path)(e)),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryStore (tests)
// ---------------------------------------------------------------------------

/// In-memory store. Counts saves so tests can assert persistence points,
/// and can be switched into failing every write.
#[derive(Default)]
pub struct MemoryStore {
    leads: Mutex<Option<Vec<Lead>>>,
    corrupt: bool,
    failing: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_leads(leads: Vec<Lead>) -> Self {
        Self {
            leads: Mutex::new(Some(leads)),
            ..Self::default()
        }
    }

    /// A store whose content fails to parse on load.
    pub fn corrupt() -> Self {
        Self {
            corrupt: true,
            ..Self::default()
        }
    }

    /// What the last save wrote (empty if nothing was saved or it was cleared).
    pub fn stored(&self) -> Vec<Lead> {
        self.leads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_default()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// While set, `save` and `clear` fail and leave the content untouched.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Io {
                path: PathBuf::from("memory"),
                source: std::io::Error::other("disk full"),
            });
        }
        Ok(())
    }
}

impl LeadStore for MemoryStore {
    fn load(&self) -> Result<Vec<Lead>, StoreError> {
        if self.corrupt {
            return Err(StoreError::Corrupt("memory store marked corrupt".to_string()));
        }
        Ok(self.stored())
    }

    fn save(&self, leads: &[Lead]) -> Result<(), StoreError> {
        self.check_writable()?;
        *self.leads.lock().unwrap_or_else(PoisonError::into_inner) = Some(leads.to_vec());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.check_writable()?;
        *self.leads.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
