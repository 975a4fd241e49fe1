pub mod activity;
pub mod discovery;
pub mod engine;
pub mod export;
pub mod outreach;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod working_set;

pub use activity::{ActivityEntry, ActivityLevel, ActivityLog};
pub use discovery::{
    AcceptancePolicy, DiscoveryClient, DiscoveryError, DiscoveryProvider, LlmDiscovery,
    RawCandidate,
};
pub use engine::{AcquisitionEngine, EngineError, EngineSettings, EngineSnapshot};
pub use export::ExportFormat;
pub use outreach::{whatsapp_link, Outreach, OutreachError};
pub use store::{JsonFileStore, LeadStore, MemoryStore, StoreError};
pub use working_set::{MergeOutcome, WorkingSet};
