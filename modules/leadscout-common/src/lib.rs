pub mod config;
pub mod error;
pub mod phone;
pub mod types;

pub use config::{Config, ProviderKind, TwilioConfig};
pub use error::LeadScoutError;
pub use phone::{is_degenerate, normalize_phone};
pub use types::*;
