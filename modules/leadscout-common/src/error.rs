use thiserror::Error;

#[derive(Error, Debug)]
pub enum LeadScoutError {
    #[error("Validation error: niche must not be empty")]
    EmptyNiche,

    #[error("Validation error: unknown lead status '{0}'")]
    InvalidStatus(String),

    #[error("Validation error: unknown mode '{0}'")]
    InvalidMode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
