use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LeadScoutError;

// --- Lead status ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Negotiating,
    Closed,
    Rejected,
}

impl LeadStatus {
    /// Position on the forward path `new → contacted → negotiating → closed`.
    fn rank(self) -> u8 {
        match self {
            LeadStatus::New => 0,
            LeadStatus::Contacted => 1,
            LeadStatus::Negotiating => 2,
            LeadStatus::Closed => 3,
            LeadStatus::Rejected => 4,
        }
    }

    /// Whether an operator may move a lead from `self` to `next`.
    ///
    /// Forward moves may skip steps. `rejected` is only reachable from `new`
    /// or `contacted`. Re-applying the current status is allowed.
    pub fn can_transition_to(self, next: LeadStatus) -> bool {
        if self == next {
            return true;
        }
        match (self, next) {
            (LeadStatus::Rejected, _) | (LeadStatus::Closed, _) => false,
            (LeadStatus::New | LeadStatus::Contacted, LeadStatus::Rejected) => true,
            (_, LeadStatus::Rejected) => false,
            (current, next) => next.rank() > current.rank(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Negotiating => "negotiating",
            LeadStatus::Closed => "closed",
            LeadStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = LeadScoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(LeadStatus::New),
            "contacted" => Ok(LeadStatus::Contacted),
            "negotiating" => Ok(LeadStatus::Negotiating),
            "closed" => Ok(LeadStatus::Closed),
            "rejected" => Ok(LeadStatus::Rejected),
            other => Err(LeadScoutError::InvalidStatus(other.to_string())),
        }
    }
}

// --- Operating mode ---

/// Trades model quality and cost against poll cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Cheapest model, no live search, slow cadence.
    Nano,
    #[default]
    Quantum,
    /// Strongest model with live search, fastest cadence.
    Neural,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Nano, Mode::Quantum, Mode::Neural];

    /// How many leads one discovery call asks for.
    pub fn lead_count(self) -> usize {
        match self {
            Mode::Nano => 5,
            Mode::Quantum => 8,
            Mode::Neural => 10,
        }
    }

    /// Delay before the next cycle after a successful one.
    pub fn success_delay(self) -> Duration {
        match self {
            Mode::Nano => Duration::from_secs(15),
            Mode::Quantum => Duration::from_secs(8),
            Mode::Neural => Duration::from_secs(2),
        }
    }

    /// Delay before retrying after a failed cycle. Always longer than `success_delay`.
    pub fn failure_backoff(self) -> Duration {
        match self {
            Mode::Nano => Duration::from_secs(30),
            Mode::Quantum => Duration::from_secs(20),
            Mode::Neural => Duration::from_secs(30),
        }
    }

    pub fn gemini_model(self) -> &'static str {
        match self {
            Mode::Nano => "gemini-2.5-flash-lite",
            Mode::Quantum => "gemini-2.5-flash",
            Mode::Neural => "gemini-2.5-pro",
        }
    }

    pub fn claude_model(self) -> &'static str {
        match self {
            Mode::Nano => "claude-haiku-4-5-20251001",
            Mode::Quantum | Mode::Neural => "claude-sonnet-4-5-20250929",
        }
    }

    /// Whether the provider may consult live web search.
    pub fn grounded(self) -> bool {
        !matches!(self, Mode::Nano)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Nano => "nano",
            Mode::Quantum => "quantum",
            Mode::Neural => "neural",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = LeadScoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nano" => Ok(Mode::Nano),
            "quantum" => Ok(Mode::Quantum),
            "neural" => Ok(Mode::Neural),
            other => Err(LeadScoutError::InvalidMode(other.to_string())),
        }
    }
}

// --- Search criteria ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub niche: String,
    pub country: String,
    pub mode: Mode,
}

impl SearchCriteria {
    /// Build criteria, trimming inputs. A blank niche is rejected.
    pub fn new(
        niche: impl AsRef<str>,
        country: impl AsRef<str>,
        mode: Mode,
    ) -> Result<Self, LeadScoutError> {
        let niche = niche.as_ref().trim();
        if niche.is_empty() {
            return Err(LeadScoutError::EmptyNiche);
        }
        Ok(Self {
            niche: niche.to_string(),
            country: country.as_ref().trim().to_string(),
            mode,
        })
    }
}

// --- Lead ---

/// A web page that backs a lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadSource {
    pub title: String,
    pub url: String,
}

/// An accepted contact in the working set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    pub company: String,
    pub headline: Option<String>,
    /// Digits only.
    pub phone_number: String,
    pub email: Option<String>,
    pub email_subject: Option<String>,
    pub localized_pitch: String,
    /// 0–100 certainty reported by the model.
    pub integrity: f64,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
    pub niche: String,
    pub country: String,
    #[serde(default)]
    pub sources: Vec<LeadSource>,
}

// --- Engine status ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    Idle,
    Running,
    Stopping,
}

impl std::fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineStatus::Idle => write!(f, "idle"),
            EngineStatus::Running => write!(f, "running"),
            EngineStatus::Stopping => write!(f, "stopping"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_backoff_exceeds_success_delay_in_every_mode() {
        for mode in Mode::ALL {
            assert!(
                mode.failure_backoff() > mode.success_delay(),
                "{mode}: backoff must be longer than the success delay"
            );
        }
    }

    #[test]
    fn forward_status_moves_are_allowed() {
        assert!(LeadStatus::New.can_transition_to(LeadStatus::Contacted));
        assert!(LeadStatus::Contacted.can_transition_to(LeadStatus::Negotiating));
        assert!(LeadStatus::Negotiating.can_transition_to(LeadStatus::Closed));
        assert!(LeadStatus::New.can_transition_to(LeadStatus::Negotiating));
    }

    #[test]
    fn nothing_returns_to_new() {
        for status in [
            LeadStatus::Contacted,
            LeadStatus::Negotiating,
            LeadStatus::Closed,
            LeadStatus::Rejected,
        ] {
            assert!(!status.can_transition_to(LeadStatus::New), "{status} -> new");
        }
    }

    #[test]
    fn rejected_only_from_new_or_contacted() {
        assert!(LeadStatus::New.can_transition_to(LeadStatus::Rejected));
        assert!(LeadStatus::Contacted.can_transition_to(LeadStatus::Rejected));
        assert!(!LeadStatus::Negotiating.can_transition_to(LeadStatus::Rejected));
        assert!(!LeadStatus::Closed.can_transition_to(LeadStatus::Rejected));
        assert!(!LeadStatus::Rejected.can_transition_to(LeadStatus::Contacted));
    }

    #[test]
    fn blank_niche_is_rejected() {
        let err = SearchCriteria::new("   ", "Brazil", Mode::Nano).unwrap_err();
        assert!(matches!(err, LeadScoutError::EmptyNiche));

        let criteria = SearchCriteria::new("  dentists ", " Brazil", Mode::Nano).unwrap();
        assert_eq!(criteria.niche, "dentists");
        assert_eq!(criteria.country, "Brazil");
    }

    #[test]
    fn status_and_mode_parse_case_insensitively() {
        assert_eq!("Negotiating".parse::<LeadStatus>().unwrap(), LeadStatus::Negotiating);
        assert_eq!("NEURAL".parse::<Mode>().unwrap(), Mode::Neural);
        assert!("warm".parse::<LeadStatus>().is_err());
        assert!("turbo".parse::<Mode>().is_err());
    }
}
