use leadscout_common::config::{DEFAULT_MIN_INTEGRITY, DEFAULT_MIN_PHONE_DIGITS};
use leadscout_common::{is_degenerate, normalize_phone, Config};

use super::RawCandidate;

/// Why a candidate was discarded.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    BlankName,
    SingleTokenName,
    IntegrityOutOfRange(f64),
    LowIntegrity(f64),
    MissingPhone,
    ShortPhone(usize),
    DegeneratePhone(String),
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::BlankName => write!(f, "blank name"),
            Rejection::SingleTokenName => write!(f, "name has a single token"),
            Rejection::IntegrityOutOfRange(score) => write!(f, "integrity {score} outside 0-100"),
            Rejection::LowIntegrity(score) => write!(f, "integrity {score} below threshold"),
            Rejection::MissingPhone => write!(f, "no phone number"),
            Rejection::ShortPhone(len) => write!(f, "phone has only {len} digits"),
            Rejection::DegeneratePhone(digits) => write!(f, "phone {digits} looks fabricated"),
        }
    }
}

/// Plausibility rules every candidate must pass before it can become a lead.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptancePolicy {
    /// Candidates scoring below this are discarded; at or above pass.
    pub min_integrity: f64,
    pub min_phone_digits: usize,
    /// Discard single-token names ("Dr. Marcos" passes, "Marcos" does not).
    pub require_full_name: bool,
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self {
            min_integrity: DEFAULT_MIN_INTEGRITY,
            min_phone_digits: DEFAULT_MIN_PHONE_DIGITS,
            require_full_name: false,
        }
    }
}

impl AcceptancePolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_integrity: config.min_integrity,
            min_phone_digits: config.min_phone_digits,
            require_full_name: config.require_full_name,
        }
    }

    /// The strictest variant: high threshold and full names only.
    pub fn strict() -> Self {
        Self {
            min_integrity: 95.0,
            min_phone_digits: DEFAULT_MIN_PHONE_DIGITS,
            require_full_name: true,
        }
    }

    pub fn evaluate(&self, candidate: &RawCandidate) -> Result<(), Rejection> {
        let name = candidate.name.trim();
        if name.is_empty() {
            return Err(Rejection::BlankName);
        }
        if self.require_full_name && !name.contains(char::is_whitespace) {
            return Err(Rejection::SingleTokenName);
        }

        let score = candidate.integrity;
        if !(0.0..=100.0).contains(&score) {
            return Err(Rejection::IntegrityOutOfRange(score));
        }
        if score < self.min_integrity {
            return Err(Rejection::LowIntegrity(score));
        }

        let digits = candidate
            .phone_number
            .as_deref()
            .map(normalize_phone)
            .unwrap_or_default();
        if digits.is_empty() {
            return Err(Rejection::MissingPhone);
        }
        if digits.len() < self.min_phone_digits {
            return Err(Rejection::ShortPhone(digits.len()));
        }
        if is_degenerate(&digits) {
            return Err(Rejection::DegeneratePhone(digits));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, phone: Option<&str>, integrity: f64) -> RawCandidate {
        RawCandidate {
            name: name.to_string(),
            company: Some("Clínica Sorriso".to_string()),
            headline: None,
            email: None,
            phone_number: phone.map(str::to_string),
            email_subject: None,
            localized_pitch: Some("Olá!".to_string()),
            integrity,
            sources: Vec::new(),
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        let policy = AcceptancePolicy::default();
        assert_eq!(
            policy.evaluate(&candidate("Ana Souza", Some("5511988887777"), 75.0)),
            Ok(())
        );
        assert_eq!(
            policy.evaluate(&candidate("Ana Souza", Some("5511988887777"), 74.9)),
            Err(Rejection::LowIntegrity(74.9))
        );
    }

    #[test]
    fn threshold_is_configurable() {
        let policy = AcceptancePolicy {
            min_integrity: 85.0,
            ..AcceptancePolicy::default()
        };
        assert!(policy
            .evaluate(&candidate("Ana Souza", Some("5511988887777"), 80.0))
            .is_err());
    }

    #[test]
    fn phone_is_normalized_before_length_check() {
        let policy = AcceptancePolicy::default();
        assert_eq!(
            policy.evaluate(&candidate("Ana Souza", Some("+55 (11) 98888-7777"), 90.0)),
            Ok(())
        );
        assert_eq!(
            policy.evaluate(&candidate("Ana Souza", Some("98888-777"), 90.0)),
            Err(Rejection::ShortPhone(8))
        );
    }

    #[test]
    fn missing_phone_is_rejected() {
        let policy = AcceptancePolicy::default();
        assert_eq!(
            policy.evaluate(&candidate("Ana Souza", None, 99.0)),
            Err(Rejection::MissingPhone)
        );
        assert_eq!(
            policy.evaluate(&candidate("Ana Souza", Some("n/a"), 99.0)),
            Err(Rejection::MissingPhone)
        );
    }

    #[test]
    fn degenerate_numbers_are_rejected_despite_high_score() {
        let policy = AcceptancePolicy::default();
        for phone in ["9999999999", "1234567890", "(99) 9999-9999"] {
            assert!(
                matches!(
                    policy.evaluate(&candidate("Ana Souza", Some(phone), 99.0)),
                    Err(Rejection::DegeneratePhone(_))
                ),
                "{phone} should be degenerate"
            );
        }
    }

    #[test]
    fn single_token_names_only_rejected_in_strict_mode() {
        let lenient = AcceptancePolicy::default();
        let strict = AcceptancePolicy::strict();
        let marcos = candidate("Marcos", Some("5511988887777"), 99.0);

        assert_eq!(lenient.evaluate(&marcos), Ok(()));
        assert_eq!(strict.evaluate(&marcos), Err(Rejection::SingleTokenName));
    }

    #[test]
    fn out_of_range_scores_are_rejected() {
        let policy = AcceptancePolicy::default();
        assert_eq!(
            policy.evaluate(&candidate("Ana Souza", Some("5511988887777"), 140.0)),
            Err(Rejection::IntegrityOutOfRange(140.0))
        );
    }
}
