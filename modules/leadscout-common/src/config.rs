use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::error::LeadScoutError;

/// Default minimum integrity score a candidate needs to be accepted.
pub const DEFAULT_MIN_INTEGRITY: f64 = 75.0;
/// Default minimum number of digits in a canonical phone number.
pub const DEFAULT_MIN_PHONE_DIGITS: usize = 10;
/// Default number of activity-log lines kept.
pub const DEFAULT_ACTIVITY_LOG_CAP: usize = 30;
/// Default delay between a stop request and returning to idle.
pub const DEFAULT_STOP_SETTLE: Duration = Duration::from_millis(500);

/// Which hosted model family answers discovery requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    Claude,
}

impl FromStr for ProviderKind {
    type Err = LeadScoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "claude" | "anthropic" => Ok(ProviderKind::Claude),
            other => Err(LeadScoutError::Config(format!(
                "LEADSCOUT_PROVIDER must be 'gemini' or 'claude', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // AI provider
    pub provider: ProviderKind,
    pub provider_api_key: String,

    // Storage
    pub data_dir: PathBuf,

    // Acceptance policy
    pub min_integrity: f64,
    pub min_phone_digits: usize,
    pub require_full_name: bool,

    // Engine
    pub default_country: String,
    pub activity_log_cap: usize,
    pub stop_settle: Duration,

    // Web server
    pub web_host: String,
    pub web_port: u16,

    // Outreach
    pub twilio: Option<TwilioConfig>,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing or malformed.
    pub fn from_env() -> Self {
        let provider: ProviderKind = parsed_env("LEADSCOUT_PROVIDER", ProviderKind::Gemini);
        let provider_api_key = match provider {
            ProviderKind::Gemini => required_env("GEMINI_API_KEY"),
            ProviderKind::Claude => required_env("ANTHROPIC_API_KEY"),
        };

        Self {
            provider,
            provider_api_key,
            ..Self::local_from_env()
        }
    }

    /// Load config for commands that never call the model (list, export, ...).
    pub fn local_from_env() -> Self {
        let min_integrity: f64 = parsed_env("MIN_INTEGRITY", DEFAULT_MIN_INTEGRITY);
        if !(0.0..=100.0).contains(&min_integrity) {
            panic!("MIN_INTEGRITY must be between 0 and 100, got {min_integrity}");
        }

        Self {
            provider: ProviderKind::Gemini,
            provider_api_key: String::new(),
            data_dir: data_dir(),
            min_integrity,
            min_phone_digits: parsed_env("MIN_PHONE_DIGITS", DEFAULT_MIN_PHONE_DIGITS),
            require_full_name: parsed_env("REQUIRE_FULL_NAME", false),
            default_country: env::var("DEFAULT_COUNTRY").unwrap_or_else(|_| "Brazil".to_string()),
            activity_log_cap: parsed_env("ACTIVITY_LOG_CAP", DEFAULT_ACTIVITY_LOG_CAP).max(1),
            stop_settle: Duration::from_millis(parsed_env(
                "STOP_SETTLE_MS",
                DEFAULT_STOP_SETTLE.as_millis() as u64,
            )),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: parsed_env("WEB_PORT", 3000),
            twilio: twilio_from_env(),
        }
    }

    /// Log the loaded configuration with secrets masked.
    pub fn log_redacted(&self) {
        info!(
            provider = ?self.provider,
            provider_api_key = %redact(&self.provider_api_key),
            data_dir = %self.data_dir.display(),
            min_integrity = self.min_integrity,
            min_phone_digits = self.min_phone_digits,
            require_full_name = self.require_full_name,
            default_country = %self.default_country,
            activity_log_cap = self.activity_log_cap,
            stop_settle_ms = self.stop_settle.as_millis() as u64,
            web = %format!("{}:{}", self.web_host, self.web_port),
            twilio = self.twilio.is_some(),
            "Configuration loaded"
        );
    }
}

/// Root data directory, controlled by `DATA_DIR` env var (default: `"data"`).
pub fn data_dir() -> PathBuf {
    PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()))
}

fn twilio_from_env() -> Option<TwilioConfig> {
    let account_sid = env::var("TWILIO_ACCOUNT_SID").ok().filter(|v| !v.is_empty())?;
    Some(TwilioConfig {
        account_sid,
        auth_token: required_env("TWILIO_AUTH_TOKEN"),
        from_number: required_env("TWILIO_FROM_NUMBER"),
    })
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn parsed_env<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("{key} has an invalid value: '{raw}'")),
        _ => default,
    }
}

fn redact(secret: &str) -> String {
    if secret.is_empty() {
        return "<unset>".to_string();
    }
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}…")
}
