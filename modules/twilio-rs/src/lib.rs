// Minimal Twilio Programmable Messaging client (SMS + WhatsApp).

use std::collections::HashMap;

pub mod models;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{ErrorResponse, MessageResponse};

const TWILIO_API_URL: &str = "https://api.twilio.com/2010-04-01";

#[derive(Debug, Error)]
pub enum TwilioError {
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Twilio rejected the message ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Request to Twilio failed: {0}")]
    Network(#[from] reqwest::Error),
}

/// Delivery channel for an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    #[default]
    WhatsApp,
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sms" => Ok(Channel::Sms),
            "whatsapp" => Ok(Channel::WhatsApp),
            other => Err(format!("unknown channel '{other}', expected 'sms' or 'whatsapp'")),
        }
    }
}

impl Channel {
    fn address(self, e164: &str) -> String {
        match self {
            Channel::Sms => e164.to_string(),
            Channel::WhatsApp => format!("whatsapp:{e164}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TwilioOptions {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number in E.164 (`+15551234567`). Must be WhatsApp-enabled for WhatsApp sends.
    pub from_number: String,
}

#[derive(Debug, Clone)]
pub struct TwilioService {
    options: TwilioOptions,
    http: Client,
    base_url: String,
}

/// Convert a phone number to E.164. Accepts digits with or without a leading `+`.
pub fn to_e164(number: &str) -> Result<String, TwilioError> {
    let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
    // E.164 allows at most 15 digits; anything under 8 is not a dialable international number.
    if !(8..=15).contains(&digits.len()) {
        return Err(TwilioError::InvalidRecipient(number.to_string()));
    }
    Ok(format!("+{digits}"))
}

impl TwilioService {
    pub fn new(options: TwilioOptions) -> Self {
        Self {
            options,
            http: Client::new(),
            base_url: TWILIO_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub async fn send_message(
        &self,
        recipient: &str,
        body: &str,
        channel: Channel,
    ) -> Result<MessageResponse, TwilioError> {
        let to = channel.address(&to_e164(recipient)?);
        let from = channel.address(&self.options.from_number);

        let url = format!(
            "{}/Accounts/{}/Messages.json",
            self.base_url, self.options.account_sid
        );

        let mut form_body: HashMap<&str, &str> = HashMap::new();
        form_body.insert("To", &to);
        form_body.insert("From", &from);
        form_body.insert("Body", body);

        let response = self
            .http
            .post(url)
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .form(&form_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorResponse>(&error_body) {
                Ok(ErrorResponse {
                    code: Some(code),
                    message: Some(message),
                }) => format!("{message} (code {code})"),
                _ => error_body,
            };
            warn!(status = status.as_u16(), %message, "Twilio message rejected");
            return Err(TwilioError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let message = response.json::<MessageResponse>().await?;
        info!(sid = %message.sid, status = %message.status, "Twilio message queued");
        Ok(message)
    }
}
