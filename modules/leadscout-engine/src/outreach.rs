//! Contacting leads: WhatsApp deep links and Twilio sends.

use thiserror::Error;
use tracing::{info, warn};
use twilio::{Channel, TwilioError, TwilioOptions, TwilioService};
use uuid::Uuid;

use leadscout_common::{Config, Lead, LeadStatus};

use crate::engine::{AcquisitionEngine, EngineError};

#[derive(Debug, Error)]
pub enum OutreachError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("outreach unavailable: Twilio is not configured")]
    Unavailable,

    #[error("lead {0} has no pitch to send")]
    EmptyPitch(Uuid),

    #[error(transparent)]
    Twilio(#[from] TwilioError),
}

/// `https://wa.me/{digits}?text={pitch}` with the pitch percent-encoded.
pub fn whatsapp_link(lead: &Lead) -> String {
    let text: String = url::form_urlencoded::byte_serialize(lead.localized_pitch.as_bytes())
        .collect::<String>()
        .replace('+', "%20");
    format!("https://wa.me/{}?text={}", lead.phone_number, text)
}

/// Sends pitches through Twilio and records first contact on the lead.
#[derive(Clone)]
pub struct Outreach {
    engine: AcquisitionEngine,
    twilio: Option<TwilioService>,
}

impl Outreach {
    pub fn new(engine: AcquisitionEngine, twilio: Option<TwilioService>) -> Self {
        Self { engine, twilio }
    }

    pub fn from_config(engine: AcquisitionEngine, config: &Config) -> Self {
        let twilio = config.twilio.as_ref().map(|t| {
            TwilioService::new(TwilioOptions {
                account_sid: t.account_sid.clone(),
                auth_token: t.auth_token.clone(),
                from_number: t.from_number.clone(),
            })
        });
        Self::new(engine, twilio)
    }

    pub fn is_available(&self) -> bool {
        self.twilio.is_some()
    }

    pub fn whatsapp_link(&self, id: Uuid) -> Result<String, OutreachError> {
        Ok(whatsapp_link(&self.engine.lead(id)?))
    }

    /// Send the lead's localized pitch. A `new` lead becomes `contacted`;
    /// leads further along keep their status.
    pub async fn send_pitch(&self, id: Uuid, channel: Channel) -> Result<Lead, OutreachError> {
        let twilio = self.twilio.as_ref().ok_or(OutreachError::Unavailable)?;
        let lead = self.engine.lead(id)?;
        if lead.localized_pitch.trim().is_empty() {
            return Err(OutreachError::EmptyPitch(id));
        }

        let message = twilio
            .send_message(&lead.phone_number, &lead.localized_pitch, channel)
            .await?;
        info!(%id, sid = %message.sid, ?channel, "Pitch sent");

        Ok(self.record_contact(lead).await)
    }

    /// The message is already out, so a lead edited or deleted meanwhile is
    /// logged and the send still reported as done.
    async fn record_contact(&self, sent: Lead) -> Lead {
        let id = sent.id;
        if sent.status == LeadStatus::New {
            match self.engine.set_status(id, LeadStatus::Contacted).await {
                Ok(lead) => return lead,
                Err(e) => warn!(%id, error = %e, "Pitch sent but first contact not recorded"),
            }
        }
        self.engine.lead(id).unwrap_or(sent)
    }
}
