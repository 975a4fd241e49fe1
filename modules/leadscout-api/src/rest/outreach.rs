use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use uuid::Uuid;

use twilio::Channel;

use super::outreach_error;
use crate::AppState;

#[derive(Deserialize)]
pub struct MessageRequest {
    #[serde(default)]
    channel: Channel,
}

pub async fn api_whatsapp_link(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    match state.outreach.whatsapp_link(id) {
        Ok(url) => Json(serde_json::json!({ "url": url })).into_response(),
        Err(e) => outreach_error(e),
    }
}

pub async fn api_send_pitch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<MessageRequest>,
) -> Response {
    match state.outreach.send_pitch(id, body.channel).await {
        Ok(lead) => Json(lead).into_response(),
        Err(e) => outreach_error(e),
    }
}
