pub mod engine;
pub mod outreach;

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use leadscout_common::LeadStatus;
use leadscout_engine::{EngineError, ExportFormat, OutreachError};
use twilio::TwilioError;

use crate::AppState;

// --- Errors ---

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
        .into_response()
}

pub fn engine_error(err: EngineError) -> Response {
    let status = match &err {
        EngineError::Validation(_) | EngineError::ConfirmationRequired => StatusCode::BAD_REQUEST,
        EngineError::LeadNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::NotIdle(_)
        | EngineError::NotRunning
        | EngineError::InvalidTransition { .. } => StatusCode::CONFLICT,
        EngineError::Storage(e) => {
            warn!(error = %e, "Storage failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, err.to_string())
}

pub fn outreach_error(err: OutreachError) -> Response {
    let status = match err {
        OutreachError::Engine(inner) => return engine_error(inner),
        OutreachError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        OutreachError::EmptyPitch(_) => StatusCode::CONFLICT,
        OutreachError::Twilio(TwilioError::InvalidRecipient(_)) => StatusCode::BAD_REQUEST,
        OutreachError::Twilio(ref e) => {
            warn!(error = %e, "Message send failed");
            StatusCode::BAD_GATEWAY
        }
    };
    error_response(status, err.to_string())
}

// --- Query structs ---

#[derive(Deserialize)]
pub struct LeadsQuery {
    q: Option<String>,
}

#[derive(Deserialize)]
pub struct ClearQuery {
    #[serde(default)]
    confirm: bool,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    status: String,
}

// --- Handlers ---

pub async fn api_leads(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeadsQuery>,
) -> impl IntoResponse {
    let leads = state.engine.leads(params.q.as_deref());
    Json(serde_json::json!({ "count": leads.len(), "leads": leads }))
}

pub async fn api_clear(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ClearQuery>,
) -> Response {
    match state.engine.clear_all(params.confirm).await {
        Ok(cleared) => Json(serde_json::json!({ "cleared": cleared })).into_response(),
        Err(e) => engine_error(e),
    }
}

pub async fn api_delete_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    match state.engine.delete_record(id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => engine_error(e),
    }
}

pub async fn api_set_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusRequest>,
) -> Response {
    let status: LeadStatus = match body.status.parse() {
        Ok(status) => status,
        Err(e) => return engine_error(EngineError::Validation(e)),
    };
    match state.engine.set_status(id, status).await {
        Ok(lead) => Json(lead).into_response(),
        Err(e) => engine_error(e),
    }
}

pub async fn api_export(
    State(state): State<Arc<AppState>>,
    Path(format): Path<String>,
) -> Response {
    let format: ExportFormat = match format.parse() {
        Ok(format) => format,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };
    let body = state.engine.export(format);
    (
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", format.file_name()),
            ),
        ],
        body,
    )
        .into_response()
}
