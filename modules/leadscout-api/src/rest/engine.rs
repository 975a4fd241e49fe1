use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use tracing::info;

use leadscout_common::Mode;
use leadscout_engine::EngineError;

use super::engine_error;
use crate::AppState;

#[derive(Deserialize)]
pub struct StartRequest {
    niche: String,
    country: Option<String>,
    mode: Option<String>,
}

pub async fn api_snapshot(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.snapshot())
}

pub async fn api_activity(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({ "entries": state.engine.activity() }))
}

pub async fn api_start(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StartRequest>,
) -> Response {
    let mode = match body.mode.as_deref().map(str::parse::<Mode>).transpose() {
        Ok(mode) => mode.unwrap_or_default(),
        Err(e) => return engine_error(EngineError::Validation(e)),
    };
    let country = body
        .country
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| state.default_country.clone());

    match state.engine.start(&body.niche, &country, mode) {
        Ok(epoch) => {
            info!(epoch, "Run started via API");
            Json(state.engine.snapshot()).into_response()
        }
        Err(e) => engine_error(e),
    }
}

pub async fn api_stop(State(state): State<Arc<AppState>>) -> Response {
    match state.engine.stop() {
        Ok(()) => Json(state.engine.snapshot()).into_response(),
        Err(e) => engine_error(e),
    }
}
