use std::sync::Arc;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use leadscout_common::Config;
use leadscout_engine::{AcquisitionEngine, Outreach};

mod rest;

pub struct AppState {
    pub engine: AcquisitionEngine,
    pub outreach: Outreach,
    pub default_country: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // Engine control
        .route("/api/engine", get(rest::engine::api_snapshot))
        .route("/api/engine/start", post(rest::engine::api_start))
        .route("/api/engine/stop", post(rest::engine::api_stop))
        .route("/api/activity", get(rest::engine::api_activity))
        // Working set
        .route("/api/leads", get(rest::api_leads).delete(rest::api_clear))
        .route("/api/leads/{id}", delete(rest::api_delete_lead))
        .route("/api/leads/{id}/status", put(rest::api_set_status))
        .route("/api/export/{format}", get(rest::api_export))
        // Outreach
        .route("/api/leads/{id}/whatsapp", get(rest::outreach::api_whatsapp_link))
        .route("/api/leads/{id}/message", post(rest::outreach::api_send_pitch))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Lead data must never be cached by intermediaries
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        // Method + path + status + latency only; query strings can carry search terms
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("leadscout=info".parse()?))
        .init();

    let config = Config::from_env();
    config.log_redacted();

    let engine = AcquisitionEngine::from_config(&config)?;
    let outreach = Outreach::from_config(engine.clone(), &config);
    if !outreach.is_available() {
        info!("Twilio not configured, message sending disabled");
    }

    let state = Arc::new(AppState {
        engine,
        outreach,
        default_country: config.default_country.clone(),
    });

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("LeadScout API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
