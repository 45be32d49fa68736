//! Gateway HTTP server (single port).

use crate::config::Settings;
use crate::dispatch::Dispatcher;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Service name reported by the health endpoint.
pub const SERVICE_NAME: &str = "whatsapp-inbound-orchestrator";

const WEBHOOK_BASE: &str = "/api/v1/whatsapp";
const SUBSCRIBE_MODE: &str = "subscribe";

/// Shared state for the gateway: resolved settings and the dispatcher.
#[derive(Clone)]
pub struct GatewayState {
    pub settings: Arc<Settings>,
    pub dispatcher: Dispatcher,
}

impl GatewayState {
    pub fn new(settings: Settings, dispatcher: Dispatcher) -> Self {
        Self {
            settings: Arc::new(settings),
            dispatcher,
        }
    }
}

/// Routes under `/api/v1/whatsapp`: `GET /health`, `GET /webhook` (subscription handshake), `POST /webhook`.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route(&format!("{}/health", WEBHOOK_BASE), get(health_http))
        .route(
            &format!("{}/webhook", WEBHOOK_BASE),
            get(verify_webhook).post(receive_webhook),
        )
        .with_state(state)
}

/// Run the gateway until SIGINT/SIGTERM.
pub async fn run_gateway(settings: Settings) -> Result<()> {
    let dispatcher = Dispatcher::from_settings(&settings)?;
    log_startup(&settings, &dispatcher);
    if settings.whatsapp_verify_token.is_none() {
        log::warn!("WHATSAPP_VERIFY_TOKEN not configured; webhook verification will be rejected");
    }

    let bind_addr = format!("{}:{}", settings.bind, settings.port);
    let app = router(GatewayState::new(settings, dispatcher));
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("stopping {}", SERVICE_NAME);
    Ok(())
}

fn log_startup(settings: &Settings, dispatcher: &Dispatcher) {
    log::info!("starting {} v{}", SERVICE_NAME, env!("CARGO_PKG_VERSION"));
    log::info!("  env: {}", settings.env);
    log::info!("  port: {}", settings.port);
    log::info!(
        "  agent url: {}",
        settings.agent_url.as_deref().unwrap_or("not configured")
    );
    log::info!("  agent app name: {}", settings.agent_app_name);
    log::info!(
        "  whatsapp relay: {}",
        if dispatcher.relay_configured() {
            "configured"
        } else {
            "not configured"
        }
    );
}

/// Future that completes on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// GET /api/v1/whatsapp/health returns a simple health JSON for liveness checks.
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "env": state.settings.env,
    }))
}

/// Query parameters Meta sends when subscribing the webhook.
#[derive(Debug, Deserialize)]
struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// GET /api/v1/whatsapp/webhook: echo `hub.challenge` when mode is subscribe and the token matches.
async fn verify_webhook(
    State(state): State<GatewayState>,
    Query(params): Query<VerifyParams>,
) -> (StatusCode, String) {
    let expected = state.settings.whatsapp_verify_token.as_deref();
    let token_ok = matches!(
        (expected, params.verify_token.as_deref()),
        (Some(e), Some(p)) if e == p
    );
    if params.mode.as_deref() == Some(SUBSCRIBE_MODE) && token_ok {
        log::info!("webhook verification succeeded");
        (StatusCode::OK, params.challenge.unwrap_or_default())
    } else {
        log::warn!("webhook verification failed (mode {:?})", params.mode);
        (StatusCode::FORBIDDEN, "Verification failed".to_string())
    }
}

/// POST /api/v1/whatsapp/webhook: acknowledge with `{"status":"ok"}` once the body is a JSON object.
///
/// Dispatch runs on its own task so a client disconnect does not cancel in-flight agent or relay calls.
async fn receive_webhook(
    State(state): State<GatewayState>,
    body: Bytes,
) -> (StatusCode, Json<serde_json::Value>) {
    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("webhook body is not JSON: {}", e);
            return bad_request("body must be JSON");
        }
    };
    if !payload.is_object() {
        log::warn!("webhook body is not a JSON object");
        return bad_request("body must be a JSON object");
    }

    let event_id = uuid::Uuid::new_v4().to_string();
    log::info!("[{}] received whatsapp webhook: {}", event_id, payload);
    let dispatcher = state.dispatcher.clone();
    let task = tokio::spawn(async move {
        let outcome = dispatcher.process(&event_id, &payload).await;
        log::debug!("[{}] dispatch finished: {:?}", event_id, outcome);
    });
    if let Err(e) = task.await {
        log::error!("dispatch task failed: {}", e);
    }
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

fn bad_request(detail: &str) -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({ "detail": detail })))
}
