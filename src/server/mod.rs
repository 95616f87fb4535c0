//! Gateway process: keeps provider keys server-side and forwards calls
//!
//! Routes:
//! - `GET /health`
//! - `POST /api/claude` forwards to the Anthropic Messages API
//! - `POST /api/deepseek` forwards to DeepSeek chat completions
//!
//! Request bodies are passed through with `model` (and `max_tokens` for
//! Anthropic) filled in when missing. Provider errors come back with the
//! provider's status and body.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::gateway::CredentialSource;
use crate::value_objects::{ProviderBinding, ProviderKind};

pub type ApiError = (StatusCode, Json<Value>);

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

/// Shared state of the gateway process
pub struct GatewayState {
    client: Client,
    endpoints: GatewayConfig,
    credentials: Arc<dyn CredentialSource>,
}

impl GatewayState {
    pub fn new(endpoints: GatewayConfig, credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            client: Client::new(),
            endpoints,
            credentials,
        }
    }

    fn endpoint(&self, provider: ProviderKind) -> &str {
        match provider {
            ProviderKind::Anthropic => &self.endpoints.anthropic_url,
            ProviderKind::DeepSeek => &self.endpoints.deepseek_url,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "Gateway is running",
    })
}

pub async fn handle_claude(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    forward(&state, ProviderKind::Anthropic, body).await
}

pub async fn handle_deepseek(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    forward(&state, ProviderKind::DeepSeek, body).await
}

/// Fill in the model and token limit the caller left out
pub fn with_defaults(provider: ProviderKind, mut body: Value) -> Result<Value, ApiError> {
    let object = body
        .as_object_mut()
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "request body must be a JSON object"))?;

    let defaults = ProviderBinding::new(provider);
    object
        .entry("model")
        .or_insert_with(|| Value::from(defaults.model.clone()));
    if provider == ProviderKind::Anthropic {
        object
            .entry("max_tokens")
            .or_insert_with(|| Value::from(defaults.max_tokens));
    }
    Ok(body)
}

async fn forward(
    state: &GatewayState,
    provider: ProviderKind,
    body: Value,
) -> Result<Json<Value>, ApiError> {
    let api_key = state.credentials.api_key(provider).map_err(|err| {
        warn!(%provider, error = %err, "rejecting call without credentials");
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{provider} API key not configured in gateway"),
        )
    })?;
    let body = with_defaults(provider, body)?;

    let url = state.endpoint(provider);
    let request = state.client.post(url).json(&body);
    let request = match provider {
        ProviderKind::Anthropic => request
            .header("x-api-key", api_key)
            .header("anthropic-version", &state.endpoints.anthropic_version),
        ProviderKind::DeepSeek => request.bearer_auth(api_key),
    };

    let response = request.send().await.map_err(|err| {
        warn!(%provider, error = %err, "provider unreachable");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Internal server error", "message": err.to_string() })),
        )
    })?;

    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let payload = serde_json::from_str(&text).unwrap_or_else(|_| json!({ "error": text }));
    info!(%provider, status = status.as_u16(), "forwarded provider call");

    if status.is_success() {
        Ok(Json(payload))
    } else {
        let status = StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
        Err((status, Json(payload)))
    }
}

pub fn build_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/claude", post(handle_claude))
        .route("/api/deepseek", post(handle_deepseek))
        .with_state(state)
}

/// Serve the gateway on `addr` until Ctrl+C or SIGTERM
pub async fn run(addr: SocketAddr, state: Arc<GatewayState>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "gateway listening (health: /health, calls: /api/claude, /api/deepseek)");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::KeyMap;

    #[test]
    fn test_defaults_fill_missing_fields_only() {
        let body = with_defaults(
            ProviderKind::Anthropic,
            json!({ "messages": [], "max_tokens": 512 }),
        )
        .unwrap();
        assert_eq!(body["model"], "claude-sonnet-4-20250514");
        assert_eq!(body["max_tokens"], 512);

        let body =
            with_defaults(ProviderKind::DeepSeek, json!({ "model": "deepseek-reasoner" })).unwrap();
        assert_eq!(body["model"], "deepseek-reasoner");
        assert!(body.get("max_tokens").is_none());

        let (status, _) = with_defaults(ProviderKind::DeepSeek, json!([1, 2])).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_key_is_server_error() {
        let state = Arc::new(GatewayState::new(
            GatewayConfig::default(),
            Arc::new(KeyMap::new()),
        ));

        let (status, Json(body)) = handle_claude(State(state), Json(json!({ "messages": [] })))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "anthropic API key not configured in gateway");
    }

    #[tokio::test]
    async fn test_health() {
        let Json(health) = handle_health().await;
        assert_eq!(health.status, "ok");
    }
}
