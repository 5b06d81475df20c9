//! Gateway HTTP server.

use crate::agents::Agents;
use crate::config::{self, Config};
use crate::envelope::ResultEnvelope;
use crate::llm::{GeminiClient, Provider};
use crate::protocol::{ChatRequest, PrescriptionParseRequest, VoiceCommandRequest};
use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

const SERVICE_NAME: &str = "Integrated Medical AI System";

/// Shared state for the gateway: config and the handlers built from it.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub agents: Arc<Agents>,
}

impl GatewayState {
    /// Build state around an explicit provider (tests inject a stub here).
    pub fn new(config: Config, provider: Arc<dyn Provider>) -> Self {
        Self {
            config: Arc::new(config),
            agents: Arc::new(Agents::new(provider)),
        }
    }

    /// Build state with the Gemini client; the credential is resolved once, here.
    pub fn from_config(config: Config) -> Self {
        let api_key = config::resolve_api_key(&config);
        if api_key.is_none() {
            log::warn!("GOOGLE_API_KEY not set; requests will be answered with a credential-missing envelope");
        }
        let client = GeminiClient::from_config(&config.provider, api_key);
        log::info!("provider model: {}", client.model());
        Self::new(config, Arc::new(client))
    }
}

/// All routes with CORS, body limit and request logging applied.
pub fn router(state: GatewayState) -> Router {
    let cors = cors_layer(&state.config.gateway.cors_origins);
    let body_limit = state.config.gateway.max_body_bytes;
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/prescription/parse", post(parse_prescription))
        .route("/api/voice/command", post(voice_command))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o.trim() == "*") {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o.trim()) {
            Ok(v) => Some(v),
            Err(_) => {
                log::warn!("ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Run the gateway server; binds to config.gateway.bind:config.gateway.port.
/// Creates the uploads directory, then blocks until shutdown (e.g. Ctrl+C).
/// `config_path` is the path to the config file (used to resolve the uploads directory).
pub async fn run_gateway(config: Config, config_path: PathBuf) -> Result<()> {
    let uploads = config::resolve_uploads_dir(&config, &config_path);
    tokio::fs::create_dir_all(&uploads)
        .await
        .with_context(|| format!("creating uploads directory {}", uploads.display()))?;

    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let app = router(GatewayState::from_config(config));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// Tags each request with an id and logs method, path, status and latency.
async fn log_request(req: Request, next: Next) -> Response {
    let id = uuid::Uuid::new_v4();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();
    log::debug!("[{}] {} {}", id, method, path);
    let res = next.run(req).await;
    log::info!(
        "[{}] {} {} -> {} in {} ms",
        id,
        method,
        path,
        res.status().as_u16(),
        started.elapsed().as_millis()
    );
    res
}

/// GET / returns service info.
async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "agents": [
            "Medical Conversation Agent",
            "Prescription Parser",
            "Multi-Agent System (RAG + Web Search + Image Analysis)"
        ]
    }))
}

/// GET /api/health returns a static status report (for probes).
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "agents": {
            "medical_chat": "active",
            "prescription_parser": "active",
            "multi_agent": "active"
        }
    }))
}

type Envelope = (StatusCode, Json<ResultEnvelope>);

/// Unreadable, malformed or oversized bodies still answer with an envelope.
fn bad_body(rejection: JsonRejection) -> Envelope {
    log::info!("rejected request body: {}", rejection.body_text());
    (
        rejection.status(),
        Json(ResultEnvelope::rejected(
            rejection.body_text(),
            "Request body could not be read.",
        )),
    )
}

/// POST /api/chat routes the message to a handler (auto-detected unless `mode` is given).
async fn chat(
    State(state): State<GatewayState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Envelope {
    let Json(request) = match payload {
        Ok(p) => p,
        Err(rejection) => return bad_body(rejection),
    };
    match state.agents.chat(request).await {
        Ok(envelope) => (StatusCode::OK, Json(envelope)),
        Err(rejection) => {
            log::info!("chat rejected: {}", rejection);
            (StatusCode::BAD_REQUEST, Json(rejection.into_envelope()))
        }
    }
}

/// POST /api/prescription/parse extracts a structured prescription from an image.
async fn parse_prescription(
    State(state): State<GatewayState>,
    payload: Result<Json<PrescriptionParseRequest>, JsonRejection>,
) -> Envelope {
    let Json(request) = match payload {
        Ok(p) => p,
        Err(rejection) => return bad_body(rejection),
    };
    match state.agents.parse_prescription(request.image).await {
        Ok(envelope) => (StatusCode::OK, Json(envelope)),
        Err(rejection) => (StatusCode::BAD_REQUEST, Json(rejection.into_envelope())),
    }
}

/// POST /api/voice/command parses one spoken ordering command.
async fn voice_command(
    State(state): State<GatewayState>,
    payload: Result<Json<VoiceCommandRequest>, JsonRejection>,
) -> Envelope {
    let Json(request) = match payload {
        Ok(p) => p,
        Err(rejection) => return bad_body(rejection),
    };
    (
        StatusCode::OK,
        Json(state.agents.voice_command(&request.text).await),
    )
}
