//! sage-facade - the thin front-end adapter of spec.md §6: `POST
//! /api/request` in, a SAGE turn forwarded to the root node's `/process`
//! out. Only this wire contract is specified; everything downstream of the
//! root hop is the root node's concern.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use axum::Router;
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sage_types::message::AgentMessage;

/// Headers forwarded verbatim to the root node, per spec.md §6.
const FORWARDED_HEADERS: &[&str] = ["x-sage-enabled", "x-hpke-enabled", "x-scenario", "x-conversation-id", "x-sage-context-id"].as_slice();

struct AppState {
    client: reqwest::Client,
    root_url: String,
}

#[derive(Parser, Debug)]
#[command(name = "sage-facade", about = "SAGE façade: POST /api/request, forwarded to the root node", version)]
struct Args {
    #[arg(long, default_value_t = 8090, env = "FACADE_PORT")]
    port: u16,

    #[arg(long, default_value = "0.0.0.0", env = "FACADE_HOST")]
    host: String,

    /// Base URL of the sage-root node this façade forwards to.
    #[arg(long = "root-url", default_value = "http://localhost:8080", env = "ROOT_URL")]
    root_url: String,

    /// Log output shape: pretty (human-readable) or json.
    #[arg(long = "log-format", default_value = "pretty", env = "LOG_FORMAT")]
    log_format: String,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_tracing(&args.log_format);

    let state = Arc::new(AppState { client: reqwest::Client::new(), root_url: args.root_url.clone() });

    let app = Router::new()
        .route("/api/request", post(api_request))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", args.host, args.port);
    tracing::info!("sage-facade listening on http://{addr}, forwarding to {}", args.root_url);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(log_format: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match log_format {
        "json" => {
            tracing_subscriber::registry().with(env_filter).with(tracing_subscriber::fmt::layer().json()).init();
        }
        _ => {
            tracing_subscriber::registry().with(env_filter).with(tracing_subscriber::fmt::layer()).init();
        }
    }
}

#[derive(Debug, Deserialize)]
struct PromptBody {
    prompt: String,
}

fn extract_prompt(body: &Bytes) -> String {
    match serde_json::from_slice::<PromptBody>(body) {
        Ok(parsed) => parsed.prompt,
        Err(_) => String::from_utf8_lossy(body).trim().to_string(),
    }
}

#[derive(Debug, Serialize)]
struct SageVerification {
    verified: bool,
    #[serde(rename = "signatureValid")]
    signature_valid: bool,
    timestamp: String,
    details: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct RequestMetadata {
    #[serde(rename = "requestId")]
    request_id: String,
    #[serde(rename = "agentPath")]
    agent_path: String,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct FacadeResponse {
    response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    logs: Option<Vec<String>>,
    #[serde(rename = "sageVerification")]
    sage_verification: SageVerification,
    metadata: RequestMetadata,
}

async fn api_request(State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes) -> Response {
    let prompt = extract_prompt(&body);
    let message = AgentMessage::request("facade-user", "sage-root", prompt, None);

    let mut request = state.client.post(format!("{}/process", state.root_url.trim_end_matches('/'))).json(&message);
    for name in FORWARDED_HEADERS {
        if let Some(value) = headers.get(*name) {
            request = request.header(*name, value.clone());
        }
    }

    let upstream = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "root node unreachable");
            return (StatusCode::BAD_GATEWAY, Json(serde_json::json!({"error": "upstream_error", "message": e.to_string()}))).into_response();
        }
    };

    let status = upstream.status();
    let verified = upstream.headers().get("x-sage-verified").and_then(|v| v.to_str().ok()) == Some("true");
    let signature_valid = upstream.headers().get("x-sage-signature-valid").and_then(|v| v.to_str().ok()) == Some("true");

    let body_json: serde_json::Value = match upstream.json().await {
        Ok(json) => json,
        Err(e) => {
            return (StatusCode::BAD_GATEWAY, Json(serde_json::json!({"error": "upstream_error", "message": e.to_string()}))).into_response();
        }
    };

    let request_id = format!("req_{}", uuid::Uuid::new_v4());
    let timestamp = chrono::Utc::now().to_rfc3339();

    if !status.is_success() {
        // Root failures arrive as `sage_verification_error` envelopes; the
        // façade's own error contract is the flatter `{error, message}`.
        let code = body_json.pointer("/error/code").and_then(|v| v.as_str()).unwrap_or("BAD_REQUEST");
        let message = body_json.pointer("/error/message").and_then(|v| v.as_str()).unwrap_or("request failed");
        let status = StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
        return (status, Json(serde_json::json!({"error": code.to_lowercase(), "message": message}))).into_response();
    }

    let content = body_json.get("content").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    let destination = body_json.get("destination").and_then(|v| v.as_str()).unwrap_or("chat");

    let facade_response = FacadeResponse {
        response: content,
        logs: None,
        sage_verification: SageVerification { verified, signature_valid, timestamp: timestamp.clone(), details: serde_json::json!({}) },
        metadata: RequestMetadata { request_id, agent_path: format!("facade -> sage-root -> {destination}"), timestamp },
    };

    (StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::OK), Json(facade_response)).into_response()
}
