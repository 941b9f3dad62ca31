//! HTTP handlers: the inbound pipeline (spec.md §4.E) wired to `/process`,
//! plus the operational endpoints of spec.md §6.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use sage_conversation::{derive, ConversationIdInputs};
use sage_dispatch::{MedicalSendContext, PaymentSendContext};
use sage_hpke::HandshakeResponse;
use sage_transport::{demux_hpke, extract_metadata, verify_signature, DemuxOutcome};
use sage_types::error::{SageError, SageErrorCode};
use sage_types::message::AgentMessage;
use sage_types::secure::{SecureMessage, SecureRole};

use crate::state::AppState;

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn header_bool(headers: &HeaderMap, name: &str) -> Option<bool> {
    match header_str(headers, name)?.to_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Renders a `SageError` as the `sage_verification_error` wire envelope with
/// the matching HTTP status and `X-SAGE-Verified`/`X-SAGE-Signature-Valid`
/// headers, per spec.md §7.
fn error_response(err: SageError, from: &str, to: &str, verified: bool) -> Response {
    let status = StatusCode::from_u16(err.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = err.to_envelope(from, to);
    let mut response = (status, Json(body)).into_response();
    let verified_header = if verified { "true" } else { "false" };
    response.headers_mut().insert("X-SAGE-Verified", verified_header.parse().unwrap());
    response.headers_mut().insert("X-SAGE-Signature-Valid", verified_header.parse().unwrap());
    response
}

/// `POST /process` - AgentMessage JSON in, AgentMessage JSON out, per
/// spec.md §6. Runs the inbound pipeline (verify -> replay -> HPKE demux)
/// only to the extent the deployment requires it: the façade-to-root hop is
/// trusted and unsigned by default (`--require` opts a node into verifying
/// it like any other peer hop).
pub async fn process_handler(State(state): State<Arc<AppState>>, headers: HeaderMap, body: axum::body::Bytes) -> Response {
    let metadata = extract_metadata(&headers);
    let content_type = header_str(&headers, "content-type").unwrap_or("application/json");
    let local_did_str = state.local_did.to_string();

    if state.require_signed {
        let Some(sage_did) = metadata.sage_did.as_deref() else {
            return error_response(SageError::new(SageErrorCode::BadRequest, "missing X-SAGE-DID"), &local_did_str, "unknown", false);
        };
        let peer_did = match sage_identity::Did::parse(sage_did) {
            Ok(did) => did,
            Err(e) => return error_response(SageError::new(SageErrorCode::InvalidDid, e.to_string()), &local_did_str, sage_did, false),
        };
        let resolved = match state.resolver.resolve(&peer_did).await {
            Ok(key) => key,
            Err(e) => return error_response(e.into(), &local_did_str, sage_did, false),
        };
        if let Err(e) = verify_signature(&metadata, "POST", "/process", content_type, resolved.algorithm, &resolved.public_key_bytes) {
            return error_response(e.into(), &local_did_str, sage_did, false);
        }
    }

    if let Some(message_id) = &metadata.message_id {
        let claimed = metadata.date.as_deref().and_then(parse_rfc2822);
        if let Err(e) = state.replay_guard.check(message_id, claimed) {
            return error_response(e.into(), &local_did_str, metadata.sage_did.as_deref().unwrap_or("unknown"), false);
        }
    }

    let plaintext = match demux_hpke(&metadata, &body, &state.sessions) {
        Ok(DemuxOutcome::Plaintext(bytes)) => bytes,
        Ok(DemuxOutcome::HandshakeBody(_)) => {
            return error_response(SageError::new(SageErrorCode::BadRequest, "/process does not accept inbound HPKE handshakes"), &local_did_str, "unknown", true);
        }
        Err(e) => return error_response(e.into(), &local_did_str, metadata.sage_did.as_deref().unwrap_or("unknown"), false),
    };

    let message: AgentMessage = match serde_json::from_slice(&plaintext) {
        Ok(m) => m,
        Err(e) => return error_response(SageError::new(SageErrorCode::BadRequest, e.to_string()), &local_did_str, "unknown", true),
    };

    let context_id_header = metadata.context_id.clone();
    let scenario_header = header_str(&headers, "x-scenario").map(|s| s.to_string());
    let inputs = ConversationIdInputs::from_message(&message, context_id_header.as_deref(), None, scenario_header.as_deref());
    let conversation_id = derive(&message, &inputs);
    let lang_header = header_str(&headers, "x-lang").map(|s| s.to_string());

    let sage_enabled = header_bool(&headers, "x-sage-enabled").unwrap_or_else(|| state.sage_enabled.load(Ordering::Relaxed));
    let hpke_enabled = header_bool(&headers, "x-hpke-enabled").unwrap_or_else(|| state.hpke_enabled_for("payment"));
    if hpke_enabled && !sage_enabled {
        return error_response(SageError::new(SageErrorCode::HpkeWithoutSage, "HPKE requires SAGE"), &local_did_str, &message.source, true);
    }

    let payment_record = state.agent_catalog.get("payment").ok();
    let payment_kid = payment_record.and_then(|r| state.sessions.active_kid(&r.did.to_string()));
    let send_ctx = payment_record.map(|record| PaymentSendContext {
        client: &state.client,
        base_url: &record.endpoint,
        local_did: &state.local_did,
        signer: if sage_enabled { state.signer.as_ref() } else { None },
        kid: if hpke_enabled { payment_kid.as_deref() } else { None },
        sessions: if hpke_enabled { Some(&state.sessions) } else { None },
    });

    let medical_record = state.agent_catalog.get("medical").ok();
    let medical_hpke_enabled = header_bool(&headers, "x-hpke-enabled").unwrap_or_else(|| state.hpke_enabled_for("medical"));
    let medical_kid = medical_record.and_then(|r| state.sessions.active_kid(&r.did.to_string()));
    let medical_send_ctx = medical_record.map(|record| MedicalSendContext {
        client: &state.client,
        base_url: &record.endpoint,
        local_did: &state.local_did,
        signer: if sage_enabled { state.signer.as_ref() } else { None },
        kid: if medical_hpke_enabled { medical_kid.as_deref() } else { None },
        sessions: if medical_hpke_enabled { Some(&state.sessions) } else { None },
    });

    let cancel = CancellationToken::new();
    let response = state
        .dispatcher
        .dispatch(&message, &conversation_id, lang_header.as_deref(), &local_did_str, send_ctx.as_ref(), medical_send_ctx.as_ref(), &cancel)
        .await;

    let mut axum_response = Json(response).into_response();
    axum_response.headers_mut().insert("X-SAGE-Verified", "true".parse().unwrap());
    axum_response.headers_mut().insert("X-SAGE-Signature-Valid", "true".parse().unwrap());
    axum_response
}

fn parse_rfc2822(s: &str) -> Option<SystemTime> {
    let parsed = chrono::DateTime::parse_from_rfc2822(s).ok()?;
    Some(SystemTime::UNIX_EPOCH + Duration::from_secs(parsed.timestamp().max(0) as u64))
}

pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(state.status_summary())
}

pub async fn sage_status_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "sageEnabled": state.sage_enabled.load(Ordering::Relaxed),
        "requireSigned": state.require_signed,
        "did": state.local_did.to_string(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ToggleSageBody {
    pub enabled: bool,
}

pub async fn toggle_sage_handler(State(state): State<Arc<AppState>>, Json(body): Json<ToggleSageBody>) -> Json<serde_json::Value> {
    state.sage_enabled.store(body.enabled, Ordering::Relaxed);
    tracing::info!(enabled = body.enabled, "SAGE signing toggled");
    Json(state.status_summary())
}

#[derive(Debug, Deserialize)]
pub struct HpkeConfigBody {
    pub enabled: bool,
    pub target: String,
    #[serde(rename = "keysFile")]
    pub keys_file: Option<String>,
}

/// `POST /hpke/config` - runs the real handshake (4.C `Enable(target)`) when
/// enabling, or tears the channel down on disable.
pub async fn hpke_config_handler(State(state): State<Arc<AppState>>, Json(body): Json<HpkeConfigBody>) -> Response {
    if let Some(path) = &body.keys_file {
        if let Err(e) = validate_keys_file_override(path) {
            return error_response(SageError::new(SageErrorCode::BadRequest, e), &state.local_did.to_string(), &body.target, true);
        }
    }

    let Ok(record) = state.agent_catalog.get(&body.target) else {
        return error_response(SageError::new(SageErrorCode::BadRequest, format!("unknown target: {}", body.target)), &state.local_did.to_string(), &body.target, true);
    };
    let peer_did = record.did.clone();
    let base_url = record.endpoint.clone();

    if !body.enabled {
        state.sessions.disable(&peer_did.to_string());
        state.hpke_enabled.insert(body.target.clone(), false);
        return Json(serde_json::json!({"target": body.target, "enabled": false})).into_response();
    }

    let Some((local_private, _local_public)) = &state.local_hpke_keypair else {
        return error_response(SageError::new(SageErrorCode::BadRequest, "no local HPKE keypair configured"), &state.local_did.to_string(), &body.target, true);
    };
    let Some(signer) = state.signer.as_ref() else {
        return error_response(SageError::new(SageErrorCode::BadRequest, "no signing identity configured"), &state.local_did.to_string(), &body.target, true);
    };
    let Some(peer_public_key) = state.hpke_keys.get(&peer_did) else {
        return error_response(SageError::new(SageErrorCode::BadRequest, format!("no HPKE public key on file for {peer_did}")), &state.local_did.to_string(), &body.target, true);
    };

    let (request, send_ctx) = match state.sessions.begin_handshake(peer_public_key) {
        Ok(pair) => pair,
        Err(e) => return error_response(e.into(), &state.local_did.to_string(), &body.target, true),
    };

    let payload = serde_json::to_vec(&request).expect("HandshakeRequest always serializes");
    let secure = SecureMessage::new(state.local_did.to_string(), payload, SecureRole::Agent);
    let outcome = sage_transport::send(&state.client, &base_url, &state.local_did, Some(signer), None, None, &secure, sage_transport::FramingMode::HPKE_HANDSHAKE).await;

    let transport_response = match outcome {
        Ok(sage_transport::TransportOutcome::Handshake(response)) => response,
        Ok(sage_transport::TransportOutcome::Data(_)) => {
            return error_response(SageError::new(SageErrorCode::UpstreamError, "handshake peer returned a data-mode response"), &state.local_did.to_string(), &body.target, true);
        }
        Err(e) => return error_response(e.into(), &state.local_did.to_string(), &body.target, true),
    };

    let Some(data) = transport_response.data else {
        return error_response(SageError::new(SageErrorCode::UpstreamError, "handshake response missing data"), &state.local_did.to_string(), &body.target, true);
    };
    let handshake_response: HandshakeResponse = match serde_json::from_value(data) {
        Ok(r) => r,
        Err(e) => return error_response(SageError::new(SageErrorCode::UpstreamError, e.to_string()), &state.local_did.to_string(), &body.target, true),
    };

    if let Err(e) = state.sessions.finish_initiator(&peer_did.to_string(), &handshake_response, send_ctx, local_private) {
        return error_response(e.into(), &state.local_did.to_string(), &body.target, true);
    }
    state.hpke_enabled.insert(body.target.clone(), true);

    Json(serde_json::json!({"target": body.target, "enabled": true, "kid": handshake_response.kid})).into_response()
}

/// The only override this deployment supports is re-reading the same
/// catalog file already loaded at startup; anything else would require a
/// live reload this crate doesn't implement.
fn validate_keys_file_override(path: &str) -> Result<(), String> {
    if std::path::Path::new(path).exists() {
        Ok(())
    } else {
        Err(format!("keysFile not found: {path}"))
    }
}

#[derive(Debug, Deserialize)]
pub struct HpkeStatusQuery {
    pub target: String,
}

pub async fn hpke_status_handler(State(state): State<Arc<AppState>>, Query(query): Query<HpkeStatusQuery>) -> Json<serde_json::Value> {
    let active_kid = state
        .agent_catalog
        .get(&query.target)
        .ok()
        .and_then(|record| state.sessions.active_kid(&record.did.to_string()));

    Json(serde_json::json!({
        "target": query.target,
        "enabled": state.hpke_enabled_for(&query.target),
        "activeKid": active_kid,
    }))
}
