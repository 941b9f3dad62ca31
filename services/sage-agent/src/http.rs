//! The responder half of the inbound pipeline (spec.md §4.E), plus the
//! handshake-responder steps of §4.C that `sage-root`'s own `/process`
//! never needs. A domain agent's actual business logic is unspecified
//! (spec.md §1); `domain_handler` below is the stand-in.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use sage_hpke::HandshakeRequest;
use sage_transport::{demux_hpke, extract_metadata, verify_signature, DemuxOutcome};
use sage_types::error::{SageError, SageErrorCode};
use sage_types::message::AgentMessage;

use crate::state::AppState;

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn error_response(err: SageError, from: &str, to: &str, verified: bool) -> Response {
    let status = StatusCode::from_u16(err.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = err.to_envelope(from, to);
    let mut response = (status, Json(body)).into_response();
    let verified_header = if verified { "true" } else { "false" };
    response.headers_mut().insert("X-SAGE-Verified", verified_header.parse().unwrap());
    response.headers_mut().insert("X-SAGE-Signature-Valid", verified_header.parse().unwrap());
    response
}

fn parse_rfc2822(s: &str) -> Option<SystemTime> {
    let parsed = chrono::DateTime::parse_from_rfc2822(s).ok()?;
    Some(SystemTime::UNIX_EPOCH + Duration::from_secs(parsed.timestamp().max(0) as u64))
}

/// A response a generic domain agent might plausibly give; the real
/// payment/medical/planning logic lives on the peer's own side of the wire.
fn domain_handler(state: &AppState, message: &AgentMessage) -> AgentMessage {
    let content = format!("{} agent received: {}", state.domain, message.content);
    AgentMessage::response(state.local_did.to_string(), message.source.clone(), content, message.context_id.clone()).with_metadata(message.metadata.clone())
}

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

    let demuxed = match demux_hpke(&metadata, &body, &state.sessions) {
        Ok(outcome) => outcome,
        Err(e) => return error_response(e.into(), &local_did_str, metadata.sage_did.as_deref().unwrap_or("unknown"), false),
    };

    match demuxed {
        DemuxOutcome::HandshakeBody(secure) => respond_to_handshake(&state, &metadata, &secure).await,
        DemuxOutcome::Plaintext(plaintext) => {
            let message: AgentMessage = match serde_json::from_slice(&plaintext) {
                Ok(m) => m,
                Err(e) => return error_response(SageError::new(SageErrorCode::BadRequest, e.to_string()), &local_did_str, "unknown", true),
            };
            let response = domain_handler(&state, &message);
            let mut axum_response = Json(response).into_response();
            axum_response.headers_mut().insert("X-SAGE-Verified", "true".parse().unwrap());
            axum_response.headers_mut().insert("X-SAGE-Signature-Valid", "true".parse().unwrap());
            axum_response
        }
    }
}

/// spec.md §4.C step 3: verify, derive the shared secret, allocate a `kid`,
/// store a receive-session, and hand back the responder's encapsulated key.
async fn respond_to_handshake(state: &AppState, metadata: &sage_transport::InboundMetadata, secure: &sage_types::secure::SecureMessage) -> Response {
    let local_did_str = state.local_did.to_string();
    let peer_did_str = metadata.sage_did.clone().unwrap_or_else(|| secure.sender_did.clone());

    let Some((local_private, _local_public)) = &state.local_hpke_keypair else {
        return error_response(SageError::new(SageErrorCode::BadRequest, "no local HPKE keypair configured"), &local_did_str, &peer_did_str, true);
    };
    let peer_did = match sage_identity::Did::parse(&peer_did_str) {
        Ok(did) => did,
        Err(e) => return error_response(SageError::new(SageErrorCode::InvalidDid, e.to_string()), &local_did_str, &peer_did_str, true),
    };
    let Some(peer_hpke_public_key) = state.hpke_keys.get(&peer_did) else {
        return error_response(SageError::new(SageErrorCode::BadRequest, format!("no HPKE public key on file for {peer_did}")), &local_did_str, &peer_did_str, true);
    };

    let request: HandshakeRequest = match serde_json::from_slice(&secure.payload) {
        Ok(r) => r,
        Err(e) => return error_response(SageError::new(SageErrorCode::BadRequest, e.to_string()), &local_did_str, &peer_did_str, true),
    };

    let handshake_response = match state.sessions.accept_handshake(&request, local_private, peer_hpke_public_key) {
        Ok(r) => r,
        Err(e) => return error_response(e.into(), &local_did_str, &peer_did_str, true),
    };

    let transport_response = serde_json::json!({
        "success": true,
        "message_id": secure.id,
        "task_id": secure.task_id,
        "data": handshake_response,
    });
    let mut response = Json(transport_response).into_response();
    response.headers_mut().insert("X-SAGE-Verified", "true".parse().unwrap());
    response.headers_mut().insert("X-SAGE-Signature-Valid", "true".parse().unwrap());
    response
}

pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(state.status_summary())
}
