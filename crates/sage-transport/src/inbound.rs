//! Inbound pipeline: the five composable steps of spec.md §4.E. Kept as
//! plain async functions rather than a tower `Layer` (the teacher's
//! `AuthMiddleware` shape) because HPKE demuxing has to happen before a
//! typed body extractor can run, and each server binary wires the steps
//! together in its own `/process` handler.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use http::HeaderMap;
use sage_hpke::SessionManager;
use sage_identity::KeyAlgorithm;
use sage_sigs::SignableRequest;
use sage_types::secure::SecureMessage;

use crate::error::{TransportError, TransportResult};

/// Step 1: the handful of headers the pipeline cares about.
#[derive(Debug, Clone, Default)]
pub struct InboundMetadata {
    pub sage_did: Option<String>,
    pub hpke: Option<String>,
    pub kid: Option<String>,
    pub signature: Option<String>,
    pub signature_input: Option<String>,
    pub message_id: Option<String>,
    pub context_id: Option<String>,
    pub task_id: Option<String>,
    pub date: Option<String>,
}

pub fn extract_metadata(headers: &HeaderMap) -> InboundMetadata {
    let get = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(|s| s.to_string());
    InboundMetadata {
        sage_did: get("x-sage-did"),
        hpke: get("x-sage-hpke"),
        kid: get("x-kid"),
        signature: get("signature"),
        signature_input: get("signature-input"),
        message_id: get("x-sage-message-id"),
        context_id: get("x-sage-context-id").or_else(|| get("x-conversation-id")),
        task_id: get("x-sage-task-id"),
        date: get("date"),
    }
}

/// Step 2: resolve the sender's key (the caller does DID resolution via
/// `sage-didreg`) and validate the RFC 9421 signature. Skipped only when the
/// server runs in unsigned mode.
pub fn verify_signature(
    metadata: &InboundMetadata,
    method: &str,
    path: &str,
    content_type: &str,
    algorithm: KeyAlgorithm,
    public_key_bytes: &[u8],
) -> TransportResult<()> {
    let sage_did = metadata.sage_did.as_deref().ok_or(TransportError::MissingHeader("X-SAGE-DID"))?;
    let signature_input = metadata.signature_input.as_deref().ok_or(TransportError::MissingHeader("Signature-Input"))?;
    let signature = metadata.signature.as_deref().ok_or(TransportError::MissingHeader("Signature"))?;
    let date = metadata.date.as_deref().ok_or(TransportError::MissingHeader("Date"))?;

    let signable = SignableRequest {
        method: method.to_string(),
        path: path.to_string(),
        content_type: content_type.to_string(),
        date: date.to_string(),
        sage_did: sage_did.to_string(),
    };

    let ok = sage_sigs::verify(&signable, signature_input, signature, algorithm, public_key_bytes)?;
    if ok {
        Ok(())
    } else {
        Err(TransportError::InvalidSignature)
    }
}

/// Step 3: reject messages outside the configured clock-skew/dedup window.
/// `seen` holds `message_id -> arrival_unix_seconds`; entries older than the
/// window are lazily evicted on each check.
pub struct ReplayGuard {
    seen: DashMap<String, u64>,
    window: Duration,
}

impl ReplayGuard {
    pub fn new(window: Duration) -> Self {
        Self { seen: DashMap::new(), window }
    }

    pub fn check(&self, message_id: &str, claimed_timestamp: Option<SystemTime>) -> TransportResult<()> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();

        if let Some(ts) = claimed_timestamp {
            let claimed = ts.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
            let skew = now.abs_diff(claimed);
            if skew > self.window.as_secs() {
                return Err(TransportError::ExpiredMessage);
            }
        }

        self.seen.retain(|_, seen_at| now.saturating_sub(*seen_at) <= self.window.as_secs());

        if self.seen.contains_key(message_id) {
            return Err(TransportError::ReplayedMessage(message_id.to_string()));
        }
        self.seen.insert(message_id.to_string(), now);
        Ok(())
    }
}

/// Step 4 outcome: either the body was already plaintext, or it was
/// HPKE-decrypted, or it's the handshake payload for the session manager to
/// process.
pub enum DemuxOutcome {
    Plaintext(Vec<u8>),
    HandshakeBody(SecureMessage),
}

pub fn demux_hpke(metadata: &InboundMetadata, body: &[u8], sessions: &SessionManager) -> TransportResult<DemuxOutcome> {
    if metadata.hpke.as_deref() != Some("v1") {
        return Ok(DemuxOutcome::Plaintext(body.to_vec()));
    }

    match &metadata.kid {
        Some(kid) => {
            let plaintext = sessions.decrypt(kid, body)?;
            Ok(DemuxOutcome::Plaintext(plaintext))
        }
        None => {
            let message: SecureMessage = serde_json::from_slice(body).map_err(|_| TransportError::MissingHeader("handshake body"))?;
            Ok(DemuxOutcome::HandshakeBody(message))
        }
    }
}
