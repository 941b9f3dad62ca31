//! Outbound framing: the sign/hpke/handshake matrix of spec.md §4.D, built
//! on `reqwest` the way the teacher's LLM provider clients are built on it.

use sage_hpke::SessionManager;
use sage_identity::{Did, Signer};
use sage_sigs::SignableRequest;
use sage_types::secure::SecureMessage;
use serde::{Deserialize, Serialize};

use crate::error::{TransportError, TransportResult};

/// Which of the three framing booleans apply to this send.
#[derive(Debug, Clone, Copy)]
pub struct FramingMode {
    pub sign: bool,
    pub hpke: bool,
    pub handshake: bool,
}

impl FramingMode {
    pub const PLAIN: Self = Self { sign: false, hpke: false, handshake: false };
    pub const SIGNED: Self = Self { sign: true, hpke: false, handshake: false };
    pub const HPKE_DATA: Self = Self { sign: true, hpke: true, handshake: false };
    pub const HPKE_HANDSHAKE: Self = Self { sign: true, hpke: true, handshake: true };
}

/// Outcome of a POST to a peer's `/process` endpoint. Handshake mode gets a
/// structured transport response; data mode returns the raw body bytes.
#[derive(Debug)]
pub enum TransportOutcome {
    Handshake(TransportResponse),
    Data(Vec<u8>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportResponse {
    pub success: bool,
    #[serde(rename = "message_id", skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(rename = "task_id", skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
}

/// POST a `SecureMessage` to `{base}/process`, framing headers and body per
/// the matrix in spec.md §4.D. The transport never mutates the payload and
/// never signs itself - signing is delegated to `sage-sigs`/`signer` so
/// signature and TLS layering stay orthogonal. `sessions` is required
/// whenever `mode.hpke && !mode.handshake`: data-mode HPKE seals the
/// payload under `kid` before it ever reaches `reqwest`.
#[allow(clippy::too_many_arguments)]
pub async fn send(
    client: &reqwest::Client,
    base_url: &str,
    local_did: &Did,
    signer: Option<&Signer>,
    kid: Option<&str>,
    sessions: Option<&SessionManager>,
    message: &SecureMessage,
    mode: FramingMode,
) -> TransportResult<TransportOutcome> {
    let url = format!("{}/process", base_url.trim_end_matches('/'));
    let date = chrono::Utc::now().to_rfc2822();

    let content_type = match (mode.hpke, mode.handshake) {
        (false, _) => "application/json",
        (true, true) => "application/json",
        (true, false) => "application/sage+hpke",
    };

    let body: Vec<u8> = if mode.handshake {
        serde_json::to_vec(message).expect("SecureMessage always serializes")
    } else if mode.hpke {
        let kid = kid.ok_or(TransportError::MissingHeader("X-KID"))?;
        let sessions = sessions.ok_or(TransportError::MissingHeader("X-KID"))?;
        sessions.encrypt(kid, &message.payload)?
    } else {
        message.payload.clone()
    };

    let mut request = client.post(&url).header("Content-Type", content_type).header("X-SAGE-Message-ID", &message.id);

    if let Some(context_id) = &message.context_id {
        request = request.header("X-SAGE-Context-ID", context_id);
    }
    if let Some(task_id) = &message.task_id {
        request = request.header("X-SAGE-Task-ID", task_id);
    }

    if mode.hpke {
        request = request.header("X-SAGE-HPKE", "v1");
        if !mode.handshake {
            let kid = kid.ok_or(TransportError::MissingHeader("X-KID"))?;
            request = request.header("X-KID", kid);
        }
    }

    if mode.sign {
        let signer = signer.ok_or(TransportError::MissingHeader("Signature"))?;
        let did_header = local_did.to_string();
        let signable = SignableRequest {
            method: "POST".to_string(),
            path: "/process".to_string(),
            content_type: content_type.to_string(),
            date: date.clone(),
            sage_did: did_header.clone(),
        };
        let created = chrono::Utc::now().timestamp();
        let (signature_input, signature) = sage_sigs::sign(signer, &did_header, &signable, created)?;
        request = request
            .header("X-SAGE-DID", did_header)
            .header("Signature-Input", signature_input)
            .header("Signature", signature)
            .header("Date", date);
    }

    let response = request.body(body).send().await?;
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        return Err(TransportError::Upstream {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&bytes).to_string(),
        });
    }

    if mode.handshake {
        let parsed: TransportResponse = serde_json::from_slice(&bytes)
            .map_err(|e| TransportError::Upstream { status: status.as_u16(), body: e.to_string() })?;
        Ok(TransportOutcome::Handshake(parsed))
    } else {
        Ok(TransportOutcome::Data(bytes.to_vec()))
    }
}
