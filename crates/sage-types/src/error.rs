//! Stable error taxonomy (spec.md §7) shared across the whole system.
//!
//! Each crate defines its own `thiserror` error enum for its own concerns;
//! at the HTTP edge (the two service binaries) every error is converted into
//! a `SageError` carrying one of these stable codes, which in turn becomes
//! the `sage_verification_error` envelope or the façade's `{error, message}`
//! body.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The stable, wire-visible error code. Never rename a variant once shipped -
/// clients match on the string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SageErrorCode {
    InvalidSignature,
    PublicKeyNotFound,
    DidUnresolvable,
    ExpiredMessage,
    InvalidDid,
    HpkeInitEmptyKid,
    HpkeUnknownKid,
    HpkeDecrypt,
    HpkeWithoutSage,
    BadRequest,
    UpstreamError,
    Timeout,
    MissingSlots,
    AmbiguousConfirm,
    StaleConfirmToken,
    LlmUnavailable,
}

impl SageErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SageErrorCode::InvalidSignature => "INVALID_SIGNATURE",
            SageErrorCode::PublicKeyNotFound => "PUBLIC_KEY_NOT_FOUND",
            SageErrorCode::DidUnresolvable => "DID_UNRESOLVABLE",
            SageErrorCode::ExpiredMessage => "EXPIRED_MESSAGE",
            SageErrorCode::InvalidDid => "INVALID_DID",
            SageErrorCode::HpkeInitEmptyKid => "HPKE_INIT_EMPTY_KID",
            SageErrorCode::HpkeUnknownKid => "HPKE_UNKNOWN_KID",
            SageErrorCode::HpkeDecrypt => "HPKE_DECRYPT",
            SageErrorCode::HpkeWithoutSage => "HPKE_WITHOUT_SAGE",
            SageErrorCode::BadRequest => "BAD_REQUEST",
            SageErrorCode::UpstreamError => "UPSTREAM_ERROR",
            SageErrorCode::Timeout => "TIMEOUT",
            SageErrorCode::MissingSlots => "MISSING_SLOTS",
            SageErrorCode::AmbiguousConfirm => "AMBIGUOUS_CONFIRM",
            SageErrorCode::StaleConfirmToken => "STALE_CONFIRM_TOKEN",
            SageErrorCode::LlmUnavailable => "LLM_UNAVAILABLE",
        }
    }

    /// The HTTP status this code mirrors when surfaced at an edge.
    pub fn http_status(&self) -> u16 {
        match self {
            SageErrorCode::InvalidSignature
            | SageErrorCode::PublicKeyNotFound
            | SageErrorCode::DidUnresolvable
            | SageErrorCode::ExpiredMessage
            | SageErrorCode::InvalidDid => 401,
            SageErrorCode::HpkeWithoutSage | SageErrorCode::BadRequest => 400,
            SageErrorCode::UpstreamError => 502,
            SageErrorCode::Timeout => 504,
            SageErrorCode::HpkeInitEmptyKid | SageErrorCode::HpkeUnknownKid | SageErrorCode::HpkeDecrypt => 400,
            SageErrorCode::MissingSlots | SageErrorCode::AmbiguousConfirm | SageErrorCode::StaleConfirmToken => 200,
            SageErrorCode::LlmUnavailable => 200,
        }
    }
}

/// A structured SAGE error, ready to be rendered as the
/// `sage_verification_error` envelope (spec.md §6) or a façade error body.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{code:?}: {message}")]
pub struct SageError {
    pub code: SageErrorCode,
    pub message: String,
    #[serde(rename = "agentDid", skip_serializing_if = "Option::is_none")]
    pub agent_did: Option<String>,
    #[serde(rename = "messageId", skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl SageError {
    pub fn new(code: SageErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            agent_did: None,
            message_id: None,
            details: serde_json::Value::Null,
        }
    }

    pub fn with_agent(mut self, did: impl Into<String>) -> Self {
        self.agent_did = Some(did.into());
        self
    }

    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    /// The `sage_verification_error` wire envelope (spec.md §6).
    pub fn to_envelope(&self, from: &str, to: &str) -> serde_json::Value {
        serde_json::json!({
            "type": "sage_verification_error",
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
                "agentDid": self.agent_did,
                "messageId": self.message_id,
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "details": self.details,
            },
            "from": from,
            "to": to,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })
    }
}
