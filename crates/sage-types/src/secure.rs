//! `SecureMessage` - the wire object framed by the transport layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role tag a `SecureMessage` carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecureRole {
    Agent,
    User,
}

/// The transport envelope: opaque payload bytes, sender identity, and a
/// string-to-string metadata map that carries `hpke_kid` / `ctype` among
/// other transport-level hints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecureMessage {
    pub id: String,
    /// Opaque payload bytes (plaintext JSON or HPKE ciphertext), base64 when
    /// this struct itself is JSON-serialized (e.g. in handshake mode).
    #[serde(with = "base64_bytes")]
    pub payload: Vec<u8>,
    #[serde(rename = "senderDid")]
    pub sender_did: String,
    #[serde(rename = "contextId", skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(rename = "taskId", skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub role: SecureRole,
}

impl SecureMessage {
    pub fn new(sender_did: impl Into<String>, payload: Vec<u8>, role: SecureRole) -> Self {
        Self {
            id: format!("sm_{}", Uuid::new_v4()),
            payload,
            sender_did: sender_did.into(),
            context_id: None,
            task_id: None,
            metadata: BTreeMap::new(),
            role,
        }
    }

    pub fn with_context(mut self, context_id: Option<String>, task_id: Option<String>) -> Self {
        self.context_id = context_id;
        self.task_id = task_id;
        self
    }

    pub fn hpke_kid(&self) -> Option<&str> {
        self.metadata.get("hpke_kid").map(|s| s.as_str())
    }

    pub fn set_hpke_kid(&mut self, kid: impl Into<String>) {
        self.metadata.insert("hpke_kid".to_string(), kid.into());
    }

    pub fn ctype(&self) -> Option<&str> {
        self.metadata.get("ctype").map(|s| s.as_str())
    }
}

mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        base64::engine::general_purpose::STANDARD
            .decode(s.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_json_with_base64_payload() {
        let mut msg = SecureMessage::new("did:sage:ethereum:0xabc", b"hello world".to_vec(), SecureRole::Agent);
        msg.set_hpke_kid("kid-1");

        let json = serde_json::to_string(&msg).unwrap();
        let back: SecureMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(msg.payload, back.payload);
        assert_eq!(back.hpke_kid(), Some("kid-1"));
    }
}
