//! `AgentMessage` - the envelope passing through every hop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metadata::Metadata;

/// The kind of an `AgentMessage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Request,
    Response,
    Clarify,
    Confirm,
    Error,
}

/// The envelope passing through every hop between the façade, root, and the
/// external domain agents.
///
/// Immutable after emission: the dispatcher builds one per turn and nothing
/// downstream mutates it in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    pub id: String,
    pub source: String,
    pub destination: String,
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "contextId", skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl AgentMessage {
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        content: impl Into<String>,
        message_type: MessageType,
        context_id: Option<String>,
    ) -> Self {
        Self {
            id: format!("msg_{}", Uuid::new_v4()),
            source: source.into(),
            destination: destination.into(),
            content: content.into(),
            message_type,
            timestamp: Utc::now(),
            context_id,
            metadata: Metadata::new(),
        }
    }

    pub fn request(source: impl Into<String>, destination: impl Into<String>, content: impl Into<String>, context_id: Option<String>) -> Self {
        Self::new(source, destination, content, MessageType::Request, context_id)
    }

    pub fn response(source: impl Into<String>, destination: impl Into<String>, content: impl Into<String>, context_id: Option<String>) -> Self {
        Self::new(source, destination, content, MessageType::Response, context_id)
    }

    pub fn clarify(source: impl Into<String>, destination: impl Into<String>, content: impl Into<String>, context_id: Option<String>) -> Self {
        Self::new(source, destination, content, MessageType::Clarify, context_id)
    }

    pub fn confirm(source: impl Into<String>, destination: impl Into<String>, content: impl Into<String>, context_id: Option<String>) -> Self {
        Self::new(source, destination, content, MessageType::Confirm, context_id)
    }

    pub fn error(source: impl Into<String>, destination: impl Into<String>, content: impl Into<String>, context_id: Option<String>) -> Self {
        Self::new(source, destination, content, MessageType::Error, context_id)
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_of_serialize_is_identity() {
        let msg = AgentMessage::request("root", "payment", "hello", Some("c1".into()));
        let json = serde_json::to_string(&msg).unwrap();
        let back: AgentMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(msg.id, back.id);
        assert_eq!(msg.source, back.source);
        assert_eq!(msg.destination, back.destination);
        assert_eq!(msg.content, back.content);
        assert_eq!(msg.message_type, back.message_type);
        assert_eq!(msg.context_id, back.context_id);
    }

    #[test]
    fn message_type_serializes_snake_case() {
        let msg = AgentMessage::clarify("root", "payment", "need more info", None);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "clarify");
    }
}
