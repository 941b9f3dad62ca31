//! Deterministic conversation id derivation, per spec.md §4.F. Clients
//! without cookies must land on the same thread across retries, so every
//! step here is a pure function of the inbound request.

use sage_types::message::AgentMessage;

#[derive(Debug, Clone, Default)]
pub struct ConversationIdInputs<'a> {
    pub context_id_header: Option<&'a str>,
    pub conversation_id_header: Option<&'a str>,
    pub scenario_header: Option<&'a str>,
    pub sender: Option<&'a str>,
}

impl<'a> ConversationIdInputs<'a> {
    pub fn from_message(message: &'a AgentMessage, context_id_header: Option<&'a str>, conversation_id_header: Option<&'a str>, scenario_header: Option<&'a str>) -> Self {
        Self {
            context_id_header,
            conversation_id_header,
            scenario_header,
            sender: Some(message.source.as_str()),
        }
    }
}

/// Derive the conversation id, per the precedence in spec.md §4.F:
/// explicit header > message metadata (`conversationId`/`sessionId`/`cid`) >
/// `from:<sender>` > `scenario:<X-Scenario>` > `default`.
pub fn derive(message: &AgentMessage, inputs: &ConversationIdInputs) -> String {
    if let Some(id) = inputs.context_id_header.filter(|s| !s.is_empty()) {
        return id.to_string();
    }
    if let Some(id) = inputs.conversation_id_header.filter(|s| !s.is_empty()) {
        return id.to_string();
    }
    if let Some(id) = message.metadata.get("conversationId").and_then(|v| v.as_str()).filter(|s| !s.is_empty()) {
        return id.to_string();
    }
    if let Some(id) = message.metadata.get("sessionId").and_then(|v| v.as_str()).filter(|s| !s.is_empty()) {
        return id.to_string();
    }
    if let Some(id) = message.metadata.get("cid").and_then(|v| v.as_str()).filter(|s| !s.is_empty()) {
        return id.to_string();
    }
    if let Some(sender) = inputs.sender.filter(|s| !s.is_empty()) {
        return format!("from:{}", sender);
    }
    if let Some(scenario) = inputs.scenario_header.filter(|s| !s.is_empty()) {
        return format!("scenario:{}", scenario);
    }
    "default".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sage_types::message::AgentMessage;

    fn base_message() -> AgentMessage {
        AgentMessage::request("user-1", "sage-root", "hello", None)
    }

    #[test]
    fn explicit_header_wins_over_everything() {
        let message = base_message();
        let inputs = ConversationIdInputs {
            context_id_header: Some("ctx-abc"),
            ..Default::default()
        };
        assert_eq!(derive(&message, &inputs), "ctx-abc");
    }

    #[test]
    fn falls_back_to_sender_derived_id() {
        let message = base_message();
        let inputs = ConversationIdInputs {
            sender: Some("user-1"),
            ..Default::default()
        };
        assert_eq!(derive(&message, &inputs), "from:user-1");
    }

    #[test]
    fn falls_back_to_default_when_nothing_present() {
        let message = base_message();
        let inputs = ConversationIdInputs::default();
        assert_eq!(derive(&message, &inputs), "default");
    }
}
