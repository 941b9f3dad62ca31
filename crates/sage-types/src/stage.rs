//! Conversation stage, shared between the conversation store and the
//! dispatcher's state machine (spec.md §4.F / §4.I).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Idle,
    Collect,
    AwaitConfirm,
    Sent,
    Cancelled,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "",
            Stage::Collect => "collect",
            Stage::AwaitConfirm => "await_confirm",
            Stage::Sent => "sent",
            Stage::Cancelled => "cancelled",
        }
    }

    /// Parse the wire form the dispatcher persists (`""` means Idle).
    pub fn parse(s: &str) -> Self {
        match s {
            "collect" => Stage::Collect,
            "await_confirm" => Stage::AwaitConfirm,
            "sent" => Stage::Sent,
            "cancelled" => Stage::Cancelled,
            _ => Stage::Idle,
        }
    }

    /// Whether the intent router's "sticky payment" rule (spec.md §4.G)
    /// should apply for this stage.
    pub fn is_sticky(&self) -> bool {
        matches!(self, Stage::Collect | Stage::AwaitConfirm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_render_round_trip() {
        for stage in [Stage::Idle, Stage::Collect, Stage::AwaitConfirm, Stage::Sent, Stage::Cancelled] {
            assert_eq!(Stage::parse(stage.as_str()), stage);
        }
    }
}
