//! Canonical events produced by classifying the agent stream.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::permission::PermissionDecision;

/// One classified event from the agent session.
///
/// Exactly one [`Event::PhaseResult`] terminates a phase, and it is always the
/// last event the executor processes for that phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    AgentUtterance {
        text: String,
    },
    ToolInvocationRequest {
        tool_name: String,
        arguments: Value,
        request_id: String,
    },
    ToolInvocationResult {
        request_id: String,
        result_text: String,
        truncated: bool,
    },
    PhaseResult {
        total_cost_usd: f64,
        succeeded: bool,
    },
}

impl Event {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::PhaseResult { .. })
    }
}

/// The orchestrator's answer to a tool invocation request, forwarded back into
/// the session before the stream advances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub request_id: String,
    pub tool_name: String,
    /// Arguments echoed back on approval.
    pub arguments: Value,
    pub decision: PermissionDecision,
    /// Explanation handed to the agent on rejection so it can adapt its plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ToolResponse {
    pub fn approve(request_id: &str, tool_name: &str, arguments: Value) -> Self {
        Self {
            request_id: request_id.to_string(),
            tool_name: tool_name.to_string(),
            arguments,
            decision: PermissionDecision::Approve,
            message: None,
        }
    }

    pub fn deny(request_id: &str, tool_name: &str, message: impl Into<String>) -> Self {
        Self {
            request_id: request_id.to_string(),
            tool_name: tool_name.to_string(),
            arguments: Value::Null,
            decision: PermissionDecision::Deny,
            message: Some(message.into()),
        }
    }

    pub fn is_approved(&self) -> bool {
        self.decision == PermissionDecision::Approve
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_phase_result_is_terminal() {
        assert!(
            Event::PhaseResult {
                total_cost_usd: 0.0,
                succeeded: true
            }
            .is_terminal()
        );
        assert!(!Event::AgentUtterance { text: "hi".into() }.is_terminal());
    }

    #[test]
    fn test_event_serializes_with_kind_tag() {
        let event = Event::ToolInvocationResult {
            request_id: "toolu_1".into(),
            result_text: "ok".into(),
            truncated: false,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "tool_invocation_result");
    }

    #[test]
    fn test_deny_response_carries_message() {
        let response = ToolResponse::deny("req-1", "Bash", "not allowed");
        assert!(!response.is_approved());
        assert_eq!(response.message.as_deref(), Some("not allowed"));
        assert_eq!(response.arguments, Value::Null);
    }
}
