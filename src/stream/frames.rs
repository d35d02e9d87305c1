//! Builders for the stream-json frames the classifier understands.
//!
//! These mirror what the agent runtime writes on stdout and are shared by the
//! scripted session double and the tests.

use serde_json::{Value, json};

use super::RawEvent;

/// Assistant text block.
pub fn text(text: &str) -> RawEvent {
    RawEvent::Frame(json!({
        "type": "assistant",
        "message": {
            "role": "assistant",
            "content": [{ "type": "text", "text": text }]
        }
    }))
}

/// Permission request for a tool call (`can_use_tool` control request).
pub fn tool_request(request_id: &str, tool_name: &str, input: Value) -> RawEvent {
    RawEvent::Frame(json!({
        "type": "control_request",
        "request_id": request_id,
        "request": {
            "subtype": "can_use_tool",
            "tool_name": tool_name,
            "input": input
        }
    }))
}

/// Tool output echoed back into the conversation.
pub fn tool_result(tool_use_id: &str, content: &str) -> RawEvent {
    RawEvent::Frame(json!({
        "type": "user",
        "message": {
            "role": "user",
            "content": [{
                "type": "tool_result",
                "tool_use_id": tool_use_id,
                "content": content
            }]
        }
    }))
}

/// Terminal frame for one query.
pub fn result(total_cost_usd: f64, succeeded: bool) -> RawEvent {
    RawEvent::Frame(json!({
        "type": "result",
        "subtype": if succeeded { "success" } else { "error_during_execution" },
        "is_error": !succeeded,
        "total_cost_usd": total_cost_usd
    }))
}

/// Runtime bookkeeping frame.
pub fn system(subtype: &str) -> RawEvent {
    RawEvent::Frame(json!({ "type": "system", "subtype": subtype }))
}
