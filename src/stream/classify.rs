//! Maps raw stream frames onto canonical [`Event`]s.
//!
//! | Frame type        | Content                         | Event                    |
//! |-------------------|---------------------------------|--------------------------|
//! | `assistant`       | one `text` block                | `AgentUtterance`         |
//! | `control_request` | subtype `can_use_tool`          | `ToolInvocationRequest`  |
//! | `user`            | one `tool_result` block         | `ToolInvocationResult`   |
//! | `result`          | cost + error flag               | `PhaseResult`            |
//!
//! Everything else is a [`ClassificationError`]. Callers log and skip those;
//! a single odd frame never ends a phase.

use serde::Deserialize;
use serde_json::Value;

use super::RawEvent;
use crate::errors::ClassificationError;
use crate::event::Event;

/// Tool output longer than this is cut and flagged as truncated.
pub const DEFAULT_MAX_RESULT_CHARS: usize = 2000;

/// Frame types the runtime emits for its own bookkeeping.
const DIAGNOSTIC_FRAMES: &[&str] = &[
    "system",
    "stream_event",
    "keep_alive",
    "control_response",
    "control_cancel_request",
];

#[derive(Debug, Deserialize)]
struct MessageFrame {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Value,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: Value,
    },
}

#[derive(Debug, Deserialize)]
struct ControlFrame {
    request_id: Option<String>,
    request: ControlRequest,
}

#[derive(Debug, Deserialize)]
struct ControlRequest {
    subtype: String,
    #[serde(default)]
    tool_name: Option<String>,
    #[serde(default)]
    input: Value,
}

#[derive(Debug, Deserialize)]
struct ResultFrame {
    #[serde(default)]
    subtype: String,
    #[serde(default)]
    is_error: bool,
    #[serde(default)]
    total_cost_usd: Option<f64>,
}

/// Stateless classifier for agent stream frames.
#[derive(Debug, Clone, Copy)]
pub struct MessageClassifier {
    max_result_chars: usize,
}

impl Default for MessageClassifier {
    fn default() -> Self {
        Self {
            max_result_chars: DEFAULT_MAX_RESULT_CHARS,
        }
    }
}

impl MessageClassifier {
    pub fn new(max_result_chars: usize) -> Self {
        Self { max_result_chars }
    }

    pub fn classify(&self, raw: &RawEvent) -> Result<Event, ClassificationError> {
        let value = match raw {
            RawEvent::Frame(value) => value,
            RawEvent::Unparsed(line) => {
                return Err(ClassificationError::Malformed(line.clone()));
            }
        };
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ClassificationError::Malformed(value.to_string()))?;

        match kind {
            "assistant" => self.classify_assistant(value),
            "user" => self.classify_user(value),
            "control_request" => classify_control(value),
            "result" => classify_result(value),
            other if DIAGNOSTIC_FRAMES.contains(&other) => {
                Err(ClassificationError::Diagnostic(other.to_string()))
            }
            other => Err(ClassificationError::UnknownType(other.to_string())),
        }
    }

    fn classify_assistant(&self, value: &Value) -> Result<Event, ClassificationError> {
        match single_block(value, "assistant")? {
            ContentBlock::Text { text } => Ok(Event::AgentUtterance { text }),
            ContentBlock::ToolResult { .. } => {
                Err(ClassificationError::UnsupportedBlock("tool_result".to_string()))
            }
        }
    }

    fn classify_user(&self, value: &Value) -> Result<Event, ClassificationError> {
        match single_block(value, "user")? {
            ContentBlock::ToolResult {
                tool_use_id,
                content,
            } => {
                let full = flatten_tool_content(&content);
                let truncated = full.chars().count() > self.max_result_chars;
                let result_text = if truncated {
                    full.chars().take(self.max_result_chars).collect()
                } else {
                    full
                };
                Ok(Event::ToolInvocationResult {
                    request_id: tool_use_id,
                    result_text,
                    truncated,
                })
            }
            // Echo of the prompt we submitted.
            ContentBlock::Text { .. } => Err(ClassificationError::Diagnostic("user".to_string())),
        }
    }
}

fn single_block(value: &Value, kind: &str) -> Result<ContentBlock, ClassificationError> {
    let frame: MessageFrame = serde_json::from_value(value.clone()).map_err(|_| {
        ClassificationError::MissingField {
            kind: kind.to_string(),
            field: "message",
        }
    })?;

    let block = match frame.message.content {
        Value::String(text) => return Ok(ContentBlock::Text { text }),
        Value::Array(mut blocks) => match blocks.len() {
            0 => return Err(ClassificationError::EmptyContent),
            1 => blocks.remove(0),
            n => return Err(ClassificationError::MultipleBlocks(n)),
        },
        Value::Null => return Err(ClassificationError::EmptyContent),
        other => return Err(ClassificationError::Malformed(other.to_string())),
    };

    let block_type = block
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    match block_type.as_str() {
        "text" | "tool_result" => serde_json::from_value(block)
            .map_err(|e| ClassificationError::Malformed(e.to_string())),
        // Announced tool calls are negotiated through control requests.
        "tool_use" | "thinking" | "redacted_thinking" => {
            Err(ClassificationError::Diagnostic(block_type))
        }
        _ => Err(ClassificationError::UnsupportedBlock(block_type)),
    }
}

fn classify_control(value: &Value) -> Result<Event, ClassificationError> {
    let frame: ControlFrame =
        serde_json::from_value(value.clone()).map_err(|_| ClassificationError::MissingField {
            kind: "control_request".to_string(),
            field: "request",
        })?;
    if frame.request.subtype != "can_use_tool" {
        return Err(ClassificationError::UnsupportedControl(frame.request.subtype));
    }
    let request_id = frame
        .request_id
        .ok_or_else(|| ClassificationError::MissingField {
            kind: "control_request".to_string(),
            field: "request_id",
        })?;
    let tool_name = frame
        .request
        .tool_name
        .ok_or_else(|| ClassificationError::MissingField {
            kind: "control_request".to_string(),
            field: "tool_name",
        })?;
    Ok(Event::ToolInvocationRequest {
        tool_name,
        arguments: frame.request.input,
        request_id,
    })
}

fn classify_result(value: &Value) -> Result<Event, ClassificationError> {
    let frame: ResultFrame = serde_json::from_value(value.clone())
        .map_err(|e| ClassificationError::Malformed(e.to_string()))?;
    let succeeded = !frame.is_error && frame.subtype == "success";
    Ok(Event::PhaseResult {
        total_cost_usd: frame.total_cost_usd.unwrap_or(0.0),
        succeeded,
    })
}

/// Tool output is either a plain string or a list of text blocks.
fn flatten_tool_content(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::frames;
    use serde_json::json;

    fn classify(raw: RawEvent) -> Result<Event, ClassificationError> {
        MessageClassifier::default().classify(&raw)
    }

    #[test]
    fn test_classify_assistant_text() {
        let event = classify(frames::text("Scanning the module tree")).unwrap();
        assert_eq!(
            event,
            Event::AgentUtterance {
                text: "Scanning the module tree".to_string()
            }
        );
    }

    #[test]
    fn test_classify_tool_request() {
        let event = classify(frames::tool_request(
            "req-7",
            "Read",
            json!({"file_path": "src/lib.rs"}),
        ))
        .unwrap();
        match event {
            Event::ToolInvocationRequest {
                tool_name,
                arguments,
                request_id,
            } => {
                assert_eq!(tool_name, "Read");
                assert_eq!(request_id, "req-7");
                assert_eq!(arguments["file_path"], "src/lib.rs");
            }
            other => panic!("Expected ToolInvocationRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_tool_result_with_block_list() {
        let raw = RawEvent::Frame(json!({
            "type": "user",
            "message": {"content": [{
                "type": "tool_result",
                "tool_use_id": "toolu_1",
                "content": [{"type": "text", "text": "line one"}, {"type": "text", "text": "line two"}]
            }]}
        }));
        let event = classify(raw).unwrap();
        assert_eq!(
            event,
            Event::ToolInvocationResult {
                request_id: "toolu_1".to_string(),
                result_text: "line one\nline two".to_string(),
                truncated: false,
            }
        );
    }

    #[test]
    fn test_classify_tool_result_truncates_long_output() {
        let long = "x".repeat(50);
        let event = MessageClassifier::new(10)
            .classify(&frames::tool_result("toolu_2", &long))
            .unwrap();
        match event {
            Event::ToolInvocationResult {
                result_text,
                truncated,
                ..
            } => {
                assert!(truncated);
                assert_eq!(result_text.len(), 10);
            }
            other => panic!("Expected ToolInvocationResult, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_result_success_and_failure() {
        assert_eq!(
            classify(frames::result(0.0123, true)).unwrap(),
            Event::PhaseResult {
                total_cost_usd: 0.0123,
                succeeded: true
            }
        );
        assert_eq!(
            classify(frames::result(0.5, false)).unwrap(),
            Event::PhaseResult {
                total_cost_usd: 0.5,
                succeeded: false
            }
        );
    }

    #[test]
    fn test_classify_result_without_cost_defaults_to_zero() {
        let raw = RawEvent::Frame(json!({"type": "result", "subtype": "success"}));
        assert_eq!(
            classify(raw).unwrap(),
            Event::PhaseResult {
                total_cost_usd: 0.0,
                succeeded: true
            }
        );
    }

    #[test]
    fn test_classify_result_needs_success_subtype() {
        let raw = RawEvent::Frame(json!({"type": "result", "is_error": false, "total_cost_usd": 0.2}));
        assert_eq!(
            classify(raw).unwrap(),
            Event::PhaseResult {
                total_cost_usd: 0.2,
                succeeded: false
            }
        );
        let raw = RawEvent::Frame(json!({
            "type": "result",
            "subtype": "error_max_turns",
            "is_error": false
        }));
        assert!(matches!(
            classify(raw).unwrap(),
            Event::PhaseResult { succeeded: false, .. }
        ));
    }

    #[test]
    fn test_classify_system_frame_is_diagnostic() {
        let err = classify(frames::system("init")).unwrap_err();
        assert!(err.is_diagnostic());
    }

    #[test]
    fn test_classify_rejects_unknown_and_malformed() {
        assert_eq!(
            classify(RawEvent::Frame(json!({"type": "telepathy"}))).unwrap_err(),
            ClassificationError::UnknownType("telepathy".to_string())
        );
        assert!(matches!(
            classify(RawEvent::Unparsed("not json".into())).unwrap_err(),
            ClassificationError::Malformed(_)
        ));
        assert!(matches!(
            classify(RawEvent::Frame(json!({"no_type": true}))).unwrap_err(),
            ClassificationError::Malformed(_)
        ));
    }

    #[test]
    fn test_classify_requires_exactly_one_block() {
        let empty = RawEvent::Frame(json!({"type": "assistant", "message": {"content": []}}));
        assert_eq!(classify(empty).unwrap_err(), ClassificationError::EmptyContent);

        let two = RawEvent::Frame(json!({"type": "assistant", "message": {"content": [
            {"type": "text", "text": "a"}, {"type": "text", "text": "b"}
        ]}}));
        assert_eq!(classify(two).unwrap_err(), ClassificationError::MultipleBlocks(2));
    }

    #[test]
    fn test_classify_other_control_requests_unsupported() {
        let raw = RawEvent::Frame(json!({
            "type": "control_request",
            "request_id": "r1",
            "request": {"subtype": "hook_callback"}
        }));
        assert_eq!(
            classify(raw).unwrap_err(),
            ClassificationError::UnsupportedControl("hook_callback".to_string())
        );
    }

    #[test]
    fn test_classify_control_request_missing_id() {
        let raw = RawEvent::Frame(json!({
            "type": "control_request",
            "request": {"subtype": "can_use_tool", "tool_name": "Read", "input": {}}
        }));
        assert!(matches!(
            classify(raw).unwrap_err(),
            ClassificationError::MissingField {
                field: "request_id",
                ..
            }
        ));
    }
}
