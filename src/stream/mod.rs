//! Raw agent stream frames and helpers for presenting them.
//!
//! The agent runtime speaks newline-delimited JSON. Each line becomes one
//! [`RawEvent`]; [`classify::MessageClassifier`] maps it onto an
//! [`crate::event::Event`].

use serde_json::Value;

pub mod classify;
pub mod frames;

pub use classify::MessageClassifier;

/// One frame read from the agent session, before classification.
#[derive(Debug, Clone, PartialEq)]
pub enum RawEvent {
    /// A line that parsed as JSON.
    Frame(Value),
    /// A line that did not (runtime chatter on stdout, partial writes).
    Unparsed(String),
}

impl RawEvent {
    pub fn from_line(line: &str) -> Self {
        match serde_json::from_str::<Value>(line) {
            Ok(value) => RawEvent::Frame(value),
            Err(_) => RawEvent::Unparsed(line.to_string()),
        }
    }

    /// The frame's `type` field, if any.
    pub fn frame_type(&self) -> Option<&str> {
        match self {
            RawEvent::Frame(value) => value.get("type").and_then(Value::as_str),
            RawEvent::Unparsed(_) => None,
        }
    }
}

/// Extract a human-readable description from a tool invocation
pub fn describe_tool_use(name: &str, input: &Value) -> String {
    let str_field = |key: &str| input.get(key).and_then(Value::as_str);
    match name {
        "Read" => format!(
            "Reading: {}",
            str_field("file_path").map(shorten_path).unwrap_or_else(|| "file".to_string())
        ),
        "Write" => format!(
            "Writing: {}",
            str_field("file_path").map(shorten_path).unwrap_or_else(|| "file".to_string())
        ),
        "Edit" => format!(
            "Editing: {}",
            str_field("file_path").map(shorten_path).unwrap_or_else(|| "file".to_string())
        ),
        "Bash" => format!(
            "Running: {}",
            str_field("command")
                .map(|s| truncate_chars(s, 60))
                .unwrap_or_else(|| "command".to_string())
        ),
        "Glob" => format!("Searching: {}", str_field("pattern").unwrap_or("*")),
        "Grep" => format!(
            "Grep: {}",
            str_field("pattern")
                .map(|s| truncate_chars(s, 30))
                .unwrap_or_else(|| "pattern".to_string())
        ),
        "WebSearch" => format!("Web search: {}", str_field("query").unwrap_or("query")),
        "Task" => format!("Agent: {}", str_field("description").unwrap_or("subagent")),
        _ => name.to_string(),
    }
}

/// Get an emoji for a tool
pub fn tool_emoji(name: &str) -> &'static str {
    match name {
        "Read" => "\u{1F4D6}",        // 📖
        "Write" => "\u{1F4DD}",       // 📝
        "Edit" => "\u{270F}\u{FE0F}", // ✏️
        "Bash" => "\u{2699}\u{FE0F}", // ⚙️
        "Glob" => "\u{1F50D}",        // 🔍
        "Grep" => "\u{1F50E}",        // 🔎
        "WebSearch" => "\u{1F310}",   // 🌐
        "Task" => "\u{1F916}",        // 🤖
        _ => "\u{1F527}",             // 🔧
    }
}

/// Shorten a file path to just the last 2 components
fn shorten_path(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() <= 2 {
        path.to_string()
    } else {
        parts[parts.len() - 2..].join("/")
    }
}

/// Truncate on a char boundary, appending an ellipsis when shortened.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// First line of an utterance, trimmed to a snippet
pub fn truncate_thinking(text: &str, max_len: usize) -> String {
    let first_line = text.lines().next().unwrap_or(text);
    truncate_chars(first_line.trim(), max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_event_from_line() {
        let raw = RawEvent::from_line(r#"{"type":"system","subtype":"init"}"#);
        assert_eq!(raw.frame_type(), Some("system"));

        let raw = RawEvent::from_line("npm WARN deprecated");
        assert_eq!(raw, RawEvent::Unparsed("npm WARN deprecated".to_string()));
        assert_eq!(raw.frame_type(), None);
    }

    #[test]
    fn test_describe_tool_use() {
        let input = serde_json::json!({"file_path": "/Users/foo/project/src/main.rs"});
        assert_eq!(describe_tool_use("Read", &input), "Reading: src/main.rs");

        let input = serde_json::json!({"command": "cargo test --release"});
        assert_eq!(
            describe_tool_use("Bash", &input),
            "Running: cargo test --release"
        );

        assert_eq!(describe_tool_use("Mystery", &Value::Null), "Mystery");
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdefghij", 8), "abcde...");
        // Multi-byte characters must not be split
        let s = "日本語のテキストです";
        let out = truncate_chars(s, 6);
        assert_eq!(out, "日本語...");
    }

    #[test]
    fn test_truncate_thinking_takes_first_line() {
        let text = "  Looking at the module layout  \nthen the tests";
        assert_eq!(truncate_thinking(text, 60), "Looking at the module layout");
    }
}
