//! Phase definitions and prompt construction.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::agents::AgentName;

/// One step of a workflow: which agent runs it and what it is asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseSpec<A: AgentName> {
    pub name: String,
    pub agent: A,
    pub prompt: String,
}

impl<A: AgentName> PhaseSpec<A> {
    pub fn new(name: impl Into<String>, agent: A, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            agent,
            prompt: prompt.into(),
        }
    }

    /// The text submitted to the session for this phase.
    pub fn submission(&self) -> String {
        format!(
            "Use the `{}` agent for this phase.\n\n{}",
            self.agent.as_str(),
            self.prompt.trim()
        )
    }

    /// A copy of this phase with a caller's context appended to the prompt.
    pub fn with_context(&self, context: &InvocationContext) -> Self {
        if context.is_empty() {
            return self.clone();
        }
        Self {
            name: self.name.clone(),
            agent: self.agent.clone(),
            prompt: format!("{}\n\n{}", self.prompt.trim(), context.as_prompt_section()),
        }
    }
}

/// Data handed from one orchestrator to another on a cross invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InvocationContext {
    /// Domain of the invoking orchestrator, if any.
    pub caller: Option<String>,
    pub values: BTreeMap<String, Value>,
}

impl InvocationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_caller(caller: impl Into<String>) -> Self {
        Self {
            caller: Some(caller.into()),
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.caller.is_none() && self.values.is_empty()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.values.keys().map(String::as_str).collect()
    }

    fn as_prompt_section(&self) -> String {
        let mut section = String::from("## CONTEXT FROM CALLER\n");
        if let Some(caller) = &self.caller {
            section.push_str(&format!("\nRequested by the `{}` orchestrator.\n", caller));
        }
        for (key, value) in &self.values {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            section.push_str(&format!("\n- **{}**: {}", key, rendered));
        }
        section
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec() -> PhaseSpec<String> {
        PhaseSpec::new(
            "API Documentation",
            "doc-writer".to_string(),
            "  Document every public endpoint.  ",
        )
    }

    #[test]
    fn test_submission_names_agent() {
        let text = spec().submission();
        assert!(text.starts_with("Use the `doc-writer` agent for this phase."));
        assert!(text.ends_with("Document every public endpoint."));
    }

    #[test]
    fn test_with_empty_context_is_unchanged() {
        let original = spec();
        assert_eq!(original.with_context(&InvocationContext::new()), original);
    }

    #[test]
    fn test_with_context_merges_values() {
        let ctx = InvocationContext::from_caller("architecture")
            .with("endpoints", json!(["GET /users", "POST /users"]))
            .with("style", "REST");
        let merged = spec().with_context(&ctx);

        assert_eq!(merged.name, "API Documentation");
        assert!(merged.prompt.contains("Requested by the `architecture` orchestrator."));
        assert!(merged.prompt.contains("- **style**: REST"));
        assert!(merged.prompt.contains("GET /users"));
        assert_eq!(ctx.keys(), vec!["endpoints", "style"]);
    }
}
