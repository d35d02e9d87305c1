//! Agent session boundary.
//!
//! An [`AgentSession`] is one continuous conversation with the agent runtime.
//! The orchestrator opens it through a [`SessionFactory`], submits one prompt
//! per phase and pulls raw frames until the phase's result frame arrives.
//!
//! - [`claude::ClaudeSessionFactory`] drives the Claude CLI in stream-json mode.
//! - [`scripted::ScriptedSessionFactory`] replays canned frames for tests.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use async_trait::async_trait;

use crate::agents::{AgentDefinition, Model};
use crate::errors::SessionError;
use crate::event::ToolResponse;
use crate::stream::RawEvent;

pub mod claude;
pub mod scripted;

pub use claude::ClaudeSessionFactory;
pub use scripted::{ScriptStep, ScriptedSessionFactory, SessionLog, SessionLogEntry};

/// Everything the runtime needs to start a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionOptions {
    /// Workflow domain, used for logging only.
    pub domain: String,
    pub agents: BTreeMap<String, AgentDefinition>,
    pub allowed_tools: BTreeSet<String>,
    /// Session model; `None` leaves the runtime default.
    pub model: Option<Model>,
    pub cwd: PathBuf,
}

/// One live conversation with the agent runtime.
///
/// `next_event` yields the frames for the most recent `query` and returns
/// `Ok(None)` once that query's stream is exhausted. It must be safe to drop a
/// pending `next_event` future; the orchestrator does so on cancellation.
#[async_trait]
pub trait AgentSession: Send {
    async fn query(&mut self, prompt: &str) -> Result<(), SessionError>;

    async fn next_event(&mut self) -> Result<Option<RawEvent>, SessionError>;

    /// Forward a permission decision for a pending tool request.
    async fn respond(&mut self, response: &ToolResponse) -> Result<(), SessionError>;

    /// Release the underlying connection. Calling it twice is harmless.
    async fn close(&mut self) -> Result<(), SessionError>;
}

#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, options: &SessionOptions) -> Result<Box<dyn AgentSession>, SessionError>;
}
