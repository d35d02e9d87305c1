//! Typed error hierarchy for the conductor orchestrator.
//!
//! Errors are grouped by the layer that raises them:
//! - `SessionError`: the agent runtime connection
//! - `ClassificationError`: a single unclassifiable stream frame (never fatal)
//! - `LedgerError`: cost bookkeeping violations
//! - `ApprovalError`: the out-of-band approval channel
//! - `PhaseError` / `PhaseExecutionError`: one phase failing
//! - `OrchestratorError`: everything surfaced to the caller of a run

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::event::Event;
use crate::orchestrator::OrchestratorRunResult;

/// Errors from the agent runtime connection.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to spawn agent runtime '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Agent session is already closed")]
    Closed,

    #[error("Failed to write to agent session: {0}")]
    Write(#[source] std::io::Error),

    #[error("Failed to read from agent session: {0}")]
    Read(#[source] std::io::Error),

    #[error("Failed to encode session frame: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Agent runtime exited unexpectedly (exit code {0:?})")]
    Exited(Option<i32>),

    #[error("{0}")]
    Runtime(String),
}

/// A raw frame that could not be mapped onto an [`Event`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassificationError {
    #[error("Malformed event frame: {0}")]
    Malformed(String),

    #[error("Unrecognized event type '{0}'")]
    UnknownType(String),

    /// Runtime bookkeeping frames (`system`, partial stream deltas) that carry
    /// nothing the orchestrator acts on.
    #[error("Diagnostic frame of type '{0}'")]
    Diagnostic(String),

    #[error("Frame of type '{kind}' is missing field '{field}'")]
    MissingField { kind: String, field: &'static str },

    #[error("Message frame carries no content blocks")]
    EmptyContent,

    #[error("Message frame carries {0} content blocks; expected exactly one")]
    MultipleBlocks(usize),

    #[error("Unsupported content block type '{0}'")]
    UnsupportedBlock(String),

    #[error("Unsupported control request subtype '{0}'")]
    UnsupportedControl(String),
}

impl ClassificationError {
    /// Diagnostic frames are expected traffic and only worth a debug line.
    pub fn is_diagnostic(&self) -> bool {
        matches!(self, ClassificationError::Diagnostic(_))
    }
}

/// Errors from the cost ledger.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("Cost for phase '{phase}' was already recorded")]
    DuplicatePhase { phase: String },

    #[error("Invalid cost {cost} for phase '{phase}': cost must be a finite, non-negative amount")]
    InvalidCost { phase: String, cost: f64 },
}

/// Errors from the out-of-band approval channel.
#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("Approval prompt failed: {0}")]
    Prompt(String),

    #[error("Approval task aborted: {0}")]
    Aborted(String),
}

/// Why a single phase failed.
#[derive(Debug, Error)]
pub enum PhaseError {
    #[error("Agent reported the phase as unsuccessful")]
    AgentReportedFailure,

    #[error("Event stream ended without a phase result")]
    StreamEnded,

    #[error("Cancelled")]
    Cancelled,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Approval(#[from] ApprovalError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// A failed phase, with enough context for an operator to resume by hand.
#[derive(Debug, Error)]
#[error("Phase '{phase_name}' failed: {cause}")]
pub struct PhaseExecutionError {
    pub phase_name: String,
    pub agent: String,
    #[source]
    pub cause: PhaseError,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    /// Cost already recorded for this phase (0.0 when no result arrived).
    pub partial_cost_usd: f64,
    /// Last event that was classified before the failure.
    pub last_event: Option<Event>,
    pub tool_approvals: usize,
    pub tool_denials: usize,
    pub skipped_frames: usize,
}

impl PhaseExecutionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self.cause, PhaseError::Cancelled)
    }
}

/// Errors surfaced to the caller of an orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Failed to create agent session: {0}")]
    SessionCreation(#[source] SessionError),

    #[error("Phase '{phase}' references unknown agent '{agent}'")]
    UnknownAgent { phase: String, agent: String },

    #[error(transparent)]
    PhaseExecution(#[from] Box<PhaseExecutionError>),

    #[error("Orchestrator '{name}' is not registered")]
    UnregisteredOrchestrator { name: String },

    #[error("Orchestrator '{orchestrator}' has no phase named '{phase}'")]
    UnknownPhase { orchestrator: String, phase: String },

    #[error("{} expected artifact(s) missing after run", .missing.len())]
    MissingArtifacts {
        missing: Vec<PathBuf>,
        result: Box<OrchestratorRunResult>,
    },

    #[error("Failed to prepare output directory {path}: {source}")]
    OutputSetup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<PhaseExecutionError> for OrchestratorError {
    fn from(err: PhaseExecutionError) -> Self {
        OrchestratorError::PhaseExecution(Box::new(err))
    }
}
