//! Multi-phase orchestration.
//!
//! A [`Workflow`] describes what to run: an ordered list of phases, the agents
//! they use, the tools they may touch and the artifacts they should leave
//! behind. An [`Orchestrator`] runs a workflow over a single agent session.
//! Orchestrators can call into each other's phases through an
//! [`OrchestratorRegistry`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::agents::{AgentDefinition, AgentName, Model};
use crate::errors::OrchestratorError;
use crate::permission::PermissionMode;
use crate::phase::PhaseSpec;
use crate::verify::ArtifactPolicy;

pub mod registry;
pub mod runner;

pub use registry::{Invocable, OrchestratorRegistry};
pub use runner::{Orchestrator, OrchestratorRunResult};

/// A domain-specific sequence of phases.
pub trait Workflow: Send + Sync + 'static {
    type Agent: AgentName;

    /// Short domain name, e.g. `architecture`.
    fn domain(&self) -> &str;

    /// Directory the workflow writes its artifacts into.
    fn output_dir(&self) -> &Path;

    /// Phases in execution order.
    fn phases(&self) -> Vec<PhaseSpec<Self::Agent>>;

    /// Definition for one agent. `None` means the agent is unknown.
    fn agent_definition(&self, agent: &Self::Agent) -> Option<AgentDefinition>;

    fn allowed_tools(&self) -> BTreeSet<String>;

    /// Files that should exist and be non-empty after a full run.
    fn expected_artifacts(&self) -> Vec<PathBuf>;

    /// Subdirectories of the output directory created before the run.
    fn output_subdirs(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    /// Definitions for every agent the phases reference, keyed by name.
    fn agent_definitions(&self) -> Result<BTreeMap<String, AgentDefinition>, OrchestratorError> {
        let mut definitions = BTreeMap::new();
        for phase in self.phases() {
            let definition = self.agent_definition(&phase.agent).ok_or_else(|| {
                OrchestratorError::UnknownAgent {
                    phase: phase.name.clone(),
                    agent: phase.agent.to_string(),
                }
            })?;
            definitions.insert(phase.agent.as_str().to_string(), definition);
        }
        Ok(definitions)
    }
}

/// Run-wide knobs shared by every workflow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrchestratorSettings {
    pub mode: PermissionMode,
    /// Bound on operator approvals; `None` waits forever.
    pub approval_timeout: Option<Duration>,
    pub artifact_policy: ArtifactPolicy,
    pub model: Option<Model>,
    /// Working directory for the agent runtime.
    pub cwd: PathBuf,
}
