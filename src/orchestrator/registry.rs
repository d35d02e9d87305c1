//! Cross-orchestrator invocation.
//!
//! The registry is an explicit, shareable table of named orchestrators. It is
//! passed by reference to whoever needs it; there is no process-wide instance.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{Orchestrator, Workflow};
use crate::errors::OrchestratorError;
use crate::executor::PhaseOutcome;
use crate::phase::InvocationContext;

/// Something whose phases can be run one at a time by another orchestrator.
#[async_trait]
pub trait Invocable: Send + Sync {
    fn domain(&self) -> &str;

    fn phase_names(&self) -> Vec<String>;

    async fn invoke_phase(
        &self,
        phase_name: &str,
        context: &InvocationContext,
        cancel: &CancellationToken,
    ) -> Result<PhaseOutcome, OrchestratorError>;
}

#[async_trait]
impl<W: Workflow> Invocable for Orchestrator<W> {
    fn domain(&self) -> &str {
        self.workflow().domain()
    }

    fn phase_names(&self) -> Vec<String> {
        self.workflow().phases().into_iter().map(|p| p.name).collect()
    }

    async fn invoke_phase(
        &self,
        phase_name: &str,
        context: &InvocationContext,
        cancel: &CancellationToken,
    ) -> Result<PhaseOutcome, OrchestratorError> {
        self.run_phase(phase_name, context, cancel).await
    }
}

/// Name → orchestrator table. Cloning shares the same table.
#[derive(Clone, Default)]
pub struct OrchestratorRegistry {
    entries: Arc<Mutex<HashMap<String, Arc<dyn Invocable>>>>,
}

impl std::fmt::Debug for OrchestratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestratorRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl OrchestratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<dyn Invocable>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register `orchestrator` under `name`, replacing and returning any
    /// previous entry.
    pub fn register(
        &self,
        name: impl Into<String>,
        orchestrator: Arc<dyn Invocable>,
    ) -> Option<Arc<dyn Invocable>> {
        let name = name.into();
        let previous = self.lock().insert(name.clone(), orchestrator);
        if previous.is_some() {
            info!(name = %name, "Replaced registered orchestrator");
        } else {
            info!(name = %name, "Registered orchestrator");
        }
        previous
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Invocable>> {
        self.lock().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Run `phase_name` on the orchestrator registered as `name`.
    ///
    /// The lock is released before the phase runs.
    pub async fn invoke(
        &self,
        name: &str,
        phase_name: &str,
        context: &InvocationContext,
        cancel: &CancellationToken,
    ) -> Result<PhaseOutcome, OrchestratorError> {
        let target = self
            .get(name)
            .ok_or_else(|| OrchestratorError::UnregisteredOrchestrator {
                name: name.to_string(),
            })?;
        info!(
            caller = context.caller.as_deref().unwrap_or("-"),
            callee = name,
            phase = phase_name,
            context_keys = ?context.keys(),
            "Cross-orchestrator call"
        );
        target.invoke_phase(phase_name, context, cancel).await
    }
}
