use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use super::registry::OrchestratorRegistry;
use super::{OrchestratorSettings, Workflow};
use crate::agents::{AgentDefinition, AgentName};
use crate::errors::{OrchestratorError, PhaseExecutionError};
use crate::executor::{PhaseExecutor, PhaseOutcome};
use crate::ledger::{CostLedger, CostSummary};
use crate::permission::{ApprovalCallback, PermissionPolicy};
use crate::phase::{InvocationContext, PhaseSpec};
use crate::session::{AgentSession, SessionFactory, SessionOptions};
use crate::stream::MessageClassifier;
use crate::ui::OrchestratorUI;
use crate::verify::{ArtifactPolicy, OutputVerifier};

/// Everything a run produced, including after a phase failure.
#[derive(Debug)]
pub struct OrchestratorRunResult {
    pub run_id: Uuid,
    pub domain: String,
    pub output_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Phases that reached a successful result, in order.
    pub completed_phases: Vec<String>,
    pub phase_outcomes: Vec<PhaseOutcome>,
    pub cost_ledger: CostLedger,
    pub verified_artifacts: BTreeSet<PathBuf>,
    pub missing_artifacts: BTreeSet<PathBuf>,
    pub artifact_sizes: BTreeMap<PathBuf, u64>,
    /// The phase failure that stopped the run, if any.
    pub failure: Option<Box<PhaseExecutionError>>,
}

impl OrchestratorRunResult {
    pub fn total_cost(&self) -> f64 {
        self.cost_ledger.total_cost()
    }

    pub fn cost_summary(&self) -> CostSummary {
        self.cost_ledger.summary()
    }

    /// Every phase completed and every artifact is present.
    pub fn is_success(&self) -> bool {
        self.failure.is_none() && self.missing_artifacts.is_empty()
    }

    pub fn exit_code(&self) -> i32 {
        match &self.failure {
            Some(failure) if failure.is_cancelled() => 130,
            Some(_) => 1,
            None if !self.missing_artifacts.is_empty() => 2,
            None => 0,
        }
    }
}

/// Runs one workflow over a single agent session.
pub struct Orchestrator<W: Workflow> {
    workflow: W,
    sessions: Arc<dyn SessionFactory>,
    approvals: Arc<dyn ApprovalCallback>,
    settings: OrchestratorSettings,
    classifier: MessageClassifier,
    ui: Option<Arc<OrchestratorUI>>,
}

impl<W: Workflow> Orchestrator<W> {
    pub fn new(
        workflow: W,
        sessions: Arc<dyn SessionFactory>,
        approvals: Arc<dyn ApprovalCallback>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            workflow,
            sessions,
            approvals,
            settings,
            classifier: MessageClassifier::default(),
            ui: None,
        }
    }

    pub fn with_ui(mut self, ui: Arc<OrchestratorUI>) -> Self {
        self.ui = Some(ui);
        self
    }

    pub fn with_classifier(mut self, classifier: MessageClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn workflow(&self) -> &W {
        &self.workflow
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Run every phase in order, stopping at the first failure.
    ///
    /// Phase failures are reported in the returned result. `Err` is reserved
    /// for problems that prevent the run from starting, and for missing
    /// artifacts under [`ArtifactPolicy::Strict`].
    pub async fn run(
        &self,
        cancel: &CancellationToken,
    ) -> Result<OrchestratorRunResult, OrchestratorError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let domain = self.workflow.domain().to_string();
        let phases = self.workflow.phases();

        let agents = self.workflow.agent_definitions()?;
        self.prepare_output()?;

        info!(%run_id, domain = %domain, phases = phases.len(), "Starting run");
        if let Some(ui) = &self.ui {
            ui.print_banner(&domain, self.workflow.output_dir());
        }

        let mut session = self.open_session(agents).await?;
        let executor = self.executor();
        let mut ledger = CostLedger::new();
        let mut outcomes = Vec::new();
        let mut failure = None;

        for (index, phase) in phases.iter().enumerate() {
            if let Some(ui) = &self.ui {
                ui.print_phase_header(index + 1, phases.len(), &phase.name, phase.agent.as_str());
                ui.start_phase(&phase.name);
            }
            match executor
                .execute(session.as_mut(), phase, &mut ledger, cancel)
                .await
            {
                Ok(outcome) => {
                    if let Some(ui) = &self.ui {
                        ui.phase_complete(&outcome.phase_name, outcome.cost_usd);
                    }
                    outcomes.push(outcome);
                }
                Err(err) => {
                    if let Some(ui) = &self.ui {
                        ui.phase_failed(&err.phase_name, &err.cause.to_string(), err.partial_cost_usd);
                    }
                    failure = Some(Box::new(err));
                    break;
                }
            }
        }

        close_session(session.as_mut()).await;

        let report = OutputVerifier.verify(&self.workflow.expected_artifacts());
        if let Some(ui) = &self.ui {
            ui.finish();
            ui.show_verification(&report);
        }
        for path in &report.missing {
            warn!(path = %path.display(), "Expected artifact missing");
        }

        let result = OrchestratorRunResult {
            run_id,
            domain,
            output_dir: self.workflow.output_dir().to_path_buf(),
            started_at,
            finished_at: Utc::now(),
            completed_phases: outcomes.iter().map(|o| o.phase_name.clone()).collect(),
            phase_outcomes: outcomes,
            cost_ledger: ledger,
            verified_artifacts: report.present,
            missing_artifacts: report.missing,
            artifact_sizes: report.sizes,
            failure,
        };
        info!(
            %run_id,
            completed = result.completed_phases.len(),
            total_cost_usd = result.total_cost(),
            missing = result.missing_artifacts.len(),
            failed = result.failure.is_some(),
            "Run finished"
        );
        if let Some(ui) = &self.ui {
            ui.print_summary(&result);
        }

        if self.settings.artifact_policy == ArtifactPolicy::Strict
            && result.failure.is_none()
            && !result.missing_artifacts.is_empty()
        {
            return Err(OrchestratorError::MissingArtifacts {
                missing: result.missing_artifacts.iter().cloned().collect(),
                result: Box::new(result),
            });
        }
        Ok(result)
    }

    /// Run one named phase in its own session, with `context` merged into
    /// the prompt. Cost is tracked in a ledger local to the call.
    pub async fn run_phase(
        &self,
        phase_name: &str,
        context: &InvocationContext,
        cancel: &CancellationToken,
    ) -> Result<PhaseOutcome, OrchestratorError> {
        let phase = self
            .find_phase(phase_name)
            .ok_or_else(|| OrchestratorError::UnknownPhase {
                orchestrator: self.workflow.domain().to_string(),
                phase: phase_name.to_string(),
            })?
            .with_context(context);

        let definition = self.workflow.agent_definition(&phase.agent).ok_or_else(|| {
            OrchestratorError::UnknownAgent {
                phase: phase.name.clone(),
                agent: phase.agent.to_string(),
            }
        })?;
        self.prepare_output()?;

        let mut agents = BTreeMap::new();
        agents.insert(phase.agent.as_str().to_string(), definition);
        let mut session = self.open_session(agents).await?;

        let mut ledger = CostLedger::new();
        let result = self
            .executor()
            .execute(session.as_mut(), &phase, &mut ledger, cancel)
            .await;
        close_session(session.as_mut()).await;

        Ok(result?)
    }

    /// Invoke a phase on another registered orchestrator on behalf of this one.
    pub async fn invoke(
        &self,
        registry: &OrchestratorRegistry,
        target: &str,
        phase_name: &str,
        context: InvocationContext,
        cancel: &CancellationToken,
    ) -> Result<PhaseOutcome, OrchestratorError> {
        let context = InvocationContext {
            caller: Some(self.workflow.domain().to_string()),
            ..context
        };
        if let Some(ui) = &self.ui {
            ui.show_cross_invocation(self.workflow.domain(), target, phase_name, &context.keys());
        }
        registry.invoke(target, phase_name, &context, cancel).await
    }

    fn find_phase(&self, phase_name: &str) -> Option<PhaseSpec<W::Agent>> {
        self.workflow
            .phases()
            .into_iter()
            .find(|p| p.name == phase_name)
    }

    fn executor(&self) -> PhaseExecutor {
        let policy = PermissionPolicy::new(
            self.settings.mode,
            self.workflow.allowed_tools(),
            Arc::clone(&self.approvals),
        )
        .with_approval_timeout(self.settings.approval_timeout);
        PhaseExecutor::new(policy)
            .with_classifier(self.classifier)
            .with_ui(self.ui.clone())
    }

    fn prepare_output(&self) -> Result<(), OrchestratorError> {
        let root = self.workflow.output_dir();
        let mut dirs = vec![root.to_path_buf()];
        dirs.extend(self.workflow.output_subdirs().into_iter().map(|d| root.join(d)));
        for dir in dirs {
            std::fs::create_dir_all(&dir)
                .map_err(|source| OrchestratorError::OutputSetup { path: dir, source })?;
        }
        Ok(())
    }

    async fn open_session(
        &self,
        agents: BTreeMap<String, AgentDefinition>,
    ) -> Result<Box<dyn AgentSession>, OrchestratorError> {
        let options = SessionOptions {
            domain: self.workflow.domain().to_string(),
            agents,
            allowed_tools: self.workflow.allowed_tools(),
            model: self.settings.model,
            cwd: self.settings.cwd.clone(),
        };
        self.sessions
            .open(&options)
            .await
            .map_err(OrchestratorError::SessionCreation)
    }
}

async fn close_session(session: &mut dyn AgentSession) {
    if let Err(e) = session.close().await {
        warn!(error = %e, "Failed to close agent session");
    }
}
