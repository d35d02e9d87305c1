//! Per-run audit records, written as JSON next to the workflow output.

mod logger;

pub use logger::AuditLogger;

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agents::Model;
use crate::ledger::CostSummary;
use crate::orchestrator::OrchestratorRunResult;
use crate::permission::PermissionMode;
use crate::verify::ArtifactPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRun {
    pub run_id: Uuid,
    pub domain: String,
    pub output_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub config: RunConfig,
    pub phases: Vec<PhaseAudit>,
    pub costs: CostSummary,
    pub artifacts: ArtifactAudit,
    pub exit_code: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub permission_mode: PermissionMode,
    pub artifact_policy: ArtifactPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<Model>,
    pub project_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseAudit {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    pub duration_secs: f64,
    pub cost_usd: f64,
    pub outcome: PhaseOutcome,
    pub tool_approvals: usize,
    pub tool_denials: usize,
    pub skipped_frames: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PhaseOutcome {
    Completed,
    Failed { reason: String },
    Cancelled,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactAudit {
    pub verified: Vec<PathBuf>,
    pub missing: Vec<PathBuf>,
    pub sizes: BTreeMap<PathBuf, u64>,
}

impl AuditRun {
    pub fn from_result(result: &OrchestratorRunResult, config: RunConfig) -> Self {
        let mut phases: Vec<PhaseAudit> = result
            .phase_outcomes
            .iter()
            .map(|outcome| PhaseAudit {
                name: outcome.phase_name.clone(),
                agent: Some(outcome.agent.clone()),
                started_at: Some(outcome.started_at),
                duration_secs: outcome.duration.as_secs_f64(),
                cost_usd: outcome.cost_usd,
                outcome: PhaseOutcome::Completed,
                tool_approvals: outcome.tool_approvals,
                tool_denials: outcome.tool_denials,
                skipped_frames: outcome.skipped_frames,
            })
            .collect();

        if let Some(failure) = &result.failure {
            let outcome = if failure.is_cancelled() {
                PhaseOutcome::Cancelled
            } else {
                PhaseOutcome::Failed {
                    reason: failure.cause.to_string(),
                }
            };
            phases.push(PhaseAudit {
                name: failure.phase_name.clone(),
                agent: Some(failure.agent.clone()),
                started_at: Some(failure.started_at),
                duration_secs: failure.duration.as_secs_f64(),
                cost_usd: failure.partial_cost_usd,
                outcome,
                tool_approvals: failure.tool_approvals,
                tool_denials: failure.tool_denials,
                skipped_frames: failure.skipped_frames,
            });
        }

        Self {
            run_id: result.run_id,
            domain: result.domain.clone(),
            output_dir: result.output_dir.clone(),
            started_at: result.started_at,
            ended_at: result.finished_at,
            config,
            phases,
            costs: result.cost_summary(),
            artifacts: ArtifactAudit {
                verified: result.verified_artifacts.iter().cloned().collect(),
                missing: result.missing_artifacts.iter().cloned().collect(),
                sizes: result.artifact_sizes.clone(),
            },
            exit_code: result.exit_code(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{PhaseError, PhaseExecutionError};
    use crate::ledger::CostLedger;
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn failed_run(cause: PhaseError) -> OrchestratorRunResult {
        let mut ledger = CostLedger::new();
        ledger.record_phase_cost("Data Flow Analysis", 0.07).unwrap();
        let now = Utc::now();
        OrchestratorRunResult {
            run_id: Uuid::new_v4(),
            domain: "architecture".to_string(),
            output_dir: PathBuf::from("repo_analysis"),
            started_at: now,
            finished_at: now,
            completed_phases: Vec::new(),
            phase_outcomes: Vec::new(),
            cost_ledger: ledger,
            verified_artifacts: BTreeSet::new(),
            missing_artifacts: BTreeSet::new(),
            artifact_sizes: BTreeMap::new(),
            failure: Some(Box::new(PhaseExecutionError {
                phase_name: "Data Flow Analysis".to_string(),
                agent: "analyzer".to_string(),
                cause,
                started_at: now,
                duration: Duration::from_millis(2500),
                partial_cost_usd: 0.07,
                last_event: None,
                tool_approvals: 4,
                tool_denials: 1,
                skipped_frames: 2,
            })),
        }
    }

    fn config() -> RunConfig {
        RunConfig {
            permission_mode: PermissionMode::AutoApproveSafe,
            artifact_policy: ArtifactPolicy::Advisory,
            model: None,
            project_dir: PathBuf::from("."),
        }
    }

    #[test]
    fn test_failed_phase_record_is_complete() {
        let run = AuditRun::from_result(&failed_run(PhaseError::AgentReportedFailure), config());

        assert_eq!(run.phases.len(), 1);
        let phase = &run.phases[0];
        assert_eq!(phase.agent.as_deref(), Some("analyzer"));
        assert!(phase.started_at.is_some());
        assert_eq!(phase.duration_secs, 2.5);
        assert_eq!(phase.cost_usd, 0.07);
        assert_eq!(phase.tool_approvals, 4);
        assert_eq!(phase.tool_denials, 1);
        assert_eq!(phase.skipped_frames, 2);
        assert!(matches!(phase.outcome, PhaseOutcome::Failed { .. }));
        assert_eq!(run.exit_code, 1);
        assert!(!run.succeeded());
    }

    #[test]
    fn test_cancelled_phase_recorded_as_cancelled() {
        let run = AuditRun::from_result(&failed_run(PhaseError::Cancelled), config());
        assert!(matches!(run.phases[0].outcome, PhaseOutcome::Cancelled));
        assert_eq!(run.exit_code, 130);
    }
}
