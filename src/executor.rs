//! Single-phase execution.
//!
//! A phase moves `Submitted → Streaming → Completed | Failed`. While
//! streaming, every frame is classified; tool requests are decided by the
//! [`PermissionPolicy`] and answered before the next frame is pulled. The
//! phase ends on its `PhaseResult`, whose cost is recorded whether or not the
//! agent reports success.
//!
//! The two suspension points (the next frame, an operator approval) race the
//! run's [`CancellationToken`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::agents::AgentName;
use crate::errors::{PhaseError, PhaseExecutionError};
use crate::event::{Event, ToolResponse};
use crate::ledger::CostLedger;
use crate::permission::{PermissionPolicy, PolicyVerdict};
use crate::phase::PhaseSpec;
use crate::session::AgentSession;
use crate::stream::MessageClassifier;
use crate::ui::OrchestratorUI;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseState {
    Submitted,
    Streaming,
    Completed,
    Failed,
}

impl fmt::Display for PhaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PhaseState::Submitted => "submitted",
            PhaseState::Streaming => "streaming",
            PhaseState::Completed => "completed",
            PhaseState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Record of a completed phase.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseOutcome {
    pub phase_name: String,
    pub agent: String,
    pub started_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,
    pub cost_usd: f64,
    pub tool_approvals: usize,
    pub tool_denials: usize,
    /// Frames that could not be classified and were skipped.
    pub skipped_frames: usize,
    /// Classified events in the order they were processed.
    pub transcript: Vec<Event>,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

#[derive(Debug, Default)]
struct PhaseProgress {
    transcript: Vec<Event>,
    tool_approvals: usize,
    tool_denials: usize,
    skipped_frames: usize,
}

/// Runs one phase against an open session.
pub struct PhaseExecutor {
    policy: PermissionPolicy,
    classifier: MessageClassifier,
    ui: Option<Arc<OrchestratorUI>>,
}

impl PhaseExecutor {
    pub fn new(policy: PermissionPolicy) -> Self {
        Self {
            policy,
            classifier: MessageClassifier::default(),
            ui: None,
        }
    }

    pub fn with_classifier(mut self, classifier: MessageClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_ui(mut self, ui: Option<Arc<OrchestratorUI>>) -> Self {
        self.ui = ui;
        self
    }

    pub async fn execute<A: AgentName>(
        &self,
        session: &mut dyn AgentSession,
        phase: &PhaseSpec<A>,
        ledger: &mut CostLedger,
        cancel: &CancellationToken,
    ) -> Result<PhaseOutcome, PhaseExecutionError> {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut progress = PhaseProgress::default();
        let mut state = PhaseState::Submitted;

        info!(phase = %phase.name, agent = %phase.agent, "Phase started");
        let result = self
            .drive(session, phase, ledger, cancel, &mut progress, &mut state)
            .await;

        match result {
            Ok(cost_usd) => {
                transition(&phase.name, &mut state, PhaseState::Completed);
                Ok(PhaseOutcome {
                    phase_name: phase.name.clone(),
                    agent: phase.agent.to_string(),
                    started_at,
                    duration: start.elapsed(),
                    cost_usd,
                    tool_approvals: progress.tool_approvals,
                    tool_denials: progress.tool_denials,
                    skipped_frames: progress.skipped_frames,
                    transcript: progress.transcript,
                })
            }
            Err(cause) => {
                transition(&phase.name, &mut state, PhaseState::Failed);
                warn!(phase = %phase.name, error = %cause, "Phase failed");
                Err(PhaseExecutionError {
                    phase_name: phase.name.clone(),
                    agent: phase.agent.to_string(),
                    cause,
                    started_at,
                    duration: start.elapsed(),
                    partial_cost_usd: ledger.get(&phase.name).unwrap_or(0.0),
                    last_event: progress.transcript.pop(),
                    tool_approvals: progress.tool_approvals,
                    tool_denials: progress.tool_denials,
                    skipped_frames: progress.skipped_frames,
                })
            }
        }
    }

    async fn drive<A: AgentName>(
        &self,
        session: &mut dyn AgentSession,
        phase: &PhaseSpec<A>,
        ledger: &mut CostLedger,
        cancel: &CancellationToken,
        progress: &mut PhaseProgress,
        state: &mut PhaseState,
    ) -> Result<f64, PhaseError> {
        cancellable(cancel, session.query(&phase.submission())).await??;
        transition(&phase.name, state, PhaseState::Streaming);

        loop {
            let Some(raw) = cancellable(cancel, session.next_event()).await?? else {
                return Err(PhaseError::StreamEnded);
            };

            let event = match self.classifier.classify(&raw) {
                Ok(event) => event,
                Err(e) => {
                    progress.skipped_frames += 1;
                    if e.is_diagnostic() {
                        debug!(phase = %phase.name, "{}", e);
                    } else {
                        warn!(phase = %phase.name, error = %e, "Skipping unclassifiable frame");
                    }
                    continue;
                }
            };
            progress.transcript.push(event.clone());

            match event {
                Event::AgentUtterance { text } => {
                    if let Some(ui) = &self.ui {
                        ui.show_utterance(&text);
                    }
                }
                Event::ToolInvocationRequest {
                    tool_name,
                    arguments,
                    request_id,
                } => {
                    let deferred = self.policy.verdict(&tool_name) == PolicyVerdict::Defer;
                    if let (true, Some(ui)) = (deferred, &self.ui) {
                        ui.pause();
                    }
                    let decision =
                        cancellable(cancel, self.policy.decide(&tool_name, &arguments)).await??;
                    if let (true, Some(ui)) = (deferred, &self.ui) {
                        ui.resume();
                    }
                    if let Some(ui) = &self.ui {
                        ui.show_tool_request(&tool_name, &arguments, &decision);
                    }

                    let response = if decision.is_approved() {
                        progress.tool_approvals += 1;
                        ToolResponse::approve(&request_id, &tool_name, arguments)
                    } else {
                        progress.tool_denials += 1;
                        ToolResponse::deny(
                            &request_id,
                            &tool_name,
                            decision.rejection_message(&tool_name),
                        )
                    };
                    cancellable(cancel, session.respond(&response)).await??;
                }
                Event::ToolInvocationResult {
                    result_text,
                    truncated,
                    ..
                } => {
                    if let Some(ui) = &self.ui {
                        ui.show_tool_result(&result_text, truncated);
                    }
                }
                Event::PhaseResult {
                    total_cost_usd,
                    succeeded,
                } => {
                    ledger.record_phase_cost(&phase.name, total_cost_usd)?;
                    info!(
                        phase = %phase.name,
                        cost_usd = total_cost_usd,
                        succeeded,
                        "Phase cost recorded"
                    );
                    return if succeeded {
                        Ok(total_cost_usd)
                    } else {
                        Err(PhaseError::AgentReportedFailure)
                    };
                }
            }
        }
    }
}

fn transition(phase: &str, state: &mut PhaseState, next: PhaseState) {
    debug!(phase, from = %state, to = %next, "Phase state change");
    *state = next;
}

/// Race `fut` against cancellation.
async fn cancellable<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, PhaseError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PhaseError::Cancelled),
        out = fut => Ok(out),
    }
}
