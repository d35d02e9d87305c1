//! Permission policy for tool invocations requested by the agent.
//!
//! Every tool request is checked against the orchestrator's allow-list first;
//! anything outside it is denied no matter the mode. Inside the allow-list:
//!
//! | Mode              | Read-only tool | Anything else         |
//! |-------------------|----------------|-----------------------|
//! | `AutoApproveSafe` | approved       | operator decides      |
//! | `AskAlways`       | operator decides | operator decides    |
//!
//! "Operator decides" goes through an [`ApprovalCallback`], optionally bounded
//! by a timeout. A timed-out approval is a denial.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dialoguer::{Select, theme::ColorfulTheme};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::errors::ApprovalError;
use crate::stream::describe_tool_use;

/// Tools that only observe the workspace.
pub const SAFE_TOOLS: &[&str] = &["Read", "Grep", "Glob", "LS", "NotebookRead"];

pub fn is_safe_tool(tool_name: &str) -> bool {
    SAFE_TOOLS.contains(&tool_name)
}

/// How tool requests inside the allow-list are gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionMode {
    /// Every allowed tool needs operator approval.
    AskAlways,
    /// Read-only tools are approved automatically; the rest need approval (default).
    #[default]
    AutoApproveSafe,
}

impl std::fmt::Display for PermissionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionMode::AskAlways => write!(f, "ask-always"),
            PermissionMode::AutoApproveSafe => write!(f, "auto-approve-safe"),
        }
    }
}

impl std::str::FromStr for PermissionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "ask-always" | "ask" => Ok(PermissionMode::AskAlways),
            "auto-approve-safe" | "auto" => Ok(PermissionMode::AutoApproveSafe),
            _ => anyhow::bail!(
                "Invalid permission mode '{}'. Valid values: ask-always, auto-approve-safe",
                s
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionDecision {
    Approve,
    Deny,
}

/// Outcome of the synchronous part of the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyVerdict {
    Approve,
    Deny,
    /// Needs an out-of-band decision.
    Defer,
}

/// Why a decision came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    NotAllowed,
    SafeTool,
    OperatorApproved,
    OperatorDenied,
    ApprovalTimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub decision: PermissionDecision,
    pub reason: DecisionReason,
}

impl Decision {
    fn new(decision: PermissionDecision, reason: DecisionReason) -> Self {
        Self { decision, reason }
    }

    pub fn is_approved(&self) -> bool {
        self.decision == PermissionDecision::Approve
    }

    /// Message forwarded to the agent when the request is rejected.
    pub fn rejection_message(&self, tool_name: &str) -> String {
        match self.reason {
            DecisionReason::NotAllowed => format!(
                "Tool '{}' is not available in this workflow. Continue using the permitted tools.",
                tool_name
            ),
            DecisionReason::ApprovalTimedOut => format!(
                "Permission to use '{}' was not granted in time. Find another way to proceed.",
                tool_name
            ),
            _ => format!(
                "The operator denied permission to use '{}'. Adjust your plan accordingly.",
                tool_name
            ),
        }
    }
}

/// Out-of-band approval channel (usually a human at a terminal).
#[async_trait]
pub trait ApprovalCallback: Send + Sync {
    async fn request(
        &self,
        tool_name: &str,
        arguments: &Value,
    ) -> Result<PermissionDecision, ApprovalError>;
}

/// Answers every deferred request the same way. Used for `--yes` and for
/// non-interactive runs.
#[derive(Debug, Clone, Copy)]
pub struct StaticApproval(pub PermissionDecision);

#[async_trait]
impl ApprovalCallback for StaticApproval {
    async fn request(
        &self,
        _tool_name: &str,
        _arguments: &Value,
    ) -> Result<PermissionDecision, ApprovalError> {
        Ok(self.0)
    }
}

/// Prompts on the controlling terminal.
///
/// The prompt reads stdin on a detached thread. A caller that stops waiting
/// (timeout, cancellation) abandons the thread instead of blocking on it, and
/// the process can exit while it is still parked on input. While an abandoned
/// prompt still owns the terminal, further requests are denied rather than
/// opening a second prompt.
#[derive(Debug, Default, Clone)]
pub struct InteractiveApproval {
    prompt_open: Arc<AtomicBool>,
}

impl InteractiveApproval {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApprovalCallback for InteractiveApproval {
    async fn request(
        &self,
        tool_name: &str,
        arguments: &Value,
    ) -> Result<PermissionDecision, ApprovalError> {
        if self.prompt_open.swap(true, Ordering::SeqCst) {
            warn!(tool = tool_name, "earlier approval prompt still waiting for input; denying");
            return Ok(PermissionDecision::Deny);
        }

        let prompt = format!("Allow the agent to use {}?", describe_tool_use(tool_name, arguments));
        let prompt_open = Arc::clone(&self.prompt_open);
        let answer = on_detached_thread(move || {
            let selection = Select::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .items(&["Allow", "Deny"])
                .default(1)
                .interact();
            prompt_open.store(false, Ordering::SeqCst);
            selection
        });
        let selection = match answer {
            Ok(pending) => pending.await,
            Err(e) => {
                self.prompt_open.store(false, Ordering::SeqCst);
                return Err(e);
            }
        }?
        .map_err(|e| ApprovalError::Prompt(e.to_string()))?;

        Ok(match selection {
            0 => PermissionDecision::Approve,
            _ => PermissionDecision::Deny,
        })
    }
}

/// Run blocking `work` on a thread nobody joins.
///
/// Dropping the returned future abandons the thread; unlike
/// `spawn_blocking`, runtime shutdown does not wait for it.
fn on_detached_thread<T, F>(
    work: F,
) -> Result<impl Future<Output = Result<T, ApprovalError>>, ApprovalError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    std::thread::Builder::new()
        .name("approval-prompt".into())
        .spawn(move || {
            let _ = tx.send(work());
        })
        .map_err(|e| ApprovalError::Aborted(e.to_string()))?;
    Ok(async move {
        rx.await
            .map_err(|_| ApprovalError::Aborted("approval prompt thread exited".into()))
    })
}

/// Permission policy bound to one orchestrator's allow-list.
pub struct PermissionPolicy {
    mode: PermissionMode,
    allowed_tools: BTreeSet<String>,
    approvals: Arc<dyn ApprovalCallback>,
    approval_timeout: Option<Duration>,
}

impl PermissionPolicy {
    pub fn new(
        mode: PermissionMode,
        allowed_tools: BTreeSet<String>,
        approvals: Arc<dyn ApprovalCallback>,
    ) -> Self {
        Self {
            mode,
            allowed_tools,
            approvals,
            approval_timeout: None,
        }
    }

    /// Bound the wait for an operator decision. `None` waits forever.
    pub fn with_approval_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.approval_timeout = timeout;
        self
    }

    pub fn mode(&self) -> PermissionMode {
        self.mode
    }

    pub fn allowed_tools(&self) -> &BTreeSet<String> {
        &self.allowed_tools
    }

    /// What this policy would do with `tool_name` before asking anyone.
    pub fn verdict(&self, tool_name: &str) -> PolicyVerdict {
        Self::evaluate(tool_name, self.mode, &self.allowed_tools)
    }

    /// The pure part of the policy.
    pub fn evaluate(
        tool_name: &str,
        mode: PermissionMode,
        allowed_tools: &BTreeSet<String>,
    ) -> PolicyVerdict {
        if !allowed_tools.contains(tool_name) {
            return PolicyVerdict::Deny;
        }
        match mode {
            PermissionMode::AutoApproveSafe if is_safe_tool(tool_name) => PolicyVerdict::Approve,
            PermissionMode::AutoApproveSafe | PermissionMode::AskAlways => PolicyVerdict::Defer,
        }
    }

    /// Decide a tool request, suspending on the approval callback when needed.
    pub async fn decide(
        &self,
        tool_name: &str,
        arguments: &Value,
    ) -> Result<Decision, ApprovalError> {
        match self.verdict(tool_name) {
            PolicyVerdict::Deny => {
                info!(tool = tool_name, "denied: tool outside allow-list");
                Ok(Decision::new(PermissionDecision::Deny, DecisionReason::NotAllowed))
            }
            PolicyVerdict::Approve => {
                debug!(tool = tool_name, "auto-approved read-only tool");
                Ok(Decision::new(PermissionDecision::Approve, DecisionReason::SafeTool))
            }
            PolicyVerdict::Defer => {
                debug!(tool = tool_name, mode = %self.mode, "awaiting operator approval");
                let pending = self.approvals.request(tool_name, arguments);
                let answer = match self.approval_timeout {
                    Some(limit) => match tokio::time::timeout(limit, pending).await {
                        Ok(answer) => answer?,
                        Err(_) => {
                            warn!(tool = tool_name, ?limit, "approval timed out; denying");
                            return Ok(Decision::new(
                                PermissionDecision::Deny,
                                DecisionReason::ApprovalTimedOut,
                            ));
                        }
                    },
                    None => pending.await?,
                };
                let reason = match answer {
                    PermissionDecision::Approve => DecisionReason::OperatorApproved,
                    PermissionDecision::Deny => DecisionReason::OperatorDenied,
                };
                info!(tool = tool_name, decision = ?answer, "operator decision");
                Ok(Decision::new(answer, reason))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tools(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    struct CountingApproval {
        calls: AtomicUsize,
        answer: PermissionDecision,
    }

    #[async_trait]
    impl ApprovalCallback for CountingApproval {
        async fn request(
            &self,
            _tool_name: &str,
            _arguments: &Value,
        ) -> Result<PermissionDecision, ApprovalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.answer)
        }
    }

    struct NeverAnswers;

    #[async_trait]
    impl ApprovalCallback for NeverAnswers {
        async fn request(
            &self,
            _tool_name: &str,
            _arguments: &Value,
        ) -> Result<PermissionDecision, ApprovalError> {
            std::future::pending().await
        }
    }

    #[test]
    fn test_permission_mode_parse_and_display() {
        assert_eq!(
            "ask-always".parse::<PermissionMode>().unwrap(),
            PermissionMode::AskAlways
        );
        assert_eq!(
            "AUTO_APPROVE_SAFE".parse::<PermissionMode>().unwrap(),
            PermissionMode::AutoApproveSafe
        );
        assert!("yolo".parse::<PermissionMode>().is_err());
        assert_eq!(PermissionMode::AskAlways.to_string(), "ask-always");
        assert_eq!(PermissionMode::default(), PermissionMode::AutoApproveSafe);
    }

    #[test]
    fn test_evaluate_safe_tool_auto_approved() {
        let allowed = tools(&["Read", "Write"]);
        assert_eq!(
            PermissionPolicy::evaluate("Read", PermissionMode::AutoApproveSafe, &allowed),
            PolicyVerdict::Approve
        );
        assert_eq!(
            PermissionPolicy::evaluate("Write", PermissionMode::AutoApproveSafe, &allowed),
            PolicyVerdict::Defer
        );
    }

    #[test]
    fn test_evaluate_ask_always_defers_even_safe_tools() {
        let allowed = tools(&["Read"]);
        assert_eq!(
            PermissionPolicy::evaluate("Read", PermissionMode::AskAlways, &allowed),
            PolicyVerdict::Defer
        );
    }

    #[tokio::test]
    async fn test_decide_unlisted_tool_never_reaches_operator() {
        let approvals = Arc::new(CountingApproval {
            calls: AtomicUsize::new(0),
            answer: PermissionDecision::Approve,
        });
        let policy = PermissionPolicy::new(
            PermissionMode::AskAlways,
            tools(&["Read"]),
            approvals.clone(),
        );
        let decision = policy.decide("Bash", &Value::Null).await.unwrap();
        assert_eq!(decision.decision, PermissionDecision::Deny);
        assert_eq!(decision.reason, DecisionReason::NotAllowed);
        assert_eq!(approvals.calls.load(Ordering::SeqCst), 0);
        assert!(decision.rejection_message("Bash").contains("not available"));
    }

    #[tokio::test]
    async fn test_decide_destructive_tool_uses_operator_answer() {
        let approvals = Arc::new(CountingApproval {
            calls: AtomicUsize::new(0),
            answer: PermissionDecision::Deny,
        });
        let policy = PermissionPolicy::new(
            PermissionMode::AutoApproveSafe,
            tools(&["Read", "Bash"]),
            approvals.clone(),
        );
        let decision = policy
            .decide("Bash", &serde_json::json!({"command": "rm -rf build"}))
            .await
            .unwrap();
        assert_eq!(decision.reason, DecisionReason::OperatorDenied);
        assert_eq!(approvals.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decide_times_out_into_denial() {
        let policy = PermissionPolicy::new(
            PermissionMode::AskAlways,
            tools(&["Write"]),
            Arc::new(NeverAnswers),
        )
        .with_approval_timeout(Some(Duration::from_secs(30)));
        let decision = policy.decide("Write", &Value::Null).await.unwrap();
        assert_eq!(decision.decision, PermissionDecision::Deny);
        assert_eq!(decision.reason, DecisionReason::ApprovalTimedOut);
    }

    #[test]
    fn test_abandoned_prompt_does_not_hold_runtime_shutdown() {
        // Keeps the worker parked until the test is over.
        let (_release, parked) = std::sync::mpsc::channel::<()>();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        let started = std::time::Instant::now();
        runtime.block_on(async {
            let pending = on_detached_thread(move || parked.recv().is_ok()).unwrap();
            let waited = tokio::time::timeout(Duration::from_millis(20), pending).await;
            assert!(waited.is_err());
        });
        drop(runtime);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_detached_work_delivers_its_result() {
        let answer = on_detached_thread(|| 41 + 1).unwrap().await.unwrap();
        assert_eq!(answer, 42);
    }

    #[tokio::test]
    async fn test_static_approval_answers_fixed_decision() {
        let approvals = StaticApproval(PermissionDecision::Approve);
        assert_eq!(
            approvals.request("Write", &Value::Null).await.unwrap(),
            PermissionDecision::Approve
        );
    }

    fn tool_name() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("Read".to_string()),
            Just("Grep".to_string()),
            Just("Glob".to_string()),
            Just("Write".to_string()),
            Just("Bash".to_string()),
            Just("WebSearch".to_string()),
            "[A-Za-z_]{1,12}",
        ]
    }

    fn mode() -> impl Strategy<Value = PermissionMode> {
        prop_oneof![
            Just(PermissionMode::AskAlways),
            Just(PermissionMode::AutoApproveSafe)
        ]
    }

    proptest! {
        #[test]
        fn prop_unlisted_tools_are_always_denied(
            tool in tool_name(),
            mode in mode(),
            allowed in proptest::collection::btree_set(tool_name(), 0..6),
        ) {
            prop_assume!(!allowed.contains(&tool));
            prop_assert_eq!(PermissionPolicy::evaluate(&tool, mode, &allowed), PolicyVerdict::Deny);

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let policy = PermissionPolicy::new(
                mode,
                allowed,
                Arc::new(StaticApproval(PermissionDecision::Approve)),
            );
            let decision = runtime.block_on(policy.decide(&tool, &Value::Null)).unwrap();
            prop_assert_eq!(decision.decision, PermissionDecision::Deny);
        }

        #[test]
        fn prop_listed_safe_tools_approved_under_auto_mode(
            tool in prop_oneof![Just("Read"), Just("Grep"), Just("Glob")],
        ) {
            let allowed = tools(&[tool]);
            prop_assert_eq!(
                PermissionPolicy::evaluate(tool, PermissionMode::AutoApproveSafe, &allowed),
                PolicyVerdict::Approve
            );
        }
    }
}
