use crate::orchestrator::OrchestratorRunResult;
use crate::permission::{Decision, DecisionReason};
use crate::stream::{describe_tool_use, tool_emoji, truncate_chars, truncate_thinking};
use crate::ui::icons::{
    AGENT, CHECK, COST, CROSS, FOLDER, KEY, LINK, LOCK, ROCKET, SEARCH, SPARKLE, SUMMARY,
    THINKING, WARN,
};
use crate::verify::VerificationReport;
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

/// Characters of tool output shown in a result preview.
const RESULT_PREVIEW_CHARS: usize = 200;

/// Terminal UI for an orchestrator run, rendered via `indicatif` progress bars.
///
/// Two bars are stacked vertically:
/// - Phase bar: how many phases have completed
/// - Activity spinner: what the agent is doing right now
///
/// Tool lines and result previews are printed only when tool details are
/// shown. Denied tool requests are always printed.
pub struct OrchestratorUI {
    multi: MultiProgress,
    phase_bar: ProgressBar,
    activity_bar: ProgressBar,
    show_tools: bool,
    verbose: bool,
}

impl OrchestratorUI {
    /// Create the UI and add both bars to the multiplex renderer.
    ///
    /// # Arguments
    /// * `total_phases` sizes the phase bar
    /// * `show_tools` prints tool use lines and result previews
    /// * `verbose` prints full agent utterances instead of one-line snippets
    pub fn new(total_phases: u64, show_tools: bool, verbose: bool) -> Self {
        let multi = MultiProgress::new();

        let phase_style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");

        let phase_bar = multi.add(ProgressBar::new(total_phases));
        phase_bar.set_style(phase_style);
        phase_bar.set_prefix("Phases");

        let activity_style = ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {msg}")
            .expect("progress bar template is a valid static string");

        let activity_bar = multi.add(ProgressBar::new_spinner());
        activity_bar.set_style(activity_style);
        activity_bar.set_prefix(" Agent");

        Self {
            multi,
            phase_bar,
            activity_bar,
            show_tools,
            verbose,
        }
    }

    /// Print above the bars; plain stderr when the multiplexer refuses the line.
    fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.println(msg.as_ref()).is_err() {
            eprintln!("{}", msg.as_ref());
        }
    }

    pub fn print_separator(&self) {
        self.print_line(format!("{}", style("═".repeat(70)).cyan()));
    }

    /// Opening banner for a run.
    pub fn print_banner(&self, domain: &str, output_dir: &Path) {
        self.print_separator();
        self.print_line(format!(
            "{}{} Orchestrator",
            ROCKET,
            style(domain.to_uppercase()).bold()
        ));
        self.print_separator();
        self.print_line(format!(
            "{}{} {}",
            FOLDER,
            style("Output directory:").dim(),
            output_dir.display()
        ));
    }

    /// Header block printed before a phase starts. `index` is 1-based.
    pub fn print_phase_header(&self, index: usize, total: usize, name: &str, agent: &str) {
        self.print_line("");
        self.print_separator();
        self.print_line(format!(
            "{} Phase {}/{}: {}",
            style("▶").green().bold(),
            style(index).yellow().bold(),
            total,
            name
        ));
        self.print_separator();
        self.print_line(format!("{}  {}", style("Agent:").dim(), agent));
        self.print_line("");
    }

    /// Point the bars at the phase about to run and start the spinner.
    pub fn start_phase(&self, name: &str) {
        self.phase_bar.set_message(style(name).yellow().to_string());
        self.activity_bar
            .set_message(style("(waiting for agent)").dim().to_string());
        self.activity_bar
            .enable_steady_tick(Duration::from_millis(100));
    }

    pub fn show_utterance(&self, text: &str) {
        let snippet = truncate_thinking(text, 60);
        if snippet.is_empty() {
            return;
        }
        self.activity_bar
            .set_message(format!("{}{}", THINKING, style(&snippet).dim()));
        if self.verbose {
            self.print_line(format!("    {}{}", AGENT, text.trim()));
        } else {
            self.print_line(format!("    {}{}", AGENT, style(snippet).dim()));
        }
    }

    /// Show a tool request together with the policy's decision on it.
    pub fn show_tool_request(&self, tool_name: &str, arguments: &Value, decision: &Decision) {
        let desc = describe_tool_use(tool_name, arguments);
        if decision.is_approved() {
            self.activity_bar.set_message(format!(
                "{} {}",
                tool_emoji(tool_name),
                style(&desc).yellow()
            ));
            if self.show_tools {
                let marker = match decision.reason {
                    DecisionReason::OperatorApproved => format!(" {}", KEY),
                    _ => String::new(),
                };
                self.print_line(format!(
                    "    {} {}{}",
                    tool_emoji(tool_name),
                    style(desc).yellow(),
                    marker
                ));
            }
        } else {
            let why = match decision.reason {
                DecisionReason::NotAllowed => "not in allow-list",
                DecisionReason::ApprovalTimedOut => "approval timed out",
                _ => "denied by operator",
            };
            self.print_line(format!(
                "    {}{} {}",
                LOCK,
                style(desc).red(),
                style(format!("({})", why)).dim()
            ));
        }
    }

    /// Stop the spinner while an approval prompt owns the terminal.
    pub fn pause(&self) {
        self.activity_bar.disable_steady_tick();
        self.activity_bar.set_message("awaiting approval");
    }

    pub fn resume(&self) {
        self.activity_bar
            .enable_steady_tick(Duration::from_millis(100));
    }

    pub fn show_tool_result(&self, result_text: &str, truncated: bool) {
        if !self.show_tools {
            return;
        }
        let preview = if result_text.trim().is_empty() {
            "None".to_string()
        } else {
            truncate_chars(result_text.trim(), RESULT_PREVIEW_CHARS).replace('\n', " ")
        };
        let suffix = if truncated { " [truncated]" } else { "" };
        self.print_line(format!(
            "      {}{}{}",
            CHECK,
            style(preview).dim(),
            style(suffix).dim()
        ));
    }

    pub fn phase_complete(&self, name: &str, cost_usd: f64) {
        self.phase_bar.inc(1);
        self.activity_bar.set_message("");
        self.print_line(format!(
            "\n{}Phase {} complete  {}${:.4}\n",
            SPARKLE,
            style(name).green().bold(),
            COST,
            cost_usd
        ));
    }

    pub fn phase_failed(&self, name: &str, reason: &str, partial_cost_usd: f64) {
        self.activity_bar.set_message("");
        self.print_line(format!(
            "\n{}Phase {} failed: {}  {}${:.4}\n",
            CROSS,
            style(name).red().bold(),
            reason,
            COST,
            partial_cost_usd
        ));
    }

    /// Stop all bars. Call before printing the verification report.
    pub fn finish(&self) {
        self.activity_bar.finish_and_clear();
        self.phase_bar.finish();
    }

    pub fn show_verification(&self, report: &VerificationReport) {
        self.print_line("");
        self.print_separator();
        self.print_line(format!("{}Verifying Outputs", SEARCH));
        self.print_separator();
        for path in &report.present {
            let size = report.sizes.get(path).copied().unwrap_or(0);
            self.print_line(format!(
                "{}{} ({} bytes)",
                CHECK,
                path.display(),
                style(size).cyan()
            ));
        }
        for path in &report.missing {
            self.print_line(format!(
                "{}{} - {}",
                CROSS,
                path.display(),
                style("NOT FOUND").red().bold()
            ));
        }
        if report.present.is_empty() && report.missing.is_empty() {
            self.print_line(style("No artifacts declared").dim().to_string());
        }
    }

    pub fn print_summary(&self, result: &OrchestratorRunResult) {
        self.print_line("");
        self.print_separator();
        self.print_line(format!(
            "{}{} ORCHESTRATOR SUMMARY",
            SUMMARY,
            style(result.domain.to_uppercase()).bold()
        ));
        self.print_separator();
        self.print_line(format!("Output Directory: {}", result.output_dir.display()));
        self.print_line(format!(
            "Completed Phases: {}",
            style(result.completed_phases.len()).green()
        ));
        self.print_line(format!(
            "Total Cost: {}",
            style(format!("${:.4}", result.total_cost())).cyan().bold()
        ));

        if !result.cost_ledger.is_empty() {
            self.print_line("\nCost Breakdown:");
            for entry in result.cost_ledger.breakdown() {
                self.print_line(format!("  - {}: ${:.4}", entry.phase, entry.cost_usd));
            }
        }

        if let Some(failure) = &result.failure {
            self.print_line(format!("\n{}{}", CROSS, style(failure).red()));
            self.print_line(format!(
                "Partial results may be available in: {}",
                result.output_dir.display()
            ));
        } else if !result.missing_artifacts.is_empty() {
            self.print_line(format!(
                "\n{}{} expected artifact(s) missing",
                WARN,
                result.missing_artifacts.len()
            ));
        }
        self.print_separator();
    }

    pub fn show_cross_invocation(&self, caller: &str, callee: &str, phase: &str, keys: &[&str]) {
        self.print_line(format!(
            "\n{}Cross-orchestrator call: {} → {}",
            LINK,
            style(caller).cyan(),
            style(callee).cyan()
        ));
        self.print_line(format!("   Phase: {}", phase));
        self.print_line(format!("   Context: [{}]", keys.join(", ")));
    }
}
