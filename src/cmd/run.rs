//! Workflow runs: `conductor architecture`, `conductor ux` and `conductor workflow`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use conductor::agents::{AgentName, Model};
use conductor::config::{CliOverrides, ConductorConfig};
use conductor::orchestrator::Workflow;
use conductor::permission::PermissionMode;

use super::super::Cli;

/// Resolve configuration for this invocation, applying CLI flags last.
pub fn load_config(cli: &Cli, project_dir: PathBuf) -> Result<ConductorConfig> {
    let permission_mode = cli
        .permission_mode
        .as_deref()
        .map(str::parse::<PermissionMode>)
        .transpose()
        .context("Invalid --permission-mode")?;
    let model = cli
        .model
        .as_deref()
        .map(str::parse::<Model>)
        .transpose()
        .context("Invalid --model")?;

    let config = ConductorConfig::new(project_dir)?.with_cli(CliOverrides {
        claude_cmd: cli.claude_cmd.clone(),
        model,
        permission_mode,
        approval_timeout_secs: cli.approval_timeout,
        yes: cli.yes,
        hide_tools: cli.hide_tools,
        strict_artifacts: cli.strict_artifacts,
        output_dir: cli.output_dir.clone(),
        agents_dir: None,
    });
    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }
    Ok(config)
}

pub async fn cmd_architecture(cli: &Cli, project_dir: PathBuf) -> Result<ExitCode> {
    use conductor::workflows::ArchitectureWorkflow;
    use conductor::workflows::architecture::DEFAULT_OUTPUT_DIR;

    let config = load_config(cli, project_dir)?;
    let workflow = ArchitectureWorkflow::new(config.output_dir(DEFAULT_OUTPUT_DIR));
    run_workflow(cli, &config, workflow).await
}

pub async fn cmd_ux(cli: &Cli, project_dir: PathBuf, project_name: &str) -> Result<ExitCode> {
    use conductor::workflows::UxWorkflow;

    let config = load_config(cli, project_dir)?;
    let workflow = UxWorkflow::new(project_name, config.output_dir("."));
    run_workflow(cli, &config, workflow).await
}

pub async fn cmd_workflow(cli: &Cli, project_dir: PathBuf, file: &Path) -> Result<ExitCode> {
    use conductor::workflows::{CustomWorkflow, WorkflowFile};

    let config = load_config(cli, project_dir)?;
    let definition = WorkflowFile::load(file)?;
    let output_dir = config.resolve_path(
        cli.output_dir
            .clone()
            .or_else(|| definition.output_dir.clone())
            .unwrap_or_else(|| definition.default_output_dir()),
    );
    let base = file.parent().unwrap_or_else(|| Path::new("."));
    let workflow = CustomWorkflow::from_file(definition, base, Some(&output_dir))?;
    run_workflow(cli, &config, workflow).await
}

/// Print what a run would do, after checking every phase's agent is defined.
pub fn print_plan<W: Workflow>(workflow: &W) -> Result<()> {
    use console::style;

    let agents = workflow.agent_definitions()?;
    let phases = workflow.phases();

    println!();
    println!(
        "{} workflow: {} phase(s), output to {}",
        style(workflow.domain()).bold(),
        phases.len(),
        workflow.output_dir().display()
    );
    println!();
    for (index, phase) in phases.iter().enumerate() {
        println!(
            "  {}. {} {}",
            index + 1,
            phase.name,
            style(format!("[{}]", phase.agent.as_str())).cyan()
        );
    }
    println!();
    println!("Agents:");
    for (name, definition) in &agents {
        println!("  {} ({}): {}", name, definition.model, definition.description);
    }
    println!();
    println!(
        "Allowed tools: {}",
        workflow
            .allowed_tools()
            .into_iter()
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();
    println!("Expected artifacts:");
    for artifact in workflow.expected_artifacts() {
        println!("  {}", artifact.display());
    }
    println!();
    Ok(())
}

async fn run_workflow<W: Workflow>(
    cli: &Cli,
    config: &ConductorConfig,
    workflow: W,
) -> Result<ExitCode> {
    use conductor::audit::{AuditLogger, AuditRun, RunConfig};
    use conductor::errors::OrchestratorError;
    use conductor::orchestrator::Orchestrator;
    use conductor::permission::{
        ApprovalCallback, InteractiveApproval, PermissionDecision, StaticApproval,
    };
    use conductor::session::ClaudeSessionFactory;
    use conductor::ui::OrchestratorUI;
    use tokio_util::sync::CancellationToken;

    if cli.dry_run {
        print_plan(&workflow)?;
        return Ok(ExitCode::SUCCESS);
    }

    let settings = config.orchestrator_settings()?;
    let run_config = RunConfig {
        permission_mode: settings.mode,
        artifact_policy: settings.artifact_policy,
        model: settings.model,
        project_dir: config.project_dir.clone(),
    };

    let sessions = Arc::new(
        ClaudeSessionFactory::new(config.claude_cmd()).with_extra_args(config.extra_args().to_vec()),
    );
    let approvals: Arc<dyn ApprovalCallback> = if config.auto_approve_deferred() {
        Arc::new(StaticApproval(PermissionDecision::Approve))
    } else {
        Arc::new(InteractiveApproval::new())
    };
    let ui = Arc::new(OrchestratorUI::new(
        workflow.phases().len() as u64,
        config.show_tool_details(),
        cli.verbose,
    ));

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling the current phase");
            signal_token.cancel();
        }
    });

    let orchestrator = Orchestrator::new(workflow, sessions, approvals, settings).with_ui(ui);
    let result = match orchestrator.run(&cancel).await {
        Ok(result) => result,
        Err(OrchestratorError::MissingArtifacts { missing, result }) => {
            tracing::error!(count = missing.len(), "Strict mode: expected artifacts missing");
            *result
        }
        Err(e) => return Err(e.into()),
    };
    // An abandoned approval prompt can leave the cursor hidden.
    let _ = console::Term::stderr().show_cursor();

    if config.audit_enabled() {
        let logger = AuditLogger::new(&result.output_dir);
        match logger.write_run(&AuditRun::from_result(&result, run_config)) {
            Ok(path) => println!("Run record: {}", path.display()),
            Err(e) => tracing::warn!(error = %format!("{:#}", e), "Failed to write run record"),
        }
    }

    Ok(ExitCode::from(result.exit_code() as u8))
}
