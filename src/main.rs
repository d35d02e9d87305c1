use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod cmd;

#[derive(Parser)]
#[command(name = "conductor")]
#[command(version, about = "Multi-phase agent workflow orchestrator")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Where the workflow writes its artifacts
    #[arg(short, long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Permission mode: ask-always, auto-approve-safe
    #[arg(long, global = true)]
    pub permission_mode: Option<String>,

    /// Approve every allowed tool without prompting
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Seconds to wait for an approval before denying
    #[arg(long, global = true)]
    pub approval_timeout: Option<u64>,

    /// Only print denied tool requests
    #[arg(long, global = true)]
    pub hide_tools: bool,

    /// Fail the run when an expected artifact is missing
    #[arg(long, global = true)]
    pub strict_artifacts: bool,

    /// Agent runtime command (default: claude)
    #[arg(long, global = true)]
    pub claude_cmd: Option<String>,

    /// Model: sonnet, opus, haiku, inherit
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// List phases, agents and artifacts without starting a session
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Document the architecture of the current repository
    Architecture,
    /// Run the UX design workflow
    Ux {
        /// Name of the product being designed
        #[arg(long, default_value = "Project")]
        project_name: String,
    },
    /// Run a workflow defined in a TOML file
    Workflow {
        file: PathBuf,
    },
    /// Inspect agent definitions
    Agents {
        #[command(subcommand)]
        command: AgentsCommands,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// List audit records of past runs in an output directory
    Runs {
        dir: PathBuf,
    },
}

#[derive(Subcommand, Clone)]
pub enum AgentsCommands {
    /// List agent definition files
    List {
        #[arg(long)]
        domain: Option<String>,
        /// Defaults to .conductor/agents
        #[arg(long)]
        agents_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default conductor.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    conductor::logging::init(cli.verbose, cli.log_json)?;

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Architecture => cmd::cmd_architecture(&cli, project_dir).await,
        Commands::Ux { project_name } => cmd::cmd_ux(&cli, project_dir, project_name).await,
        Commands::Workflow { file } => cmd::cmd_workflow(&cli, project_dir, file).await,
        Commands::Agents { command } => {
            cmd::cmd_agents(&cli, project_dir, command.clone())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { command } => {
            cmd::cmd_config(&project_dir, command.clone())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Runs { dir } => {
            cmd::cmd_runs(dir)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
