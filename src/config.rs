//! Configuration: `.conductor/conductor.toml`, environment and CLI flags.
//!
//! Later layers win: file, then `CONDUCTOR_*` environment variables, then
//! command-line overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::agents::Model;
use crate::orchestrator::OrchestratorSettings;
use crate::permission::PermissionMode;
use crate::verify::ArtifactPolicy;

pub const CONFIG_DIR: &str = ".conductor";
pub const CONFIG_FILE: &str = "conductor.toml";

pub const ENV_CLAUDE_CMD: &str = "CONDUCTOR_CLAUDE_CMD";
pub const ENV_PERMISSION_MODE: &str = "CONDUCTOR_PERMISSION_MODE";
pub const ENV_MODEL: &str = "CONDUCTOR_MODEL";

/// Agent runtime settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeSection {
    /// Command used to launch the agent runtime (default: `claude`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claude_cmd: Option<String>,
    /// Model for the session; agents may still pin their own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<Model>,
    /// Extra arguments appended to the runtime command line
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_args: Vec<String>,
}

/// Tool permission settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionsSection {
    #[serde(default)]
    pub mode: PermissionMode,
    /// Seconds to wait for an operator decision before denying
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_timeout_secs: Option<u64>,
    /// Approve tools that would otherwise prompt the operator
    #[serde(default)]
    pub auto_approve_deferred: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSection {
    /// Base directory for workflow output, relative to the project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
    /// Print every tool request, not just denials
    #[serde(default = "default_true")]
    pub show_tool_details: bool,
    /// Write a JSON run record after each run
    #[serde(default = "default_true")]
    pub audit: bool,
}

fn default_true() -> bool {
    true
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            base_dir: None,
            show_tool_details: default_true(),
            audit: default_true(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactsSection {
    /// Treat missing artifacts as a run failure
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentsSection {
    /// Directory of `<domain>/<agent>.json` definition files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// The complete conductor.toml structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConductorToml {
    #[serde(default)]
    pub runtime: RuntimeSection,
    #[serde(default)]
    pub permissions: PermissionsSection,
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default)]
    pub artifacts: ArtifactsSection,
    #[serde(default)]
    pub agents: AgentsSection,
}

impl ConductorToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse conductor.toml")
    }

    /// Load `<config_dir>/conductor.toml`, or defaults if it doesn't exist.
    pub fn load_or_default(config_dir: &Path) -> Result<Self> {
        let path = config_dir.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize conductor.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Runtime command (env → file → `claude`).
    pub fn claude_cmd(&self) -> String {
        env_var(ENV_CLAUDE_CMD)
            .or_else(|| self.runtime.claude_cmd.clone())
            .unwrap_or_else(|| "claude".to_string())
    }

    /// Permission mode (env → file). An unparseable env value is an error.
    pub fn permission_mode(&self) -> Result<PermissionMode> {
        match env_var(ENV_PERMISSION_MODE) {
            Some(value) => value
                .parse::<PermissionMode>()
                .with_context(|| format!("Invalid {}", ENV_PERMISSION_MODE)),
            None => Ok(self.permissions.mode),
        }
    }

    /// Session model (env → file).
    pub fn model(&self) -> Result<Option<Model>> {
        match env_var(ENV_MODEL) {
            Some(value) => value
                .parse::<Model>()
                .map(Some)
                .with_context(|| format!("Invalid {}", ENV_MODEL)),
            None => Ok(self.runtime.model),
        }
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(cmd) = &self.runtime.claude_cmd
            && cmd.trim().is_empty()
        {
            warnings.push("runtime.claude_cmd is empty; 'claude' will be used".to_string());
        }
        if self.permissions.approval_timeout_secs == Some(0) {
            warnings.push(
                "permissions.approval_timeout_secs = 0 denies every prompted tool".to_string(),
            );
        }
        if self.permissions.auto_approve_deferred
            && self.permissions.mode == PermissionMode::AskAlways
        {
            warnings.push(
                "permissions.auto_approve_deferred overrides mode 'ask-always'; \
                 no tool will prompt"
                    .to_string(),
            );
        }
        if self.permissions.auto_approve_deferred && self.permissions.approval_timeout_secs.is_some()
        {
            warnings.push(
                "permissions.approval_timeout_secs has no effect with auto_approve_deferred"
                    .to_string(),
            );
        }
        if let Some(value) = env_var(ENV_PERMISSION_MODE)
            && value.parse::<PermissionMode>().is_err()
        {
            warnings.push(format!("{} has invalid value '{}'", ENV_PERMISSION_MODE, value));
        }
        if let Some(value) = env_var(ENV_MODEL)
            && value.parse::<Model>().is_err()
        {
            warnings.push(format!("{} has invalid value '{}'", ENV_MODEL, value));
        }

        warnings
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Values given on the command line. `None` / `false` leave lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub claude_cmd: Option<String>,
    pub model: Option<Model>,
    pub permission_mode: Option<PermissionMode>,
    pub approval_timeout_secs: Option<u64>,
    pub yes: bool,
    pub hide_tools: bool,
    pub strict_artifacts: bool,
    pub output_dir: Option<PathBuf>,
    pub agents_dir: Option<PathBuf>,
}

/// Resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct ConductorConfig {
    pub project_dir: PathBuf,
    pub config_dir: PathBuf,
    pub toml: ConductorToml,
    pub cli: CliOverrides,
}

impl ConductorConfig {
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let config_dir = project_dir.join(CONFIG_DIR);
        let toml = ConductorToml::load_or_default(&config_dir)?;

        Ok(Self {
            project_dir,
            config_dir,
            toml,
            cli: CliOverrides::default(),
        })
    }

    pub fn with_cli(mut self, cli: CliOverrides) -> Self {
        self.cli = cli;
        self
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    pub fn claude_cmd(&self) -> String {
        self.cli
            .claude_cmd
            .clone()
            .unwrap_or_else(|| self.toml.claude_cmd())
    }

    pub fn extra_args(&self) -> &[String] {
        &self.toml.runtime.extra_args
    }

    pub fn permission_mode(&self) -> Result<PermissionMode> {
        match self.cli.permission_mode {
            Some(mode) => Ok(mode),
            None => self.toml.permission_mode(),
        }
    }

    pub fn model(&self) -> Result<Option<Model>> {
        match self.cli.model {
            Some(model) => Ok(Some(model)),
            None => self.toml.model(),
        }
    }

    pub fn approval_timeout(&self) -> Option<Duration> {
        self.cli
            .approval_timeout_secs
            .or(self.toml.permissions.approval_timeout_secs)
            .map(Duration::from_secs)
    }

    /// Approve every allowed tool without prompting (`--yes` or config).
    pub fn auto_approve_deferred(&self) -> bool {
        self.cli.yes || self.toml.permissions.auto_approve_deferred
    }

    pub fn show_tool_details(&self) -> bool {
        !self.cli.hide_tools && self.toml.output.show_tool_details
    }

    pub fn audit_enabled(&self) -> bool {
        self.toml.output.audit
    }

    pub fn artifact_policy(&self) -> ArtifactPolicy {
        if self.cli.strict_artifacts || self.toml.artifacts.strict {
            ArtifactPolicy::Strict
        } else {
            ArtifactPolicy::Advisory
        }
    }

    /// Output directory: CLI, then config base dir, then `default`.
    /// Relative paths resolve against the project directory.
    pub fn output_dir(&self, default: &str) -> PathBuf {
        let dir = self
            .cli
            .output_dir
            .clone()
            .or_else(|| self.toml.output.base_dir.clone())
            .unwrap_or_else(|| PathBuf::from(default));
        self.resolve_path(dir)
    }

    /// Agent definitions directory (CLI → config → `.conductor/agents`).
    pub fn agents_dir(&self) -> PathBuf {
        match self.cli.agents_dir.clone().or_else(|| self.toml.agents.dir.clone()) {
            Some(dir) => self.resolve_path(dir),
            None => self.config_dir.join("agents"),
        }
    }

    pub fn orchestrator_settings(&self) -> Result<OrchestratorSettings> {
        Ok(OrchestratorSettings {
            mode: self.permission_mode()?,
            approval_timeout: self.approval_timeout(),
            artifact_policy: self.artifact_policy(),
            model: self.model()?,
            cwd: self.project_dir.clone(),
        })
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }

    /// Resolve a relative path against the project directory.
    pub fn resolve_path(&self, dir: PathBuf) -> PathBuf {
        if dir.is_absolute() {
            dir
        } else {
            self.project_dir.join(dir)
        }
    }
}
