//! Workflows defined in a TOML file.
//!
//! ```toml
//! domain = "security"
//! output_dir = "security_review"       # optional, default "<domain>_analysis"
//! allowed_tools = ["Read", "Grep", "Glob", "Write"]
//! agents_dir = "agents"                # optional, loads <agents_dir>/<domain>/*.json
//! subdirs = ["reports"]
//! artifacts = ["{output_dir}/reports/threats.md"]
//!
//! [agents.reviewer]
//! description = "Reviews code for security issues"
//! prompt = "You are a security reviewer."
//! tools = ["Read", "Grep", "Glob", "Write"]
//!
//! [[phases]]
//! name = "Threat Model"
//! agent = "reviewer"
//! prompt = "Write a threat model to {output_dir}/reports/threats.md"
//! ```
//!
//! `{output_dir}` in prompts and artifact paths expands to the resolved output
//! directory. Agents are referenced by string; a phase naming an agent that is
//! neither inline nor in the agents directory fails the run before a session
//! is opened.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::agents::{AgentDefinition, AgentRegistry};
use crate::orchestrator::Workflow;
use crate::phase::PhaseSpec;

const OUTPUT_DIR_PLACEHOLDER: &str = "{output_dir}";

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowFile {
    pub domain: String,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    #[serde(default)]
    pub agents_dir: Option<PathBuf>,
    #[serde(default)]
    pub subdirs: Vec<PathBuf>,
    #[serde(default)]
    pub artifacts: Vec<String>,
    #[serde(default)]
    pub agents: BTreeMap<String, AgentDefinition>,
    #[serde(default)]
    pub phases: Vec<PhaseEntry>,
}

impl WorkflowFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read workflow file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse workflow file: {}", path.display()))
    }

    /// Output directory when neither the file nor the caller names one.
    pub fn default_output_dir(&self) -> PathBuf {
        PathBuf::from(format!("{}_analysis", self.domain))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhaseEntry {
    pub name: String,
    pub agent: String,
    pub prompt: String,
}

#[derive(Debug, Clone)]
pub struct CustomWorkflow {
    domain: String,
    output_dir: PathBuf,
    allowed_tools: BTreeSet<String>,
    agents: BTreeMap<String, AgentDefinition>,
    phases: Vec<PhaseSpec<String>>,
    artifacts: Vec<PathBuf>,
    subdirs: Vec<PathBuf>,
}

impl CustomWorkflow {
    /// Load a workflow file. `output_override` replaces the file's output dir.
    pub fn load(path: &Path, output_override: Option<&Path>) -> Result<Self> {
        let file = WorkflowFile::load(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_file(file, base, output_override)
    }

    /// Build from a parsed file. Relative `agents_dir` resolves against `base`.
    pub fn from_file(
        file: WorkflowFile,
        base: &Path,
        output_override: Option<&Path>,
    ) -> Result<Self> {
        if file.domain.trim().is_empty() {
            bail!("Workflow domain must not be empty");
        }
        let mut seen = HashSet::new();
        for phase in &file.phases {
            if !seen.insert(phase.name.as_str()) {
                bail!("Duplicate phase name '{}'", phase.name);
            }
        }

        let output_dir = output_override
            .map(Path::to_path_buf)
            .or_else(|| file.output_dir.clone())
            .unwrap_or_else(|| file.default_output_dir());
        let expand = |s: &str| s.replace(OUTPUT_DIR_PLACEHOLDER, &output_dir.to_string_lossy());

        let mut agents = BTreeMap::new();
        if let Some(dir) = &file.agents_dir {
            let dir = if dir.is_absolute() {
                dir.clone()
            } else {
                base.join(dir)
            };
            agents = AgentRegistry::new(dir).load_domain(&file.domain)?;
        }
        // Inline definitions win over files.
        agents.extend(file.agents);

        let phases = file
            .phases
            .iter()
            .map(|p| PhaseSpec::new(p.name.clone(), p.agent.clone(), expand(&p.prompt)))
            .collect();
        let artifacts = file
            .artifacts
            .iter()
            .map(|a| PathBuf::from(expand(a)))
            .collect();

        Ok(Self {
            domain: file.domain,
            output_dir,
            allowed_tools: file.allowed_tools.into_iter().collect(),
            agents,
            phases,
            artifacts,
            subdirs: file.subdirs,
        })
    }

    pub fn agents(&self) -> &BTreeMap<String, AgentDefinition> {
        &self.agents
    }
}

impl Workflow for CustomWorkflow {
    type Agent = String;

    fn domain(&self) -> &str {
        &self.domain
    }

    fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn phases(&self) -> Vec<PhaseSpec<String>> {
        self.phases.clone()
    }

    fn agent_definition(&self, agent: &String) -> Option<AgentDefinition> {
        self.agents.get(agent).cloned()
    }

    fn allowed_tools(&self) -> BTreeSet<String> {
        self.allowed_tools.clone()
    }

    fn expected_artifacts(&self) -> Vec<PathBuf> {
        self.artifacts.clone()
    }

    fn output_subdirs(&self) -> Vec<PathBuf> {
        self.subdirs.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::OrchestratorError;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"
domain = "security"
allowed_tools = ["Read", "Grep", "Write"]
subdirs = ["reports"]
artifacts = ["{output_dir}/reports/threats.md"]

[agents.reviewer]
description = "Reviews code for security issues"
prompt = "You are a security reviewer."
tools = ["Read", "Grep"]

[[phases]]
name = "Threat Model"
agent = "reviewer"
prompt = "Write a threat model to {output_dir}/reports/threats.md"
"#;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_expands_output_dir() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "security.toml", SAMPLE);
        let wf = CustomWorkflow::load(&path, None).unwrap();

        assert_eq!(wf.domain(), "security");
        assert_eq!(wf.output_dir(), Path::new("security_analysis"));
        assert_eq!(
            wf.expected_artifacts(),
            vec![PathBuf::from("security_analysis/reports/threats.md")]
        );
        assert!(wf.phases()[0].prompt.contains("security_analysis/reports/threats.md"));
        assert_eq!(wf.agent_definitions().unwrap().len(), 1);
    }

    #[test]
    fn test_output_override_wins() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "security.toml", SAMPLE);
        let wf = CustomWorkflow::load(&path, Some(Path::new("/tmp/out"))).unwrap();
        assert_eq!(wf.output_dir(), Path::new("/tmp/out"));
        assert_eq!(
            wf.expected_artifacts()[0],
            PathBuf::from("/tmp/out/reports/threats.md")
        );
    }

    #[test]
    fn test_unknown_agent_surfaces_as_orchestrator_error() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            "bad.toml",
            r#"
domain = "ops"
[[phases]]
name = "Deploy"
agent = "ghost"
prompt = "Deploy it"
"#,
        );
        let wf = CustomWorkflow::load(&path, None).unwrap();
        match wf.agent_definitions() {
            Err(OrchestratorError::UnknownAgent { phase, agent }) => {
                assert_eq!(phase, "Deploy");
                assert_eq!(agent, "ghost");
            }
            other => panic!("Expected UnknownAgent, got {:?}", other),
        }
    }

    #[test]
    fn test_agents_dir_resolved_relative_to_file() {
        let dir = tempdir().unwrap();
        let agent_dir = dir.path().join("agents/ops");
        std::fs::create_dir_all(&agent_dir).unwrap();
        std::fs::write(
            agent_dir.join("deployer.json"),
            r#"{"description": "Deploys", "prompt": "You deploy.", "tools": ["Bash"]}"#,
        )
        .unwrap();
        let path = write(
            dir.path(),
            "ops.toml",
            r#"
domain = "ops"
agents_dir = "agents"
[[phases]]
name = "Deploy"
agent = "deployer"
prompt = "Deploy it"
"#,
        );
        let wf = CustomWorkflow::load(&path, None).unwrap();
        assert!(wf.agents().contains_key("deployer"));
        assert!(wf.agent_definitions().is_ok());
    }

    #[test]
    fn test_duplicate_phase_names_rejected() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            "dup.toml",
            r#"
domain = "x"
[[phases]]
name = "A"
agent = "a"
prompt = "p"
[[phases]]
name = "A"
agent = "a"
prompt = "p"
"#,
        );
        let err = CustomWorkflow::load(&path, None).unwrap_err();
        assert!(err.to_string().contains("Duplicate phase name"));
    }

    #[test]
    fn test_invalid_toml_errors_with_path() {
        let dir = tempdir().unwrap();
        let path = write(dir.path(), "broken.toml", "domain = ");
        let err = CustomWorkflow::load(&path, None).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }
}
