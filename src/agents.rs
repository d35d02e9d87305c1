//! Agent definitions and the on-disk agent registry.
//!
//! Agent definitions are stored as JSON files grouped by domain:
//!
//! ```text
//! agents/
//! ├── architecture/
//! │   ├── analyzer.json
//! │   └── doc-writer.json
//! └── ux/
//!     └── ux-researcher.json
//! ```
//!
//! Each file holds `{"description", "prompt", "tools"?, "model"?}`; the agent
//! name is the file stem. Directories starting with `_` are skipped.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;
use serde::{Deserialize, Serialize};

/// Model an agent runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    #[default]
    Sonnet,
    Opus,
    Haiku,
    /// Use whatever the session runs on.
    Inherit,
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Model::Sonnet => "sonnet",
            Model::Opus => "opus",
            Model::Haiku => "haiku",
            Model::Inherit => "inherit",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Model {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sonnet" => Ok(Model::Sonnet),
            "opus" => Ok(Model::Opus),
            "haiku" => Ok(Model::Haiku),
            "inherit" => Ok(Model::Inherit),
            _ => anyhow::bail!(
                "Invalid model '{}'. Valid values: sonnet, opus, haiku, inherit",
                s
            ),
        }
    }
}

/// Immutable configuration of one agent, handed to the session at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub description: String,
    pub prompt: String,
    #[serde(default)]
    pub tools: BTreeSet<String>,
    #[serde(default)]
    pub model: Model,
}

impl AgentDefinition {
    pub fn new(description: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            prompt: prompt.into(),
            tools: BTreeSet::new(),
            model: Model::default(),
        }
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }
}

/// Name of an agent within a workflow.
///
/// Built-in workflows use a closed enum so every phase's agent is known at
/// compile time. `String` is the open form for workflows loaded from files.
pub trait AgentName: Clone + Ord + fmt::Display + fmt::Debug + Send + Sync + 'static {
    fn as_str(&self) -> &str;
}

impl AgentName for String {
    fn as_str(&self) -> &str {
        self
    }
}

/// Discovers and caches agent definitions under a base directory.
#[derive(Debug)]
pub struct AgentRegistry {
    agents_dir: PathBuf,
    cache: HashMap<String, AgentDefinition>,
}

impl AgentRegistry {
    pub fn new(agents_dir: impl Into<PathBuf>) -> Self {
        Self {
            agents_dir: agents_dir.into(),
            cache: HashMap::new(),
        }
    }

    pub fn agents_dir(&self) -> &Path {
        &self.agents_dir
    }

    /// Map of agent name to definition file, optionally limited to one domain.
    pub fn discover(&self, domain: Option<&str>) -> Result<BTreeMap<String, PathBuf>> {
        let pattern = match domain {
            Some(domain) => self.agents_dir.join(domain).join("*.json"),
            None => self.agents_dir.join("*").join("*.json"),
        };
        let pattern = pattern.to_string_lossy().to_string();

        let mut found = BTreeMap::new();
        for entry in glob(&pattern).context("Invalid agent glob pattern")? {
            let path = entry.context("Failed to read agent directory entry")?;
            let skipped = path
                .parent()
                .and_then(Path::file_name)
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('_'));
            if skipped {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                found.insert(stem.to_string(), path.clone());
            }
        }
        Ok(found)
    }

    /// Load one agent by name. Returns `None` if no definition file exists.
    pub fn load(&mut self, name: &str, domain: Option<&str>) -> Result<Option<AgentDefinition>> {
        let cache_key = match domain {
            Some(domain) => format!("{}/{}", domain, name),
            None => name.to_string(),
        };
        if let Some(agent) = self.cache.get(&cache_key) {
            return Ok(Some(agent.clone()));
        }

        let Some(path) = self.discover(domain)?.remove(name) else {
            return Ok(None);
        };
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read agent definition: {}", path.display()))?;
        let agent: AgentDefinition = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse agent definition: {}", path.display()))?;

        self.cache.insert(cache_key, agent.clone());
        Ok(Some(agent))
    }

    /// Load every agent in a domain.
    pub fn load_domain(&mut self, domain: &str) -> Result<BTreeMap<String, AgentDefinition>> {
        let mut agents = BTreeMap::new();
        for name in self.discover(Some(domain))?.into_keys() {
            if let Some(agent) = self.load(&name, Some(domain))? {
                agents.insert(name, agent);
            }
        }
        Ok(agents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_agent(dir: &Path, domain: &str, name: &str, body: &str) {
        let domain_dir = dir.join(domain);
        std::fs::create_dir_all(&domain_dir).unwrap();
        std::fs::write(domain_dir.join(format!("{}.json", name)), body).unwrap();
    }

    #[test]
    fn test_definition_defaults() {
        let agent: AgentDefinition =
            serde_json::from_str(r#"{"description": "d", "prompt": "p"}"#).unwrap();
        assert_eq!(agent.model, Model::Sonnet);
        assert!(agent.tools.is_empty());
    }

    #[test]
    fn test_model_parse_and_display() {
        assert_eq!("OPUS".parse::<Model>().unwrap(), Model::Opus);
        assert_eq!(Model::Haiku.to_string(), "haiku");
        assert!("gpt".parse::<Model>().is_err());
    }

    #[test]
    fn test_discover_skips_underscore_dirs() {
        let dir = tempdir().unwrap();
        write_agent(dir.path(), "ux", "ux-researcher", "{}");
        write_agent(dir.path(), "_drafts", "scratch", "{}");

        let registry = AgentRegistry::new(dir.path());
        let found = registry.discover(None).unwrap();
        assert!(found.contains_key("ux-researcher"));
        assert!(!found.contains_key("scratch"));
    }

    #[test]
    fn test_load_domain_and_cache() {
        let dir = tempdir().unwrap();
        write_agent(
            dir.path(),
            "architecture",
            "analyzer",
            r#"{"description": "Analyzes code", "prompt": "You analyze.", "tools": ["Read", "Grep"], "model": "opus"}"#,
        );

        let mut registry = AgentRegistry::new(dir.path());
        let agents = registry.load_domain("architecture").unwrap();
        let analyzer = &agents["analyzer"];
        assert_eq!(analyzer.model, Model::Opus);
        assert!(analyzer.tools.contains("Grep"));

        // Served from cache even after the file is gone.
        std::fs::remove_file(dir.path().join("architecture/analyzer.json")).unwrap();
        assert!(
            registry
                .load("analyzer", Some("architecture"))
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn test_load_missing_agent_is_none() {
        let dir = tempdir().unwrap();
        let mut registry = AgentRegistry::new(dir.path());
        assert!(registry.load("ghost", Some("ux")).unwrap().is_none());
    }

    #[test]
    fn test_load_invalid_json_errors() {
        let dir = tempdir().unwrap();
        write_agent(dir.path(), "ux", "broken", "{not json");
        let mut registry = AgentRegistry::new(dir.path());
        assert!(registry.load("broken", Some("ux")).is_err());
    }
}
