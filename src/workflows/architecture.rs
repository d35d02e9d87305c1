//! Repository architecture documentation in five phases.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::agents::{AgentDefinition, AgentName, Model};
use crate::orchestrator::Workflow;
use crate::phase::PhaseSpec;

use super::WRITE_FILES_NOTE;

pub const DEFAULT_OUTPUT_DIR: &str = "repo_analysis";

const ALLOWED_TOOLS: &[&str] = &["Read", "Write", "Grep", "Glob", "Bash"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArchitectureAgent {
    Analyzer,
    DocWriter,
}

impl ArchitectureAgent {
    pub const ALL: [ArchitectureAgent; 2] = [ArchitectureAgent::Analyzer, ArchitectureAgent::DocWriter];
}

impl AgentName for ArchitectureAgent {
    fn as_str(&self) -> &str {
        match self {
            ArchitectureAgent::Analyzer => "analyzer",
            ArchitectureAgent::DocWriter => "doc-writer",
        }
    }
}

impl fmt::Display for ArchitectureAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ArchitectureWorkflow {
    output_dir: PathBuf,
}

impl Default for ArchitectureWorkflow {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_DIR)
    }
}

impl ArchitectureWorkflow {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn docs_dir(&self) -> PathBuf {
        self.output_dir.join("docs")
    }

    pub fn diagrams_dir(&self) -> PathBuf {
        self.output_dir.join("diagrams")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.output_dir.join("reports")
    }

    fn component_inventory(&self) -> PathBuf {
        self.docs_dir().join("01_component_inventory.md")
    }

    fn architecture_diagrams(&self) -> PathBuf {
        self.diagrams_dir().join("02_architecture_diagrams.md")
    }

    fn data_flows(&self) -> PathBuf {
        self.docs_dir().join("03_data_flows.md")
    }

    fn api_reference(&self) -> PathBuf {
        self.docs_dir().join("04_api_reference.md")
    }

    fn readme(&self) -> PathBuf {
        self.output_dir.join("README.md")
    }
}

impl Workflow for ArchitectureWorkflow {
    type Agent = ArchitectureAgent;

    fn domain(&self) -> &str {
        "architecture"
    }

    fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn phases(&self) -> Vec<PhaseSpec<ArchitectureAgent>> {
        use ArchitectureAgent::*;
        vec![
            PhaseSpec::new(
                "Component Inventory",
                Analyzer,
                format!(
                    "Build an inventory of the components in this codebase.\n\n\
                     Cover:\n\
                     1. Every module and what it is for\n\
                     2. Key types and functions, with a one-line description each\n\
                     3. Which parts are public API and which are internal\n\
                     4. Entry points and main interfaces\n\n\
                     Write the inventory to: {}\n\n\
                     Sections: `# Component Inventory`, `## Public API`, \
                     `## Internal Implementation`, `## Entry Points`.\n\
                     Cite file paths and line numbers for every reference.",
                    self.component_inventory().display()
                ),
            ),
            PhaseSpec::new(
                "Architecture Diagrams",
                Analyzer,
                format!(
                    "Draw the architecture as Mermaid diagrams.\n\n\
                     Include:\n\
                     1. A layered view of the system\n\
                     2. How components relate to each other\n\
                     3. Type and trait hierarchies\n\
                     4. Module dependencies\n\n\
                     Write the diagrams to: {}\n\n\
                     Put each diagram in its own ```mermaid block under a heading, \
                     followed by a short explanation.",
                    self.architecture_diagrams().display()
                ),
            ),
            PhaseSpec::new(
                "Data Flow Analysis",
                Analyzer,
                format!(
                    "Document how data moves through the system using Mermaid sequence diagrams.\n\n\
                     Cover:\n\
                     1. A simple request or query\n\
                     2. A long-lived interactive session\n\
                     3. Permission or callback round trips\n\
                     4. Communication with external services\n\
                     5. Message parsing and routing\n\n\
                     Write the analysis to: {}\n\n\
                     Start with `# Data Flow Analysis`; give each flow a heading, \
                     a diagram and an explanation.",
                    self.data_flows().display()
                ),
            ),
            PhaseSpec::new(
                "API Documentation",
                DocWriter,
                format!(
                    "Write API reference documentation.\n\n\
                     Cover:\n\
                     1. Every public function and type\n\
                     2. Parameters, return types and examples\n\
                     3. Usage patterns\n\
                     4. Configuration options\n\n\
                     Write the reference to: {}\n\n\
                     Use concrete examples and link to source files.",
                    self.api_reference().display()
                ),
            ),
            PhaseSpec::new(
                "Final Synthesis",
                DocWriter,
                format!(
                    "Write a README that ties the earlier documents together.\n\n\
                     Read:\n\
                     - {}\n\
                     - {}\n\
                     - {}\n\
                     - {}\n\n\
                     Write the README to: {}\n\n\
                     Sections: `# Repository Architecture Documentation`, `## Overview`, \
                     `## Quick Start`, `## Architecture Summary`, `## Component Overview`, \
                     `## Data Flows`, `## References`.",
                    self.component_inventory().display(),
                    self.architecture_diagrams().display(),
                    self.data_flows().display(),
                    self.api_reference().display(),
                    self.readme().display()
                ),
            ),
        ]
    }

    fn agent_definition(&self, agent: &ArchitectureAgent) -> Option<AgentDefinition> {
        let definition = match agent {
            ArchitectureAgent::Analyzer => AgentDefinition::new(
                "Analyzes code structure, patterns, and architecture",
                format!(
                    "You are an expert code analyzer. Examine structure, patterns and \
                     architecture systematically. Produce clear Mermaid diagrams and \
                     well-structured markdown, and cite specific files and line numbers.\n\n\
                     {}\n\nBe thorough but concise.",
                    WRITE_FILES_NOTE
                ),
            )
            .with_tools(["Read", "Grep", "Glob", "Write", "Bash"]),
            ArchitectureAgent::DocWriter => AgentDefinition::new(
                "Writes comprehensive technical documentation",
                format!(
                    "You are a technical documentation expert. Write clear, organized \
                     markdown with examples and diagrams where they help, and link to \
                     source files with line numbers.\n\n\
                     {}\n\nKeep the documentation practical for developers.",
                    WRITE_FILES_NOTE
                ),
            )
            .with_tools(["Read", "Write", "Grep", "Glob"]),
        };
        Some(definition.with_model(Model::Sonnet))
    }

    fn allowed_tools(&self) -> BTreeSet<String> {
        ALLOWED_TOOLS.iter().map(|s| s.to_string()).collect()
    }

    fn expected_artifacts(&self) -> Vec<PathBuf> {
        vec![
            self.component_inventory(),
            self.architecture_diagrams(),
            self.data_flows(),
            self.api_reference(),
            self.readme(),
        ]
    }

    fn output_subdirs(&self) -> Vec<PathBuf> {
        vec!["docs".into(), "diagrams".into(), "reports".into()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_five_phases_in_order() {
        let wf = ArchitectureWorkflow::new("out");
        let names: Vec<_> = wf.phases().into_iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            vec![
                "Component Inventory",
                "Architecture Diagrams",
                "Data Flow Analysis",
                "API Documentation",
                "Final Synthesis"
            ]
        );
    }

    #[test]
    fn test_every_agent_is_defined() {
        let wf = ArchitectureWorkflow::new("out");
        let defs = wf.agent_definitions().unwrap();
        assert_eq!(
            defs.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["analyzer", "doc-writer"]
        );
        for agent in ArchitectureAgent::ALL {
            assert!(wf.agent_definition(&agent).is_some());
        }
    }

    #[test]
    fn test_agent_tools_within_allow_list() {
        let wf = ArchitectureWorkflow::new("out");
        let allowed = wf.allowed_tools();
        for def in wf.agent_definitions().unwrap().values() {
            assert!(def.tools.is_subset(&allowed));
        }
    }

    #[test]
    fn test_artifacts_live_under_output_dir() {
        let wf = ArchitectureWorkflow::new("out");
        let artifacts = wf.expected_artifacts();
        assert_eq!(artifacts.len(), 5);
        assert!(artifacts.contains(&PathBuf::from("out/docs/04_api_reference.md")));
        assert!(artifacts.contains(&PathBuf::from("out/README.md")));
        assert!(artifacts.iter().all(|p| p.starts_with("out")));
    }

    #[test]
    fn test_prompts_reference_their_artifacts() {
        let wf = ArchitectureWorkflow::new("out");
        let phases = wf.phases();
        assert!(phases[1].prompt.contains("02_architecture_diagrams.md"));
        assert!(phases[4].prompt.contains("01_component_inventory.md"));
        assert_eq!(phases[3].agent, ArchitectureAgent::DocWriter);
    }
}
