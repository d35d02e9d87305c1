//! UX design workflow in six phases, each writing into its own subdirectory.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::agents::{AgentDefinition, AgentName, Model};
use crate::orchestrator::Workflow;
use crate::phase::PhaseSpec;

use super::WRITE_FILES_NOTE;

pub const OUTPUT_SUBDIR: &str = "ux_design_analysis";

const ALLOWED_TOOLS: &[&str] = &["Read", "Write", "Grep", "Glob", "Bash", "WebSearch"];

const RESEARCH_DIR: &str = "01_research";
const IA_DIR: &str = "02_ia";
const DESIGN_DIR: &str = "03_design";
const PROTOTYPES_DIR: &str = "04_prototypes";
const API_CONTRACTS_DIR: &str = "05_api_contracts";
const DESIGN_SYSTEM_DIR: &str = "06_design_system";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UxAgent {
    UxResearcher,
    IaArchitect,
    UiDesigner,
    PrototypeDeveloper,
}

impl UxAgent {
    pub const ALL: [UxAgent; 4] = [
        UxAgent::UxResearcher,
        UxAgent::IaArchitect,
        UxAgent::UiDesigner,
        UxAgent::PrototypeDeveloper,
    ];
}

impl AgentName for UxAgent {
    fn as_str(&self) -> &str {
        match self {
            UxAgent::UxResearcher => "ux-researcher",
            UxAgent::IaArchitect => "ia-architect",
            UxAgent::UiDesigner => "ui-designer",
            UxAgent::PrototypeDeveloper => "prototype-developer",
        }
    }
}

impl fmt::Display for UxAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct UxWorkflow {
    project_name: String,
    output_dir: PathBuf,
}

impl UxWorkflow {
    /// Outputs go to `<base_dir>/ux_design_analysis`.
    pub fn new(project_name: impl Into<String>, base_dir: impl AsRef<Path>) -> Self {
        Self {
            project_name: project_name.into(),
            output_dir: base_dir.as_ref().join(OUTPUT_SUBDIR),
        }
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    fn artifact(&self, dir: &str, file: &str) -> PathBuf {
        self.output_dir.join(dir).join(file)
    }

    fn research(&self) -> PathBuf {
        self.artifact(RESEARCH_DIR, "user_research.md")
    }

    fn information_architecture(&self) -> PathBuf {
        self.artifact(IA_DIR, "information_architecture.md")
    }

    fn visual_design(&self) -> PathBuf {
        self.artifact(DESIGN_DIR, "visual_design.md")
    }

    fn prototypes(&self) -> PathBuf {
        self.artifact(PROTOTYPES_DIR, "interactive_prototypes.md")
    }

    fn api_contracts(&self) -> PathBuf {
        self.artifact(API_CONTRACTS_DIR, "api_specifications.md")
    }

    fn design_system(&self) -> PathBuf {
        self.artifact(DESIGN_SYSTEM_DIR, "design_system.md")
    }
}

impl Workflow for UxWorkflow {
    type Agent = UxAgent;

    fn domain(&self) -> &str {
        "ux_design"
    }

    fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn phases(&self) -> Vec<PhaseSpec<UxAgent>> {
        use UxAgent::*;
        let project = &self.project_name;
        vec![
            PhaseSpec::new(
                "UX Research",
                UxResearcher,
                format!(
                    "Research the users of {project}.\n\n\
                     Document:\n\
                     1. Requirements and business objectives\n\
                     2. Target users and their contexts\n\
                     3. Three to five personas with goals, pain points and motivations\n\
                     4. Journey maps with key touchpoints (Mermaid)\n\
                     5. A competitive analysis of similar products\n\
                     6. Insights and design opportunities\n\n\
                     Write the research to: {}\n\
                     Title it `# UX Research: {project}`.",
                    self.research().display()
                ),
            ),
            PhaseSpec::new(
                "Information Architecture",
                IaArchitect,
                format!(
                    "Design the information architecture for {project}, based on {}.\n\n\
                     Produce:\n\
                     1. A sitemap (Mermaid graph)\n\
                     2. Primary, secondary and utility navigation\n\
                     3. Content models for the main entities\n\
                     4. Wireframes for the key pages\n\
                     5. Search and filtering strategy where relevant\n\n\
                     Write the architecture to: {}\n\
                     Title it `# Information Architecture: {project}`.",
                    self.research().display(),
                    self.information_architecture().display()
                ),
            ),
            PhaseSpec::new(
                "Visual Design",
                UiDesigner,
                format!(
                    "Create the visual design for {project}, based on {}.\n\n\
                     Produce:\n\
                     1. A design system: palette, typography, spacing, components\n\
                     2. High-fidelity mockup descriptions for the key pages\n\
                     3. Responsive behavior for mobile, tablet and desktop\n\
                     4. Accessibility guidance (WCAG contrast, focus states)\n\
                     5. Specifications developers can build from\n\n\
                     If design tools are available, use them; otherwise write detailed \
                     specifications.\n\n\
                     Write the design to: {}\n\
                     Title it `# Visual Design: {project}`.",
                    self.information_architecture().display(),
                    self.visual_design().display()
                ),
            ),
            PhaseSpec::new(
                "Interactive Prototyping",
                PrototypeDeveloper,
                format!(
                    "Specify interactive prototypes for {project}, based on {}.\n\n\
                     Produce:\n\
                     1. Critical user flows as Mermaid sequence diagrams\n\
                     2. Micro-interactions: trigger, feedback, duration, easing\n\
                     3. Animation and transition specifications\n\
                     4. Component states from default through error\n\
                     5. Usability testing scenarios with success criteria\n\n\
                     Write the prototypes to: {}\n\
                     Title it `# Interactive Prototypes: {project}`.",
                    self.visual_design().display(),
                    self.prototypes().display()
                ),
            ),
            PhaseSpec::new(
                "API Contract Design",
                IaArchitect,
                format!(
                    "Design the API contracts {project} needs, based on {}.\n\n\
                     Define:\n\
                     1. Data models as JSON schemas\n\
                     2. Endpoints for each user flow\n\
                     3. Request and response shapes with examples\n\
                     4. Error responses and validation rules\n\
                     5. Real-time requirements, if any\n\n\
                     Write the contracts to: {}\n\
                     Title it `# API Contract Specifications: {project}`.",
                    self.prototypes().display(),
                    self.api_contracts().display()
                ),
            ),
            PhaseSpec::new(
                "Design System Documentation",
                UiDesigner,
                format!(
                    "Document the design system for {project}.\n\n\
                     Review:\n\
                     - {}\n\
                     - {}\n\
                     - {}\n\n\
                     Cover design tokens (as CSS variables), the component library with \
                     variants, states, props and accessibility notes, usage do's and \
                     don'ts, an implementation guide and contribution guidelines.\n\n\
                     Write the documentation to: {}\n\
                     Title it `# Design System: {project}`.",
                    self.visual_design().display(),
                    self.prototypes().display(),
                    self.api_contracts().display(),
                    self.design_system().display()
                ),
            ),
        ]
    }

    fn agent_definition(&self, agent: &UxAgent) -> Option<AgentDefinition> {
        let (description, role, tools): (&str, &str, &[&str]) = match agent {
            UxAgent::UxResearcher => (
                "Conducts user research, creates personas, and analyzes user journeys",
                "You are a UX research expert. Analyze requirements and user needs, build \
                 personas, map journeys, study competitors and turn findings into \
                 actionable insights. Be data-driven and empathetic.",
                &["Read", "Write", "Grep", "Glob", "WebSearch"],
            ),
            UxAgent::IaArchitect => (
                "Designs information architecture, sitemaps, and navigation structures",
                "You are an information architecture expert. Organize content into clear \
                 hierarchies, draw sitemaps, design navigation, define content models and \
                 sketch wireframes. Optimize for findability.",
                &["Read", "Write", "Grep", "Glob"],
            ),
            UxAgent::UiDesigner => (
                "Creates visual designs and high-fidelity mockups",
                "You are a UI design expert. Produce high-fidelity visual designs with sound \
                 typography, color, spacing and hierarchy. Design responsive layouts that meet \
                 WCAG, and document specifications developers can follow.",
                &["Read", "Write", "Grep", "Glob"],
            ),
            UxAgent::PrototypeDeveloper => (
                "Creates interactive prototypes and validates user flows",
                "You are a prototyping expert. Demonstrate user flows, specify interactions \
                 and micro-interactions, write usability test scenarios and call out \
                 technical constraints.",
                &["Read", "Write", "Grep", "Glob", "Bash"],
            ),
        };
        Some(
            AgentDefinition::new(description, format!("{}\n\n{}", role, WRITE_FILES_NOTE))
                .with_tools(tools.iter().copied())
                .with_model(Model::Sonnet),
        )
    }

    fn allowed_tools(&self) -> BTreeSet<String> {
        ALLOWED_TOOLS.iter().map(|s| s.to_string()).collect()
    }

    fn expected_artifacts(&self) -> Vec<PathBuf> {
        vec![
            self.research(),
            self.information_architecture(),
            self.visual_design(),
            self.prototypes(),
            self.api_contracts(),
            self.design_system(),
        ]
    }

    fn output_subdirs(&self) -> Vec<PathBuf> {
        [
            RESEARCH_DIR,
            IA_DIR,
            DESIGN_DIR,
            PROTOTYPES_DIR,
            API_CONTRACTS_DIR,
            DESIGN_SYSTEM_DIR,
        ]
        .iter()
        .map(PathBuf::from)
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workflow() -> UxWorkflow {
        UxWorkflow::new("Lila", "outputs")
    }

    #[test]
    fn test_output_dir_nests_under_base() {
        assert_eq!(
            workflow().output_dir(),
            Path::new("outputs/ux_design_analysis")
        );
    }

    #[test]
    fn test_phase_agents() {
        let agents: Vec<_> = workflow().phases().into_iter().map(|p| p.agent).collect();
        assert_eq!(
            agents,
            vec![
                UxAgent::UxResearcher,
                UxAgent::IaArchitect,
                UxAgent::UiDesigner,
                UxAgent::PrototypeDeveloper,
                UxAgent::IaArchitect,
                UxAgent::UiDesigner,
            ]
        );
    }

    #[test]
    fn test_project_name_in_every_prompt() {
        for phase in workflow().phases() {
            assert!(phase.prompt.contains("Lila"), "{} lacks project name", phase.name);
        }
    }

    #[test]
    fn test_all_agents_defined_and_websearch_allowed() {
        let wf = workflow();
        assert_eq!(wf.agent_definitions().unwrap().len(), 4);
        let researcher = wf.agent_definition(&UxAgent::UxResearcher).unwrap();
        assert!(researcher.tools.contains("WebSearch"));
        assert!(wf.allowed_tools().contains("WebSearch"));
        for agent in UxAgent::ALL {
            assert!(wf.agent_definition(&agent).unwrap().tools.is_subset(&wf.allowed_tools()));
        }
    }

    #[test]
    fn test_artifacts_one_per_subdir() {
        let wf = workflow();
        let artifacts = wf.expected_artifacts();
        assert_eq!(artifacts.len(), 6);
        for (artifact, subdir) in artifacts.iter().zip(wf.output_subdirs()) {
            assert!(artifact.starts_with(wf.output_dir().join(subdir)));
        }
    }
}
