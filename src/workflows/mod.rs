//! Concrete workflows.
//!
//! - [`ArchitectureWorkflow`]: repository architecture documentation
//! - [`UxWorkflow`]: UX research through design system documentation
//! - [`CustomWorkflow`]: phases and agents loaded from a TOML file

pub mod architecture;
pub mod custom;
pub mod ux;

pub use architecture::{ArchitectureAgent, ArchitectureWorkflow};
pub use custom::{CustomWorkflow, WorkflowFile};
pub use ux::{UxAgent, UxWorkflow};

/// Appended to every built-in agent prompt.
pub(crate) const WRITE_FILES_NOTE: &str = "When asked to write to a file, use the Write tool to \
create it. Describing the file instead of writing it does not count.";
