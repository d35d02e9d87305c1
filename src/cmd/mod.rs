//! CLI command implementations.
//!
//! | Module    | Commands handled                          |
//! |-----------|-------------------------------------------|
//! | `run`     | `Architecture`, `Ux`, `Workflow`          |
//! | `agents`  | `Agents`                                  |
//! | `config`  | `Config`                                  |
//! | `runs`    | `Runs`                                    |

pub mod agents;
pub mod config;
pub mod run;
pub mod runs;

pub use agents::cmd_agents;
pub use config::cmd_config;
pub use run::{cmd_architecture, cmd_ux, cmd_workflow};
pub use runs::cmd_runs;
