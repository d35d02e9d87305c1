//! Agent definition listing (`conductor agents list`).

use anyhow::Result;
use std::path::PathBuf;

use super::super::{AgentsCommands, Cli};

pub fn cmd_agents(cli: &Cli, project_dir: PathBuf, command: AgentsCommands) -> Result<()> {
    use conductor::agents::AgentRegistry;
    use conductor::config::{CliOverrides, ConductorConfig};

    match command {
        AgentsCommands::List { domain, agents_dir } => {
            let config = ConductorConfig::new(project_dir)?.with_cli(CliOverrides {
                agents_dir,
                ..Default::default()
            });
            let mut registry = AgentRegistry::new(config.agents_dir());
            let found = registry.discover(domain.as_deref())?;

            if found.is_empty() {
                println!("No agent definitions found in {}", registry.agents_dir().display());
                return Ok(());
            }

            println!();
            println!("Agents in {}:", registry.agents_dir().display());
            println!();
            for (name, path) in found {
                let agent_domain = path
                    .parent()
                    .and_then(|p| p.file_name())
                    .and_then(|n| n.to_str())
                    .map(str::to_string);
                match registry.load(&name, agent_domain.as_deref())? {
                    Some(agent) => println!(
                        "  {}/{} ({}): {}",
                        agent_domain.as_deref().unwrap_or("-"),
                        name,
                        agent.model,
                        agent.description
                    ),
                    None => println!("  {} ({})", name, path.display()),
                }
            }
            println!();
        }
    }
    Ok(())
}
