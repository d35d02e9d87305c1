//! Configuration view and validation commands (`conductor config`).

use anyhow::{Context, Result};

use super::super::ConfigCommands;

pub fn cmd_config(project_dir: &std::path::Path, command: Option<ConfigCommands>) -> Result<()> {
    use conductor::config::{CONFIG_DIR, CONFIG_FILE, ConductorConfig, ConductorToml};

    let config_dir = project_dir.join(CONFIG_DIR);
    let config_path = config_dir.join(CONFIG_FILE);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Conductor Configuration");
            println!("=======================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No conductor.toml found at {}", config_path.display());
                println!("Using default configuration.");
            }
            println!();

            let config = ConductorConfig::new(project_dir.to_path_buf())?;
            let rendered = toml::to_string_pretty(&config.toml)
                .context("Failed to render configuration")?;
            for line in rendered.lines() {
                println!("  {}", line);
            }
            println!();

            println!("Effective values (with env overrides):");
            println!("  claude_cmd = \"{}\"", config.claude_cmd());
            match config.permission_mode() {
                Ok(mode) => println!("  permission_mode = \"{}\"", mode),
                Err(e) => println!("  permission_mode = <{:#}>", e),
            }
            match config.model() {
                Ok(Some(model)) => println!("  model = \"{}\"", model),
                Ok(None) => println!("  model = <runtime default>"),
                Err(e) => println!("  model = <{:#}>", e),
            }
            match config.approval_timeout() {
                Some(timeout) => println!("  approval_timeout = {}s", timeout.as_secs()),
                None => println!("  approval_timeout = none"),
            }
            println!("  agents_dir = \"{}\"", config.agents_dir().display());
            println!();

            if !config_path.exists() {
                println!("Run 'conductor config init' to create a conductor.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let toml = ConductorToml::load_or_default(&config_dir)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                if config_path.exists() {
                    println!("Configuration is valid.");
                } else {
                    println!("No conductor.toml found. Using defaults (valid).");
                }
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("conductor.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            std::fs::create_dir_all(&config_dir).with_context(|| {
                format!("Failed to create config directory: {}", config_dir.display())
            })?;
            ConductorToml::default().save(&config_path)?;

            println!("Created conductor.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [runtime] claude_cmd, model, extra_args");
            println!("  - [permissions] mode, approval_timeout_secs, auto_approve_deferred");
            println!("  - [output] base_dir, show_tool_details, audit");
            println!("  - [artifacts] strict");
            println!("  - [agents] dir");
            println!();
        }
    }

    Ok(())
}
