//! Past run records (`conductor runs <dir>`).

use anyhow::Result;
use std::path::Path;

pub fn cmd_runs(dir: &Path) -> Result<()> {
    use conductor::audit::AuditLogger;
    use console::style;

    let logger = AuditLogger::new(dir);
    let runs = logger.list_runs()?;
    if runs.is_empty() {
        println!("No run records in {}", dir.display());
        return Ok(());
    }

    println!();
    for path in runs {
        let run = match logger.load_run(&path) {
            Ok(run) => run,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %format!("{:#}", e), "Skipping unreadable run record");
                continue;
            }
        };
        let status = if run.succeeded() {
            style("ok".to_string()).green()
        } else {
            style(format!("exit {}", run.exit_code)).red()
        };
        println!(
            "  {}  {:<12} {} phase(s)  ${:.4}  {}",
            run.started_at.format("%Y-%m-%d %H:%M:%S"),
            run.domain,
            run.phases.len(),
            run.costs.total_usd,
            status
        );
    }
    println!();
    Ok(())
}
