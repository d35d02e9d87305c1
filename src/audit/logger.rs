use super::AuditRun;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes one JSON file per run into a directory.
pub struct AuditLogger {
    audit_dir: PathBuf,
}

impl AuditLogger {
    pub fn new(audit_dir: &Path) -> Self {
        Self {
            audit_dir: audit_dir.to_path_buf(),
        }
    }

    pub fn audit_dir(&self) -> &Path {
        &self.audit_dir
    }

    /// Write `run` as `run-<timestamp>_<id>.json` and return the path.
    pub fn write_run(&self, run: &AuditRun) -> Result<PathBuf> {
        fs::create_dir_all(&self.audit_dir).with_context(|| {
            format!(
                "Failed to create audit directory: {}",
                self.audit_dir.display()
            )
        })?;

        let filename = format!(
            "run-{}_{}.json",
            run.started_at.format("%Y-%m-%dT%H-%M-%S"),
            &run.run_id.to_string()[..8]
        );
        let run_file = self.audit_dir.join(filename);

        let json = serde_json::to_string_pretty(run).context("Failed to serialize audit run")?;
        fs::write(&run_file, json).context("Failed to write audit run file")?;
        Ok(run_file)
    }

    /// Run files in the directory, most recent first.
    pub fn list_runs(&self) -> Result<Vec<PathBuf>> {
        if !self.audit_dir.exists() {
            return Ok(Vec::new());
        }

        let mut runs: Vec<PathBuf> = fs::read_dir(&self.audit_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension().map(|e| e == "json").unwrap_or(false)
                    && p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with("run-"))
            })
            .collect();

        runs.sort();
        runs.reverse();
        Ok(runs)
    }

    pub fn load_run(&self, path: &Path) -> Result<AuditRun> {
        let content = fs::read_to_string(path).context("Failed to read audit run file")?;
        let run: AuditRun =
            serde_json::from_str(&content).context("Failed to parse audit run file")?;
        Ok(run)
    }
}
