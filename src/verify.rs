//! Post-run artifact checks.
//!
//! An artifact counts as present when it is a regular file with a non-zero
//! size. Verification never fails on its own; the caller decides what a
//! missing artifact means via [`ArtifactPolicy`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// What a missing artifact means for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactPolicy {
    /// Report and warn only.
    #[default]
    Advisory,
    /// Missing artifacts fail the run.
    Strict,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub present: BTreeSet<PathBuf>,
    pub missing: BTreeSet<PathBuf>,
    /// Byte size of each present artifact.
    pub sizes: BTreeMap<PathBuf, u64>,
}

impl VerificationReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputVerifier;

impl OutputVerifier {
    pub fn verify(&self, expected: &[PathBuf]) -> VerificationReport {
        let mut report = VerificationReport::default();
        for path in expected {
            match non_empty_file_size(path) {
                Some(size) => {
                    report.sizes.insert(path.clone(), size);
                    report.present.insert(path.clone());
                }
                None => {
                    report.missing.insert(path.clone());
                }
            }
        }
        report
    }
}

fn non_empty_file_size(path: &Path) -> Option<u64> {
    let meta = std::fs::metadata(path).ok()?;
    (meta.is_file() && meta.len() > 0).then_some(meta.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_verify_partitions_present_and_missing() {
        let dir = tempdir().unwrap();
        let written = dir.path().join("README.md");
        std::fs::write(&written, "# Architecture\n").unwrap();
        let empty = dir.path().join("empty.md");
        std::fs::write(&empty, "").unwrap();
        let absent = dir.path().join("docs/04_api_reference.md");

        let report = OutputVerifier.verify(&[written.clone(), empty.clone(), absent.clone()]);

        assert!(report.present.contains(&written));
        assert_eq!(report.sizes.get(&written), Some(&15));
        assert!(report.missing.contains(&empty));
        assert!(report.missing.contains(&absent));
        assert!(!report.is_complete());
    }

    #[test]
    fn test_directory_is_not_an_artifact() {
        let dir = tempdir().unwrap();
        let report = OutputVerifier.verify(&[dir.path().to_path_buf()]);
        assert_eq!(report.missing.len(), 1);
    }

    #[test]
    fn test_verify_is_idempotent() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.md");
        std::fs::write(&a, "content").unwrap();
        let expected = vec![a, dir.path().join("b.md")];

        let first = OutputVerifier.verify(&expected);
        let second = OutputVerifier.verify(&expected);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_expectation_is_complete() {
        assert!(OutputVerifier.verify(&[]).is_complete());
    }
}
