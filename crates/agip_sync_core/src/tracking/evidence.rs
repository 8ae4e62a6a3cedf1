//! Deployment evidence probing.
//!
//! The deploy invoker leaves one marker file per proposal once a reward
//! artifact is live. Core only reads marker presence; it never triggers a
//! deployment.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Source of deployment evidence keyed by proposal identifier.
pub trait DeploymentEvidence {
    fn is_deployed(&self, proposal_id: &str) -> bool;
}

/// Marker files named `<proposal_id>.json` inside one directory.
#[derive(Debug, Clone)]
pub struct MarkerDirectoryEvidence {
    dir: PathBuf,
}

impl MarkerDirectoryEvidence {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the marker path for a proposal.
    pub fn marker_path(&self, proposal_id: &str) -> PathBuf {
        self.dir.join(format!("{proposal_id}.json"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DeploymentEvidence for MarkerDirectoryEvidence {
    fn is_deployed(&self, proposal_id: &str) -> bool {
        !proposal_id.is_empty() && self.marker_path(proposal_id).is_file()
    }
}

/// Fixed set of deployed proposal ids.
impl DeploymentEvidence for BTreeSet<String> {
    fn is_deployed(&self, proposal_id: &str) -> bool {
        self.contains(proposal_id)
    }
}

impl<T: DeploymentEvidence + ?Sized> DeploymentEvidence for &T {
    fn is_deployed(&self, proposal_id: &str) -> bool {
        (**self).is_deployed(proposal_id)
    }
}

#[cfg(test)]
mod tests {
    use super::{DeploymentEvidence, MarkerDirectoryEvidence};

    #[test]
    fn marker_presence_is_deployment_evidence() {
        let dir = tempfile::tempdir().unwrap();
        let evidence = MarkerDirectoryEvidence::new(dir.path());
        assert!(!evidence.is_deployed("0xabc"));

        std::fs::write(evidence.marker_path("0xabc"), "{}").unwrap();
        assert!(evidence.is_deployed("0xabc"));
        assert!(!evidence.is_deployed(""));
    }
}
