//! Deploy-script rendering.
//!
//! # Responsibility
//! - Render the per-proposal script the deploy invoker runs.
//! - Name script paths per track and ordinal.
//!
//! # Invariants
//! - Rendering is pure: `(proposal_id, track) -> text`.
//! - The proposal id is embedded as an escaped string literal.

use crate::model::proposal::Track;
use std::path::{Path, PathBuf};

const PROPOSAL_ID_SLOT: &str = "{{PROPOSAL_ID}}";
const IS_COREPROP_SLOT: &str = "{{IS_COREPROP}}";

const DEPLOY_SCRIPT_TEMPLATE: &str = r#"import { run } from "hardhat";

export async function main() {
  const proposalId = {{PROPOSAL_ID}};
  const isCoreProp = {{IS_COREPROP}};

  await run("deployVoterDrop", { proposalId, isCoreProp });
}

if (require.main === module) {
  main()
    .then(() => process.exit(0))
    .catch((error) => {
      console.error(error);
      process.exit(1);
    });
}
"#;

/// Renders the deploy script for one proposal on one track.
pub fn render_deploy_script(proposal_id: &str, track: Track) -> String {
    let literal = serde_json::Value::String(proposal_id.to_string()).to_string();
    let is_coreprop = match track {
        Track::Coreprop => "true",
        Track::Sigprop => "false",
    };
    DEPLOY_SCRIPT_TEMPLATE
        .replace(PROPOSAL_ID_SLOT, &literal)
        .replace(IS_COREPROP_SLOT, is_coreprop)
}

/// Directories holding generated deploy scripts, one per track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLayout {
    pub sigprop_dir: PathBuf,
    pub coreprop_dir: PathBuf,
}

impl ScriptLayout {
    pub fn new(sigprop_dir: impl Into<PathBuf>, coreprop_dir: impl Into<PathBuf>) -> Self {
        Self {
            sigprop_dir: sigprop_dir.into(),
            coreprop_dir: coreprop_dir.into(),
        }
    }

    pub fn dir(&self, track: Track) -> &Path {
        match track {
            Track::Sigprop => &self.sigprop_dir,
            Track::Coreprop => &self.coreprop_dir,
        }
    }

    /// Returns `<track dir>/agip_<n>.ts`.
    pub fn script_path(&self, sequence_number: u32, track: Track) -> PathBuf {
        self.dir(track).join(format!("agip_{sequence_number}.ts"))
    }
}
