//! Ledger reconciliation against new pairs and deployment evidence.
//!
//! # Responsibility
//! - Create or refresh one ledger entry per paired AGIP ordinal.
//! - Derive deployment status from scripts on disk and deploy markers.
//! - Generate missing deploy scripts for entries that have none.
//!
//! # Invariants
//! - Reconciling identical inputs twice leaves the ledger unchanged.
//! - A `deployed` entry is never demoted.
//! - Existing scripts are never regenerated.
//! - Pairs without an ordinal leave the ledger untouched.

use crate::model::proposal::{ProposalPair, Track};
use crate::sequence::pair_sequence_number;
use crate::tracking::entry::{DeploymentStatus, TrackingEntry};
use crate::tracking::evidence::DeploymentEvidence;
use crate::tracking::ledger::Ledger;
use crate::tracking::template::{render_deploy_script, ScriptLayout};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

/// Highest ordinal handled by the legacy, scripts-imply-deployed regime.
pub const DEFAULT_LEGACY_CUTOFF: u32 = 141;

pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[derive(Debug)]
pub enum ReconcileError {
    ScriptWrite { path: PathBuf, source: io::Error },
}

impl Display for ReconcileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ScriptWrite { path, source } => {
                write!(f, "failed to write deploy script `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for ReconcileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ScriptWrite { source, .. } => Some(source),
        }
    }
}

/// Counts of what one reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub created: usize,
    /// Existing entries whose status advanced.
    pub promoted: usize,
    /// Existing entries whose metadata changed but status did not.
    pub updated: usize,
    pub unchanged: usize,
    pub scripts_generated: usize,
    /// Pairs without a parseable ordinal.
    pub skipped: usize,
}

/// Deployment facts observed for one ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Observation {
    scripts_exist: bool,
    deployed: bool,
    pending: bool,
}

impl Observation {
    fn initial_status(self) -> DeploymentStatus {
        if self.deployed {
            DeploymentStatus::Deployed
        } else if self.pending {
            DeploymentStatus::Pending
        } else {
            DeploymentStatus::NotCreated
        }
    }
}

/// Merges pairs into the tracking ledger.
pub struct TrackingReconciler<E: DeploymentEvidence> {
    layout: ScriptLayout,
    evidence: E,
    legacy_cutoff: u32,
}

impl<E: DeploymentEvidence> TrackingReconciler<E> {
    pub fn new(layout: ScriptLayout, evidence: E) -> Self {
        Self {
            layout,
            evidence,
            legacy_cutoff: DEFAULT_LEGACY_CUTOFF,
        }
    }

    /// Overrides the legacy regime boundary.
    pub fn with_legacy_cutoff(mut self, legacy_cutoff: u32) -> Self {
        self.legacy_cutoff = legacy_cutoff;
        self
    }

    pub fn layout(&self) -> &ScriptLayout {
        &self.layout
    }

    /// Reconciles every pair into `ledger`, stamping changes with `now`.
    ///
    /// The ledger is only mutated in memory; persisting it is the caller's job.
    ///
    /// # Errors
    /// - [`ReconcileError::ScriptWrite`] when a deploy script cannot be written.
    ///   Entries processed before the failure stay mutated in memory.
    pub fn reconcile(
        &self,
        ledger: &mut Ledger,
        pairs: &[ProposalPair],
        now: DateTime<Utc>,
    ) -> ReconcileResult<ReconcileSummary> {
        let mut summary = ReconcileSummary::default();

        for pair in pairs {
            let Some(number) = pair_sequence_number(pair) else {
                debug!(
                    "event=reconcile module=tracking status=skip sigprop_id={} coreprop_id={}",
                    pair.sigprop.id(),
                    pair.coreprop.id()
                );
                summary.skipped += 1;
                continue;
            };
            self.reconcile_pair(ledger, number, pair, now, &mut summary)?;
        }

        info!(
            "event=reconcile module=tracking status=ok created={} promoted={} updated={} unchanged={} scripts_generated={} skipped={}",
            summary.created,
            summary.promoted,
            summary.updated,
            summary.unchanged,
            summary.scripts_generated,
            summary.skipped
        );
        Ok(summary)
    }

    fn reconcile_pair(
        &self,
        ledger: &mut Ledger,
        number: u32,
        pair: &ProposalPair,
        now: DateTime<Utc>,
        summary: &mut ReconcileSummary,
    ) -> ReconcileResult<()> {
        let sigprop_path = self.layout.script_path(number, Track::Sigprop);
        let coreprop_path = self.layout.script_path(number, Track::Coreprop);
        let observation = self.observe(number, pair, &sigprop_path, &coreprop_path);

        let previous = ledger.get(number).cloned();
        let mut entry = match previous.clone() {
            Some(mut entry) => {
                apply_observation(
                    &mut entry,
                    pair,
                    observation,
                    &sigprop_path,
                    &coreprop_path,
                    now,
                );
                entry
            }
            None => new_entry(number, pair, observation, &sigprop_path, &coreprop_path, now),
        };

        if entry.status == DeploymentStatus::NotCreated {
            summary.scripts_generated += self.generate_scripts(number, pair)?;
            entry.status = DeploymentStatus::Pending;
            entry.attach_scripts(path_ref(&sigprop_path), path_ref(&coreprop_path));
        }

        match &previous {
            None => summary.created += 1,
            Some(previous) if *previous == entry => summary.unchanged += 1,
            Some(previous) if previous.status != entry.status => summary.promoted += 1,
            Some(_) => summary.updated += 1,
        }
        debug!(
            "event=reconcile module=tracking status=ok number={} from={} to={}",
            number,
            previous
                .as_ref()
                .map_or("none", |previous| previous.status.as_str()),
            entry.status
        );
        ledger.insert(entry);
        Ok(())
    }

    fn observe(
        &self,
        number: u32,
        pair: &ProposalPair,
        sigprop_path: &Path,
        coreprop_path: &Path,
    ) -> Observation {
        let scripts_exist = sigprop_path.is_file() && coreprop_path.is_file();

        if number <= self.legacy_cutoff {
            return Observation {
                scripts_exist,
                deployed: scripts_exist,
                pending: false,
            };
        }

        let deployed = self.evidence.is_deployed(pair.sigprop.id())
            && self.evidence.is_deployed(pair.coreprop.id());
        Observation {
            scripts_exist,
            deployed,
            pending: scripts_exist && !deployed,
        }
    }

    /// Writes whichever of the two scripts is missing; returns how many.
    fn generate_scripts(&self, number: u32, pair: &ProposalPair) -> ReconcileResult<usize> {
        let mut written = 0;
        for (track, proposal_id) in [
            (Track::Sigprop, pair.sigprop.id()),
            (Track::Coreprop, pair.coreprop.id()),
        ] {
            let path = self.layout.script_path(number, track);
            if path.exists() {
                continue;
            }
            write_script(&path, &render_deploy_script(proposal_id, track))?;
            info!(
                "event=script_render module=tracking status=ok number={} track={} path={}",
                number,
                track.as_str(),
                path.display()
            );
            written += 1;
        }
        Ok(written)
    }
}

fn new_entry(
    number: u32,
    pair: &ProposalPair,
    observation: Observation,
    sigprop_path: &Path,
    coreprop_path: &Path,
    now: DateTime<Utc>,
) -> TrackingEntry {
    let status = observation.initial_status();
    let mut entry = TrackingEntry {
        sequence_number: number,
        title: pair.coreprop.title().to_string(),
        status,
        sigprop_script: None,
        coreprop_script: None,
        sigprop_id: pair.sigprop.id().to_string(),
        coreprop_id: pair.coreprop.id().to_string(),
        created_at: now,
        deployed_at: (status == DeploymentStatus::Deployed).then_some(now),
        tx_reference: None,
    };
    if observation.scripts_exist {
        entry.attach_scripts(path_ref(sigprop_path), path_ref(coreprop_path));
    }
    entry
}

fn apply_observation(
    entry: &mut TrackingEntry,
    pair: &ProposalPair,
    observation: Observation,
    sigprop_path: &Path,
    coreprop_path: &Path,
    now: DateTime<Utc>,
) {
    entry.title = pair.coreprop.title().to_string();
    entry.sigprop_id = pair.sigprop.id().to_string();
    entry.coreprop_id = pair.coreprop.id().to_string();

    if entry.status == DeploymentStatus::Deployed {
        return;
    }

    if observation.deployed {
        entry.mark_deployed(now);
    } else if observation.pending && entry.status != DeploymentStatus::Pending {
        entry.status = DeploymentStatus::Pending;
        entry.attach_scripts(path_ref(sigprop_path), path_ref(coreprop_path));
        entry.deployed_at = None;
    } else if !observation.pending && observation.scripts_exist {
        entry.status = DeploymentStatus::Pending;
        entry.deployed_at = None;
    }
}

fn write_script(path: &Path, contents: &str) -> ReconcileResult<()> {
    let to_error = |source| ReconcileError::ScriptWrite {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(to_error)?;
    }
    std::fs::write(path, contents).map_err(to_error)
}

fn path_ref(path: &Path) -> String {
    path.display().to_string()
}
