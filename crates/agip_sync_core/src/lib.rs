//! Core logic for pairing sigprops with coreprops and tracking their reward
//! deployments.
//! This crate is the single source of truth for classification, matching and
//! ledger invariants.

pub mod config;
pub mod logging;
pub mod matching;
pub mod model;
pub mod outcome;
mod persist;
pub mod report;
pub mod sequence;
pub mod service;
pub mod similarity;
pub mod source;
pub mod tracking;

pub use config::{ConfigError, LoggingConfig, SyncConfig, TrackingConfig};
pub use logging::{default_log_level, init_logging, logging_status, LogOptions};
pub use matching::GreedyMatcher;
pub use model::proposal::{Proposal, ProposalPair, QualifiedProposal, SpaceRef, Track};
pub use outcome::{Outcome, OutcomeClassifier, QuorumThresholds};
pub use report::{PairReport, RunReport};
pub use sequence::{
    extract_sequence_number, GapCause, SequenceError, SequenceGap, SequenceReport,
    SequenceValidator,
};
pub use service::sync_service::{SyncError, SyncResult, SyncService};
pub use similarity::similarity;
pub use source::{JsonFileProposalSource, ProposalSource, SourceError};
pub use tracking::entry::{DeploymentStatus, TrackingEntry};
pub use tracking::evidence::{DeploymentEvidence, MarkerDirectoryEvidence};
pub use tracking::ledger::{Ledger, LedgerError};
pub use tracking::reconciler::{ReconcileSummary, TrackingReconciler};
pub use tracking::template::{render_deploy_script, ScriptLayout};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
