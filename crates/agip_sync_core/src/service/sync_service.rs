//! One sync run from proposal fetch to persisted ledger.
//!
//! # Responsibility
//! - Execute the pipeline: fetch -> qualify -> split -> match -> validate ->
//!   reconcile -> persist ledger -> write report.
//!
//! # Invariants
//! - Fatal errors abort before the ledger is written.
//! - The ledger is read once and written once per run.
//! - Runs must be serialized by the caller; there is no locking.

use crate::config::SyncConfig;
use crate::matching::GreedyMatcher;
use crate::model::proposal::{Proposal, QualifiedProposal, Track};
use crate::outcome::OutcomeClassifier;
use crate::report::{PairReport, ReportError, RunReport};
use crate::sequence::{SequenceError, SequenceValidator};
use crate::source::{ProposalSource, SourceError};
use crate::tracking::evidence::DeploymentEvidence;
use crate::tracking::ledger::{Ledger, LedgerError};
use crate::tracking::reconciler::{ReconcileError, TrackingReconciler};
use chrono::{DateTime, Utc};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type SyncResult<T> = Result<T, SyncError>;

/// Fatal run error.
#[derive(Debug)]
pub enum SyncError {
    Source(SourceError),
    Sequence(SequenceError),
    Reconcile(ReconcileError),
    Ledger(LedgerError),
    Report(ReportError),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source(err) => write!(f, "proposal fetch failed: {err}"),
            Self::Sequence(err) => write!(f, "sequence check failed: {err}"),
            Self::Reconcile(err) => write!(f, "tracking reconciliation failed: {err}"),
            Self::Ledger(err) => write!(f, "{err}"),
            Self::Report(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Source(err) => Some(err),
            Self::Sequence(err) => Some(err),
            Self::Reconcile(err) => Some(err),
            Self::Ledger(err) => Some(err),
            Self::Report(err) => Some(err),
        }
    }
}

impl SyncError {
    /// Stable short code for log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Source(_) => "source_failed",
            Self::Sequence(_) => "recent_gap_cluster",
            Self::Reconcile(_) => "reconcile_failed",
            Self::Ledger(_) => "ledger_write_failed",
            Self::Report(_) => "report_write_failed",
        }
    }
}

impl From<SourceError> for SyncError {
    fn from(value: SourceError) -> Self {
        Self::Source(value)
    }
}

impl From<SequenceError> for SyncError {
    fn from(value: SequenceError) -> Self {
        Self::Sequence(value)
    }
}

impl From<ReconcileError> for SyncError {
    fn from(value: ReconcileError) -> Self {
        Self::Reconcile(value)
    }
}

impl From<LedgerError> for SyncError {
    fn from(value: LedgerError) -> Self {
        Self::Ledger(value)
    }
}

impl From<ReportError> for SyncError {
    fn from(value: ReportError) -> Self {
        Self::Report(value)
    }
}

/// Pipeline over a proposal source and a deployment evidence probe.
pub struct SyncService<S: ProposalSource, E: DeploymentEvidence> {
    config: SyncConfig,
    source: S,
    reconciler: TrackingReconciler<E>,
    classifier: OutcomeClassifier,
    matcher: GreedyMatcher,
    validator: SequenceValidator,
}

impl<S: ProposalSource, E: DeploymentEvidence> SyncService<S, E> {
    pub fn new(config: SyncConfig, source: S, evidence: E) -> Self {
        let reconciler = TrackingReconciler::new(config.tracking.script_layout(), evidence)
            .with_legacy_cutoff(config.tracking.legacy_cutoff);
        Self {
            classifier: OutcomeClassifier::new(config.quorum),
            matcher: GreedyMatcher::new(),
            validator: SequenceValidator::new(),
            reconciler,
            source,
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Runs the full pipeline once, stamping ledger changes with `now`.
    ///
    /// # Errors
    /// - Any [`SyncError`]; the ledger file is untouched unless the failure is
    ///   the report write, which happens last.
    pub fn run(&self, now: DateTime<Utc>) -> SyncResult<RunReport> {
        let started_at = Instant::now();
        info!(
            "event=sync_run module=service status=start space={}",
            self.config.space
        );

        match self.run_inner(now) {
            Ok(report) => {
                info!(
                    "event=sync_run module=service status=ok pairs={} duration_ms={}",
                    report.pairs.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(report)
            }
            Err(err) => {
                error!(
                    "event=sync_run module=service status=error error_code={} duration_ms={} error={}",
                    err.code(),
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn run_inner(&self, now: DateTime<Utc>) -> SyncResult<RunReport> {
        let fetched = self.source.fetch(self.config.fetch_limit)?;
        let eligible: Vec<&Proposal> = fetched
            .iter()
            .filter(|proposal| proposal.is_closed() && self.in_space(proposal))
            .collect();

        let (sigprops, coreprops): (Vec<QualifiedProposal>, Vec<QualifiedProposal>) = self
            .classifier
            .qualify(eligible.iter().copied())
            .into_iter()
            .partition(|proposal| proposal.track == Track::Sigprop);
        info!(
            "event=classify module=service status=ok fetched={} eligible={} sigprops={} coreprops={}",
            fetched.len(),
            eligible.len(),
            sigprops.len(),
            coreprops.len()
        );

        let pairs = self.matcher.match_pairs(&sigprops, &coreprops);
        info!(
            "event=match module=service status=ok pairs={} unmatched_sigprops={}",
            pairs.len(),
            sigprops.len() - pairs.len()
        );

        let sequence = self.validator.validate(&pairs, &sigprops, &coreprops)?;

        let ledger_path = &self.config.tracking.ledger_path;
        let mut ledger = Ledger::load_or_default(ledger_path);
        let tracking = self.reconciler.reconcile(&mut ledger, &pairs, now)?;
        ledger.save(ledger_path)?;

        let report = RunReport {
            generated_at: now,
            space: self.config.space.clone(),
            fetched: fetched.len(),
            eligible: eligible.len(),
            qualified_sigprops: sigprops.len(),
            qualified_coreprops: coreprops.len(),
            unmatched_sigprops: sigprops.len() - pairs.len(),
            sequence,
            tracking,
            pairs: pairs.iter().map(PairReport::from).collect(),
        };
        report.write(&self.config.report_path)?;
        Ok(report)
    }

    fn in_space(&self, proposal: &Proposal) -> bool {
        self.config.space.is_empty() || proposal.space.id.eq_ignore_ascii_case(&self.config.space)
    }
}
