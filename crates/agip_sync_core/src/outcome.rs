//! Proposal outcome classification.
//!
//! # Responsibility
//! - Decide whether a proposal reached quorum.
//! - Decide whether a proposal passed by the differential-margin rule.
//!
//! # Invariants
//! - Missing or zero quorum never errors; fallback thresholds apply.
//! - A proposal with zero total score never passes.
//! - Classification reads the proposal only; it never mutates it.

use crate::model::proposal::{Proposal, QualifiedProposal};
use serde::{Deserialize, Serialize};

/// Required margin for a two-choice vote, in percentage points.
const BASE_DIFFERENTIAL_PCT: f64 = 10.0;
/// Extra margin required for every choice beyond two.
const DIFFERENTIAL_STEP_PCT: f64 = 5.0;

/// Fallback quorum thresholds for proposals that declare none.
///
/// Known heuristic: a proposal is judged against whichever threshold it
/// already satisfies, which stands in for a date-based rule switch. Kept as-is
/// until the real cut-over rule is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuorumThresholds {
    /// Lower threshold used by newer proposals.
    pub newer_threshold: f64,
    /// Higher threshold used by older proposals.
    pub older_threshold: f64,
}

impl Default for QuorumThresholds {
    fn default() -> Self {
        Self {
            newer_threshold: 4_000_000.0,
            older_threshold: 8_000_000.0,
        }
    }
}

/// Classification details for one proposal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outcome {
    pub quorum_reached: bool,
    pub passed: bool,
    /// Leading choice minus runner-up, in percentage points.
    pub differential: Option<f64>,
    pub required_differential: Option<f64>,
}

impl Outcome {
    /// Returns whether the proposal counts for pairing.
    pub fn is_qualified(&self) -> bool {
        self.quorum_reached && self.passed
    }
}

/// Quorum and pass/fail classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutcomeClassifier {
    thresholds: QuorumThresholds,
}

impl OutcomeClassifier {
    pub fn new(thresholds: QuorumThresholds) -> Self {
        Self { thresholds }
    }

    /// Classifies one proposal.
    pub fn classify(&self, proposal: &Proposal) -> Outcome {
        let margin = vote_margin(proposal);
        let required = required_differential(proposal.scores.len());
        let passed = match (margin, required) {
            (Some(differential), Some(required)) => differential >= required,
            _ => false,
        };

        Outcome {
            quorum_reached: self.quorum_reached(proposal),
            passed,
            differential: margin,
            required_differential: required,
        }
    }

    /// Returns whether the proposal reached quorum.
    ///
    /// An explicit positive quorum wins. Otherwise the newer threshold is used
    /// if the total already meets it, else the older one.
    pub fn quorum_reached(&self, proposal: &Proposal) -> bool {
        let total = proposal.scores_total;
        if proposal.quorum.is_finite() && proposal.quorum > 0.0 {
            return total >= proposal.quorum;
        }
        if total >= self.thresholds.newer_threshold {
            return true;
        }
        total >= self.thresholds.older_threshold
    }

    /// Returns whether the proposal passed by the differential rule.
    pub fn passed(&self, proposal: &Proposal) -> bool {
        self.classify(proposal).passed
    }

    /// Splits closed proposals into qualified proposals tagged by track.
    pub fn qualify<'a>(
        &self,
        proposals: impl IntoIterator<Item = &'a Proposal>,
    ) -> Vec<QualifiedProposal> {
        proposals
            .into_iter()
            .filter(|proposal| self.classify(proposal).is_qualified())
            .cloned()
            .map(QualifiedProposal::new)
            .collect()
    }
}

/// Required leading margin for a vote with `choice_count` choices.
///
/// Returns `None` below two choices: an uncontested vote never passes.
pub fn required_differential(choice_count: usize) -> Option<f64> {
    if choice_count < 2 {
        return None;
    }
    Some(BASE_DIFFERENTIAL_PCT + DIFFERENTIAL_STEP_PCT * (choice_count - 2) as f64)
}

fn vote_margin(proposal: &Proposal) -> Option<f64> {
    let total = proposal.scores_total;
    if proposal.scores.is_empty() || !total.is_finite() || total <= 0.0 {
        return None;
    }

    let mut percentages: Vec<f64> = proposal
        .scores
        .iter()
        .map(|score| score * 100.0 / total)
        .collect();
    percentages.sort_by(|a, b| b.total_cmp(a));

    let winning = percentages[0];
    let runner_up = percentages.get(1).copied().unwrap_or(0.0);
    Some(winning - runner_up)
}
