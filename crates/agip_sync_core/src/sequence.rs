//! AGIP sequence-number extraction and gap diagnostics.
//!
//! # Responsibility
//! - Extract the AGIP ordinal from proposal titles.
//! - Report ordinals missing from the matched range and classify why.
//! - Escalate clusters of recent gaps into a blocking error.
//!
//! # Invariants
//! - Pairs without a parseable ordinal are ignored, never an error.
//! - Gap diagnostics are read-only over the qualified proposal sets.

use crate::model::proposal::{ProposalPair, QualifiedProposal};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

static AGIP_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[?agip[\s-]?(\d+)\]?").expect("valid agip regex"));

/// Loose title spellings searched when diagnosing a gap.
const LOOSE_PREFIXES: &[&str] = &["agip ", "agip-", "agip"];

/// Number of most recent ordinals watched for gap clusters.
pub const RECENT_WINDOW: u32 = 5;
/// Recent gaps tolerated before the run is aborted.
pub const MAX_RECENT_GAPS: usize = 2;
/// Ordinals below the highest match that are scanned for gaps.
pub const MAX_GAP_SCAN: u32 = 1_000;

/// Extracts the AGIP ordinal from a title such as `[AGIP-142] Foo`.
pub fn extract_sequence_number(title: &str) -> Option<u32> {
    AGIP_NUMBER_RE
        .captures(title)
        .and_then(|caps| caps.get(1))
        .and_then(|digits| digits.as_str().parse().ok())
}

/// Extracts a pair's ordinal, preferring the coreprop title.
pub fn pair_sequence_number(pair: &ProposalPair) -> Option<u32> {
    extract_sequence_number(pair.coreprop.title())
        .or_else(|| extract_sequence_number(pair.sigprop.title()))
}

/// Why an ordinal is missing from the matched set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GapCause {
    /// Both tracks have a qualified proposal but they were not paired.
    MatchingFailed,
    /// Only the sigprop was found.
    CorepropAbsent,
    /// Only the coreprop was found.
    SigpropAbsent,
    /// Neither track mentions the ordinal.
    BothAbsent,
}

impl GapCause {
    fn classify(sigprop_found: bool, coreprop_found: bool) -> Self {
        match (sigprop_found, coreprop_found) {
            (true, true) => Self::MatchingFailed,
            (true, false) => Self::CorepropAbsent,
            (false, true) => Self::SigpropAbsent,
            (false, false) => Self::BothAbsent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SequenceGap {
    pub number: u32,
    pub cause: GapCause,
}

/// Diagnostic summary over matched ordinals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SequenceReport {
    /// Distinct matched ordinals, descending.
    pub numbers: Vec<u32>,
    /// `(min, max)` of `numbers`, absent when nothing matched.
    pub range: Option<(u32, u32)>,
    /// Missing ordinals, descending.
    pub gaps: Vec<SequenceGap>,
    /// Lowest ordinal scanned when the range is wider than [`MAX_GAP_SCAN`].
    /// Gaps below it are not listed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_floor: Option<u32>,
}

impl SequenceReport {
    /// Returns missing ordinals within the most recent `window` of the range.
    pub fn recent_gaps(&self, window: u32) -> Vec<u32> {
        let Some((_, max)) = self.range else {
            return Vec::new();
        };
        let floor = max.saturating_sub(window.saturating_sub(1));
        self.gaps
            .iter()
            .map(|gap| gap.number)
            .filter(|number| *number >= floor)
            .collect()
    }
}

pub type SequenceResult<T> = Result<T, SequenceError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    /// Too many recent ordinals are missing; likely a fetch or matching defect.
    RecentGapCluster { max: u32, missing: Vec<u32> },
}

impl Display for SequenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RecentGapCluster { max, missing } => write!(
                f,
                "{} AGIP numbers missing among the latest {RECENT_WINDOW} (up to {max}): {:?}",
                missing.len(),
                missing
            ),
        }
    }
}

impl Error for SequenceError {}

/// Gap detector over matched pairs.
#[derive(Debug, Clone, Copy)]
pub struct SequenceValidator {
    recent_window: u32,
    max_recent_gaps: usize,
}

impl Default for SequenceValidator {
    fn default() -> Self {
        Self {
            recent_window: RECENT_WINDOW,
            max_recent_gaps: MAX_RECENT_GAPS,
        }
    }
}

impl SequenceValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the gap report without applying the escalation rule.
    pub fn inspect(
        &self,
        pairs: &[ProposalPair],
        sigprops: &[QualifiedProposal],
        coreprops: &[QualifiedProposal],
    ) -> SequenceReport {
        let matched: BTreeSet<u32> = pairs.iter().filter_map(pair_sequence_number).collect();
        let (Some(&min), Some(&max)) = (matched.first(), matched.last()) else {
            return SequenceReport::default();
        };

        let floor = max.saturating_sub(MAX_GAP_SCAN - 1).max(min);
        let scan_floor = (floor > min).then_some(floor);
        if scan_floor.is_some() {
            warn!(
                "event=sequence_check module=sequence status=warn reason=range_truncated min={} max={} floor={}",
                min, max, floor
            );
        }

        let gaps = (floor..=max)
            .rev()
            .filter(|number| !matched.contains(number))
            .map(|number| SequenceGap {
                number,
                cause: GapCause::classify(
                    any_mentions(sigprops, number),
                    any_mentions(coreprops, number),
                ),
            })
            .collect();

        SequenceReport {
            numbers: matched.iter().rev().copied().collect(),
            range: Some((min, max)),
            gaps,
            scan_floor,
        }
    }

    /// Builds the gap report and fails on a cluster of recent gaps.
    ///
    /// # Errors
    /// - Returns [`SequenceError::RecentGapCluster`] when more than the
    ///   tolerated number of gaps fall in the most recent window.
    pub fn validate(
        &self,
        pairs: &[ProposalPair],
        sigprops: &[QualifiedProposal],
        coreprops: &[QualifiedProposal],
    ) -> SequenceResult<SequenceReport> {
        let report = self.inspect(pairs, sigprops, coreprops);

        for gap in &report.gaps {
            warn!(
                "event=sequence_gap module=sequence status=warn number={} cause={:?}",
                gap.number, gap.cause
            );
        }

        let recent = report.recent_gaps(self.recent_window);
        if recent.len() > self.max_recent_gaps {
            let max = report.range.map(|(_, max)| max).unwrap_or_default();
            return Err(SequenceError::RecentGapCluster {
                max,
                missing: recent,
            });
        }

        info!(
            "event=sequence_check module=sequence status=ok matched={} gaps={}",
            report.numbers.len(),
            report.gaps.len()
        );
        Ok(report)
    }
}

fn any_mentions(proposals: &[QualifiedProposal], number: u32) -> bool {
    proposals
        .iter()
        .any(|proposal| mentions_number(proposal.title(), number))
}

fn mentions_number(title: &str, number: u32) -> bool {
    let lowered = title.to_lowercase();
    LOOSE_PREFIXES.iter().any(|prefix| {
        let needle = format!("{prefix}{number}");
        lowered.match_indices(&needle).any(|(start, _)| {
            !lowered[start + needle.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit())
        })
    })
}
