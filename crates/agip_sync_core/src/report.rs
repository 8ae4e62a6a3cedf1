//! Run output summary.
//!
//! # Responsibility
//! - Summarize fetch and qualification counts plus full pair details.
//! - Write the summary as indented JSON, replacing the previous run's file.

use crate::model::proposal::{ProposalPair, QualifiedProposal};
use crate::persist::replace_file;
use crate::sequence::{pair_sequence_number, SequenceReport};
use crate::tracking::reconciler::ReconcileSummary;
use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Debug)]
pub enum ReportError {
    Encode(serde_json::Error),
    Io { path: PathBuf, source: io::Error },
}

impl Display for ReportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode(err) => write!(f, "failed to encode run report: {err}"),
            Self::Io { path, source } => {
                write!(f, "failed to write run report `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for ReportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Encode(err) => Some(err),
            Self::Io { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProposalRef {
    pub id: String,
    pub title: String,
    pub author: String,
    pub scores_total: f64,
}

impl From<&QualifiedProposal> for ProposalRef {
    fn from(value: &QualifiedProposal) -> Self {
        Self {
            id: value.id().to_string(),
            title: value.title().to_string(),
            author: value.proposal.author.clone(),
            scores_total: value.proposal.scores_total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairReport {
    pub sequence_number: Option<u32>,
    pub similarity: f64,
    pub sigprop: ProposalRef,
    pub coreprop: ProposalRef,
}

impl From<&ProposalPair> for PairReport {
    fn from(pair: &ProposalPair) -> Self {
        Self {
            sequence_number: pair_sequence_number(pair),
            similarity: pair.similarity,
            sigprop: ProposalRef::from(&pair.sigprop),
            coreprop: ProposalRef::from(&pair.coreprop),
        }
    }
}

/// Everything one run observed and decided.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub space: String,
    pub fetched: usize,
    /// Closed proposals inside the configured space.
    pub eligible: usize,
    pub qualified_sigprops: usize,
    pub qualified_coreprops: usize,
    pub unmatched_sigprops: usize,
    pub sequence: SequenceReport,
    pub tracking: ReconcileSummary,
    pub pairs: Vec<PairReport>,
}

impl RunReport {
    /// Replaces the report file at `path`.
    pub fn write(&self, path: &Path) -> ReportResult<()> {
        let mut rendered = serde_json::to_string_pretty(self).map_err(ReportError::Encode)?;
        rendered.push('\n');
        replace_file(path, &rendered).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            "event=report_write module=report status=ok pairs={} path={}",
            self.pairs.len(),
            path.display()
        );
        Ok(())
    }
}
