//! Proposal source seam.
//!
//! # Responsibility
//! - Define how a run obtains proposals from the vote-tallying service.
//! - Provide a file-backed source for exported proposal snapshots.
//!
//! # Invariants
//! - Sources return at most `limit` proposals and may return fewer.
//! - Source failures are fatal for the run; there is no retry.

use crate::model::proposal::Proposal;
use log::{error, info};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;
use std::time::Instant;

pub type SourceResult<T> = Result<T, SourceError>;

#[derive(Debug)]
pub enum SourceError {
    Io { path: PathBuf, source: io::Error },
    /// The file is not JSON or has neither accepted export layout.
    Decode { path: PathBuf, source: serde_json::Error },
    /// One proposal record inside a well-formed export failed to decode.
    Record {
        path: PathBuf,
        index: usize,
        id: Option<String>,
        source: serde_json::Error,
    },
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read proposals `{}`: {source}", path.display())
            }
            Self::Decode { path, source } => {
                write!(f, "failed to decode proposals `{}`: {source}", path.display())
            }
            Self::Record {
                path,
                index,
                id,
                source,
            } => write!(
                f,
                "failed to decode proposal #{index} (id {}) in `{}`: {source}",
                id.as_deref().unwrap_or("unknown"),
                path.display()
            ),
        }
    }
}

impl Error for SourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Decode { source, .. } => Some(source),
            Self::Record { source, .. } => Some(source),
        }
    }
}

/// Supplier of proposals for one governance space.
pub trait ProposalSource {
    fn fetch(&self, limit: usize) -> SourceResult<Vec<Proposal>>;
}

/// In-memory proposals, in order.
impl ProposalSource for Vec<Proposal> {
    fn fetch(&self, limit: usize) -> SourceResult<Vec<Proposal>> {
        Ok(self.iter().take(limit).cloned().collect())
    }
}

/// Pulls the proposal records out of either accepted export layout: a bare
/// array or a GraphQL response envelope `{"data":{"proposals":[..]}}`.
fn export_records(document: Value) -> Result<Vec<Value>, serde_json::Error> {
    let records = match document {
        Value::Array(records) => Some(records),
        Value::Object(mut root) => match root.remove("data") {
            Some(Value::Object(mut data)) => match data.remove("proposals") {
                Some(Value::Array(records)) => Some(records),
                _ => None,
            },
            _ => None,
        },
        _ => None,
    };
    records.ok_or_else(|| {
        <serde_json::Error as serde::de::Error>::custom(
            "expected a proposal array or a `data.proposals` array",
        )
    })
}

/// Reads proposals from a JSON export on disk.
#[derive(Debug, Clone)]
pub struct JsonFileProposalSource {
    path: PathBuf,
}

impl JsonFileProposalSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ProposalSource for JsonFileProposalSource {
    fn fetch(&self, limit: usize) -> SourceResult<Vec<Proposal>> {
        let started_at = Instant::now();
        info!(
            "event=proposal_fetch module=source status=start path={}",
            self.path.display()
        );

        let raw = std::fs::read_to_string(&self.path).map_err(|source| {
            error!(
                "event=proposal_fetch module=source status=error error_code=read_failed error={}",
                source
            );
            SourceError::Io {
                path: self.path.clone(),
                source,
            }
        })?;

        let records = serde_json::from_str(&raw)
            .and_then(export_records)
            .map_err(|source| {
                error!(
                    "event=proposal_fetch module=source status=error error_code=decode_failed error={}",
                    source
                );
                SourceError::Decode {
                    path: self.path.clone(),
                    source,
                }
            })?;

        let proposals = records
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(index, record)| {
                let id = record.get("id").and_then(Value::as_str).map(str::to_string);
                serde_json::from_value::<Proposal>(record).map_err(|source| {
                    error!(
                        "event=proposal_fetch module=source status=error error_code=record_invalid index={} error={}",
                        index, source
                    );
                    SourceError::Record {
                        path: self.path.clone(),
                        index,
                        id,
                        source,
                    }
                })
            })
            .collect::<SourceResult<Vec<_>>>()?;

        info!(
            "event=proposal_fetch module=source status=ok count={} duration_ms={}",
            proposals.len(),
            started_at.elapsed().as_millis()
        );
        Ok(proposals)
    }
}
