//! Persisted tracking ledger.
//!
//! # Responsibility
//! - Hold tracking entries keyed by AGIP ordinal.
//! - Load and save the ledger as an indented JSON object.
//!
//! # Invariants
//! - Saved keys are ordered by ordinal, descending.
//! - A missing, unreadable or corrupt ledger loads as empty; it never aborts.
//! - Save is a whole-file replace.

use crate::persist::replace_file;
use crate::tracking::entry::{DeploymentStatus, TrackingEntry};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug)]
pub enum LedgerError {
    Io { path: PathBuf, source: io::Error },
    Encode(serde_json::Error),
    Decode(serde_json::Error),
    EntryNotFound(u32),
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "ledger io failed at `{}`: {source}", path.display())
            }
            Self::Encode(err) => write!(f, "failed to encode ledger: {err}"),
            Self::Decode(err) => write!(f, "failed to decode ledger: {err}"),
            Self::EntryNotFound(number) => write!(f, "no ledger entry for AGIP {number}"),
        }
    }
}

impl Error for LedgerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Encode(err) | Self::Decode(err) => Some(err),
            Self::EntryNotFound(_) => None,
        }
    }
}

/// In-memory tracking ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    entries: BTreeMap<u32, TrackingEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, sequence_number: u32) -> Option<&TrackingEntry> {
        self.entries.get(&sequence_number)
    }

    pub fn get_mut(&mut self, sequence_number: u32) -> Option<&mut TrackingEntry> {
        self.entries.get_mut(&sequence_number)
    }

    /// Inserts or replaces the entry for its ordinal.
    pub fn insert(&mut self, entry: TrackingEntry) {
        self.entries.insert(entry.sequence_number, entry);
    }

    /// Iterates entries by ordinal, descending.
    pub fn iter_desc(&self) -> impl Iterator<Item = &TrackingEntry> {
        self.entries.values().rev()
    }

    /// Counts entries per status.
    pub fn status_counts(&self) -> BTreeMap<DeploymentStatus, usize> {
        let mut counts = BTreeMap::new();
        for entry in self.entries.values() {
            *counts.entry(entry.status).or_insert(0) += 1;
        }
        counts
    }

    /// Records an operator-confirmed deployment.
    ///
    /// Stamps `now` only when the entry was not already deployed. A provided
    /// `tx_reference` always replaces the stored one.
    ///
    /// # Errors
    /// - [`LedgerError::EntryNotFound`] when no entry exists for the ordinal.
    pub fn record_deployment(
        &mut self,
        sequence_number: u32,
        tx_reference: Option<String>,
        now: DateTime<Utc>,
    ) -> LedgerResult<&TrackingEntry> {
        let entry = self
            .entries
            .get_mut(&sequence_number)
            .ok_or(LedgerError::EntryNotFound(sequence_number))?;
        entry.mark_deployed(now);
        if tx_reference.is_some() {
            entry.tx_reference = tx_reference;
        }
        Ok(&*entry)
    }

    /// Loads the ledger, falling back to empty on any failure.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(Some(ledger)) => {
                info!(
                    "event=ledger_load module=tracking status=ok entries={} path={}",
                    ledger.len(),
                    path.display()
                );
                ledger
            }
            Ok(None) => {
                info!(
                    "event=ledger_load module=tracking status=ok entries=0 missing=true path={}",
                    path.display()
                );
                Self::new()
            }
            Err(err) => {
                warn!(
                    "event=ledger_load module=tracking status=warn path={} error={}",
                    path.display(),
                    err
                );
                Self::new()
            }
        }
    }

    /// Loads the ledger, returning `None` when the file does not exist.
    pub fn load(path: &Path) -> LedgerResult<Option<Self>> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(LedgerError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::from_json(&raw).map(Some)
    }

    pub fn from_json(raw: &str) -> LedgerResult<Self> {
        serde_json::from_str(raw).map_err(LedgerError::Decode)
    }

    /// Renders the ledger as indented JSON with a trailing newline.
    pub fn to_json_pretty(&self) -> LedgerResult<String> {
        let mut rendered = serde_json::to_string_pretty(self).map_err(LedgerError::Encode)?;
        rendered.push('\n');
        Ok(rendered)
    }

    /// Replaces the ledger file with the current contents.
    pub fn save(&self, path: &Path) -> LedgerResult<()> {
        let rendered = self.to_json_pretty()?;
        replace_file(path, &rendered).map_err(|source| LedgerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            "event=ledger_save module=tracking status=ok entries={} path={}",
            self.len(),
            path.display()
        );
        Ok(())
    }
}

impl Serialize for Ledger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter_desc().map(|entry| (entry.key(), entry)))
    }
}

impl<'de> Deserialize<'de> for Ledger {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = HashMap::<String, TrackingEntry>::deserialize(deserializer)?;
        let entries = raw
            .into_values()
            .map(|entry| (entry.sequence_number, entry))
            .collect();
        Ok(Self { entries })
    }
}
