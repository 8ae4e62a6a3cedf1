//! Run configuration.
//!
//! # Responsibility
//! - Describe every tunable of a sync run with working defaults.
//! - Load overrides from an optional TOML file.
//!
//! # Invariants
//! - Every field has a default; a partial file is valid.
//! - `fetch_limit > 0` and `newer_threshold <= older_threshold` after load.

use crate::logging::default_log_level;
use crate::outcome::QuorumThresholds;
use crate::tracking::reconciler::DEFAULT_LEGACY_CUTOFF;
use crate::tracking::template::ScriptLayout;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config `{}`: {source}", path.display())
            }
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid(_) => None,
        }
    }
}

/// Top-level run configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Governance space proposals must belong to; empty accepts all.
    pub space: String,
    /// Upper bound on proposals taken from the source.
    pub fetch_limit: usize,
    pub quorum: QuorumThresholds,
    pub tracking: TrackingConfig,
    /// Run output file, overwritten every run.
    pub report_path: PathBuf,
    pub logging: LoggingConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            space: "aavegotchi.eth".to_string(),
            fetch_limit: 1000,
            quorum: QuorumThresholds::default(),
            tracking: TrackingConfig::default(),
            report_path: PathBuf::from("data/matched_proposals.json"),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Ordinals at or below this use the scripts-imply-deployed regime.
    pub legacy_cutoff: u32,
    pub ledger_path: PathBuf,
    pub sigprop_script_dir: PathBuf,
    pub coreprop_script_dir: PathBuf,
    /// Directory the deploy invoker drops `<proposal_id>.json` markers into.
    pub deployment_marker_dir: PathBuf,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            legacy_cutoff: DEFAULT_LEGACY_CUTOFF,
            ledger_path: PathBuf::from("data/agip_tracking.json"),
            sigprop_script_dir: PathBuf::from("scripts/airdrops/sigprops"),
            coreprop_script_dir: PathBuf::from("scripts/airdrops/coreprops"),
            deployment_marker_dir: PathBuf::from("data/airdrops/deployed"),
        }
    }
}

impl TrackingConfig {
    pub fn script_layout(&self) -> ScriptLayout {
        ScriptLayout::new(&self.sigprop_script_dir, &self.coreprop_script_dir)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: PathBuf::from("logs"),
        }
    }
}

impl SyncConfig {
    /// Loads configuration from `path`, or defaults when `path` is `None`.
    ///
    /// # Errors
    /// - Returns an error when the file cannot be read or parsed.
    /// - Returns an error when loaded values fail validation.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let config = match path {
            None => Self::default(),
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.fetch_limit == 0 {
            return Err(ConfigError::Invalid("fetch_limit must be positive".to_string()));
        }
        if self.quorum.newer_threshold > self.quorum.older_threshold {
            return Err(ConfigError::Invalid(format!(
                "quorum.newer_threshold ({}) must not exceed quorum.older_threshold ({})",
                self.quorum.newer_threshold, self.quorum.older_threshold
            )));
        }
        Ok(())
    }
}
