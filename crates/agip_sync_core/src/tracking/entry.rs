//! Tracking ledger entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Ledger key prefix, e.g. `agip_142`.
pub const LEDGER_KEY_PREFIX: &str = "agip";

/// Returns the ledger key for an ordinal.
pub fn ledger_key(sequence_number: u32) -> String {
    format!("{LEDGER_KEY_PREFIX}_{sequence_number}")
}

/// Deployment lifecycle of one paired proposal.
///
/// Advances `not_created -> pending -> deployed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// Deploy scripts do not exist yet.
    NotCreated,
    /// Scripts exist; deployment not yet observed.
    Pending,
    /// Deployment observed (or presumed for legacy ordinals).
    Deployed,
}

impl DeploymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotCreated => "not_created",
            Self::Pending => "pending",
            Self::Deployed => "deployed",
        }
    }
}

impl Display for DeploymentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for DeploymentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "not_created" => Ok(Self::NotCreated),
            "pending" => Ok(Self::Pending),
            "deployed" => Ok(Self::Deployed),
            other => Err(format!(
                "unknown status `{other}`; expected not_created|pending|deployed"
            )),
        }
    }
}

/// Persisted deployment record for one AGIP ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEntry {
    pub sequence_number: u32,
    pub title: String,
    pub status: DeploymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sigprop_script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coreprop_script: Option<String>,
    pub sigprop_id: String,
    pub coreprop_id: String,
    pub created_at: DateTime<Utc>,
    /// Set only while `status == Deployed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_at: Option<DateTime<Utc>>,
    /// External transaction reference recorded by an operator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_reference: Option<String>,
}

impl TrackingEntry {
    pub fn key(&self) -> String {
        ledger_key(self.sequence_number)
    }

    /// Marks the entry deployed and stamps `now` unless already deployed.
    pub fn mark_deployed(&mut self, now: DateTime<Utc>) {
        if self.status != DeploymentStatus::Deployed {
            self.status = DeploymentStatus::Deployed;
            self.deployed_at = Some(now);
        }
    }

    /// Attaches both script references.
    pub fn attach_scripts(&mut self, sigprop_script: String, coreprop_script: String) {
        self.sigprop_script = Some(sigprop_script);
        self.coreprop_script = Some(coreprop_script);
    }
}

#[cfg(test)]
mod tests {
    use super::{ledger_key, DeploymentStatus};

    #[test]
    fn ledger_key_uses_agip_prefix() {
        assert_eq!(ledger_key(142), "agip_142");
    }

    #[test]
    fn status_parses_wire_names() {
        assert_eq!("Pending".parse::<DeploymentStatus>(), Ok(DeploymentStatus::Pending));
        assert_eq!(
            " not_created ".parse::<DeploymentStatus>(),
            Ok(DeploymentStatus::NotCreated)
        );
        assert!("done".parse::<DeploymentStatus>().is_err());
    }

    #[test]
    fn status_order_follows_lifecycle() {
        assert!(DeploymentStatus::NotCreated < DeploymentStatus::Pending);
        assert!(DeploymentStatus::Pending < DeploymentStatus::Deployed);
    }
}
