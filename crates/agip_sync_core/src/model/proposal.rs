//! Proposal domain model.
//!
//! # Responsibility
//! - Mirror the vote-tallying export shape for one proposal.
//! - Tag qualified proposals with the vote track they belong to.
//!
//! # Invariants
//! - Track membership is decided by title alone (see [`Track::of_title`]).
//! - A `ProposalPair` similarity is always within `[0, 1]`.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

/// Case-insensitive title tag marking a signal proposal.
pub const SIGPROP_TAG: &str = "sigprop";

/// Provenance of a proposal inside the vote-tallying service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceRef {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
}

/// One governance proposal as exported by the vote-tallying service.
///
/// Field names follow the export wire format. Everything except `id` is
/// optional on the wire: a missing or `null` field decodes to its default,
/// and a non-numeric tally or quorum decodes to `0`, so one sparse record
/// never rejects a whole export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    /// Opaque identifier assigned by the vote-tallying service.
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: String,
    /// Lifecycle state, e.g. `active`, `pending`, `closed`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: String,
    /// Per-choice vote weight, aligned with `choices`.
    #[serde(default, deserialize_with = "lenient_numbers")]
    pub scores: Vec<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub scores_total: f64,
    /// Declared quorum. `0` means the proposal did not declare one.
    #[serde(default, deserialize_with = "lenient_number")]
    pub quorum: f64,
    /// Unix epoch seconds.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created: i64,
    /// Unix epoch seconds.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub end: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub choices: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub space: SpaceRef,
}

/// A wire number that may arrive as a JSON number, a numeric string, `null`
/// or anything else. Only finite values survive; the rest read as `0`.
struct LenientNumber(f64);

impl<'de> Deserialize<'de> for LenientNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
            Other(IgnoredAny),
        }

        let value = match Raw::deserialize(deserializer)? {
            Raw::Number(value) => value,
            Raw::Text(text) => text.trim().parse().unwrap_or(0.0),
            Raw::Other(_) => 0.0,
        };
        Ok(Self(if value.is_finite() { value } else { 0.0 }))
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    LenientNumber::deserialize(deserializer).map(|number| number.0)
}

fn lenient_numbers<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
    let numbers = Option::<Vec<LenientNumber>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(numbers.into_iter().map(|number| number.0).collect())
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    lenient_number(deserializer).map(|seconds| seconds as i64)
}

impl Proposal {
    /// Creates a closed proposal with the given tallies and empty metadata.
    ///
    /// Used by import paths and tests that only care about title/body/scores.
    pub fn new(id: impl Into<String>, title: impl Into<String>, scores: Vec<f64>) -> Self {
        let scores_total = scores.iter().sum();
        Self {
            id: id.into(),
            title: title.into(),
            body: String::new(),
            state: "closed".to_string(),
            scores,
            scores_total,
            quorum: 0.0,
            created: 0,
            end: 0,
            author: String::new(),
            choices: Vec::new(),
            space: SpaceRef::default(),
        }
    }

    /// Sets the proposal body text.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns whether voting on this proposal has finished.
    pub fn is_closed(&self) -> bool {
        self.state.eq_ignore_ascii_case("closed")
    }
}

/// The two parallel vote tracks being reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    /// Signal proposal, the first vote on an idea.
    Sigprop,
    /// Core proposal, the binding vote that follows a signal proposal.
    Coreprop,
}

impl Track {
    /// Classifies a title into a track.
    ///
    /// A title containing [`SIGPROP_TAG`] (any case) is a sigprop; every other
    /// title is a coreprop.
    pub fn of_title(title: &str) -> Self {
        if title.to_lowercase().contains(SIGPROP_TAG) {
            Self::Sigprop
        } else {
            Self::Coreprop
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sigprop => "sigprop",
            Self::Coreprop => "coreprop",
        }
    }
}

/// A proposal known to have reached quorum and passed.
#[derive(Debug, Clone, PartialEq)]
pub struct QualifiedProposal {
    pub proposal: Proposal,
    pub track: Track,
}

impl QualifiedProposal {
    /// Wraps a proposal and derives its track from the title.
    pub fn new(proposal: Proposal) -> Self {
        let track = Track::of_title(&proposal.title);
        Self { proposal, track }
    }

    pub fn id(&self) -> &str {
        &self.proposal.id
    }

    pub fn title(&self) -> &str {
        &self.proposal.title
    }

    pub fn body(&self) -> &str {
        &self.proposal.body
    }
}

/// A sigprop matched one-to-one with a coreprop by the greedy matcher.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalPair {
    pub sigprop: QualifiedProposal,
    pub coreprop: QualifiedProposal,
    /// Recorded match score in `[0, 1]`.
    pub similarity: f64,
}
