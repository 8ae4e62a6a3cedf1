//! Greedy one-to-one matching of sigprops to coreprops.
//!
//! # Responsibility
//! - Pick, for each sigprop in input order, the best still-unclaimed coreprop.
//!
//! # Invariants
//! - A coreprop appears in at most one pair per run.
//! - Earlier sigprops claim first; no global assignment is attempted, so the
//!   result is reproducible for a fixed sigprop order.
//! - A sigprop with no acceptable candidate yields no pair and no error.

use crate::model::proposal::{ProposalPair, QualifiedProposal};
use crate::similarity::similarity;
use log::debug;

/// Title similarity above which the body is not consulted.
pub const TITLE_MATCH_THRESHOLD: f64 = 0.6;
/// Averaged title+body similarity required otherwise.
pub const COMBINED_MATCH_THRESHOLD: f64 = 0.5;

struct Candidate {
    index: usize,
    /// Score used to rank candidates for one sigprop.
    accepted: f64,
    /// Score stored on the emitted pair.
    recorded: f64,
}

/// Greedy sigprop/coreprop matcher.
#[derive(Debug, Clone, Copy)]
pub struct GreedyMatcher {
    title_threshold: f64,
    combined_threshold: f64,
}

impl Default for GreedyMatcher {
    fn default() -> Self {
        Self {
            title_threshold: TITLE_MATCH_THRESHOLD,
            combined_threshold: COMBINED_MATCH_THRESHOLD,
        }
    }
}

impl GreedyMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pairs sigprops with coreprops.
    ///
    /// Pairs are returned in sigprop input order.
    pub fn match_pairs(
        &self,
        sigprops: &[QualifiedProposal],
        coreprops: &[QualifiedProposal],
    ) -> Vec<ProposalPair> {
        let mut claimed = vec![false; coreprops.len()];
        let mut pairs = Vec::new();

        for sigprop in sigprops {
            let Some(best) = self.best_candidate(sigprop, coreprops, &claimed) else {
                debug!(
                    "event=match module=matching status=unmatched sigprop_id={}",
                    sigprop.id()
                );
                continue;
            };

            claimed[best.index] = true;
            let coreprop = &coreprops[best.index];
            debug!(
                "event=match module=matching status=ok sigprop_id={} coreprop_id={} similarity={:.3}",
                sigprop.id(),
                coreprop.id(),
                best.recorded
            );
            pairs.push(ProposalPair {
                sigprop: sigprop.clone(),
                coreprop: coreprop.clone(),
                similarity: best.recorded,
            });
        }

        pairs
    }

    fn best_candidate(
        &self,
        sigprop: &QualifiedProposal,
        coreprops: &[QualifiedProposal],
        claimed: &[bool],
    ) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;

        for (index, coreprop) in coreprops.iter().enumerate() {
            if claimed[index] {
                continue;
            }
            let Some(candidate) = self.score(index, sigprop, coreprop) else {
                continue;
            };
            let beats_best = best
                .as_ref()
                .map_or(true, |current| candidate.accepted > current.accepted);
            if beats_best {
                best = Some(candidate);
            }
        }

        best
    }

    fn score(
        &self,
        index: usize,
        sigprop: &QualifiedProposal,
        coreprop: &QualifiedProposal,
    ) -> Option<Candidate> {
        let title = similarity(sigprop.title(), coreprop.title());
        if title > self.title_threshold {
            return Some(Candidate {
                index,
                accepted: title,
                recorded: title,
            });
        }

        let body = similarity(sigprop.body(), coreprop.body());
        let combined = (title + body) / 2.0;
        if combined > self.combined_threshold {
            return Some(Candidate {
                index,
                accepted: combined,
                recorded: title.max(combined),
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::GreedyMatcher;
    use crate::model::proposal::{Proposal, QualifiedProposal};

    fn qualified(id: &str, title: &str, body: &str) -> QualifiedProposal {
        QualifiedProposal::new(Proposal::new(id, title, vec![1.0, 0.0]).with_body(body))
    }

    #[test]
    fn selects_only_title_match_regardless_of_coreprop_order() {
        let sig = vec![qualified(
            "s1",
            "[Sigprop] Add Haunt 3 wearables",
            "Release three new wearable sets",
        )];
        let good = qualified("c-good", "[AGIP-50] Add Haunt 3 wearables", "Wearables");
        let bad = qualified(
            "c-bad",
            "[AGIP-51] Treasury diversification",
            "Move 20% of treasury into stablecoins",
        );

        let matcher = GreedyMatcher::new();
        for coreprops in [vec![bad.clone(), good.clone()], vec![good.clone(), bad.clone()]] {
            let pairs = matcher.match_pairs(&sig, &coreprops);
            assert_eq!(pairs.len(), 1);
            assert_eq!(pairs[0].coreprop.id(), "c-good");
        }
    }

    #[test]
    fn earlier_sigprop_claims_coreprop_first() {
        let sigprops = vec![
            qualified("s1", "[Sigprop] Lower staking fee", ""),
            qualified("s2", "[Sigprop] Lower staking fee", ""),
        ];
        let coreprops = vec![qualified("c1", "Lower staking fee", "")];

        let pairs = GreedyMatcher::new().match_pairs(&sigprops, &coreprops);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].sigprop.id(), "s1");
        assert_eq!(pairs[0].similarity, 1.0);
    }

    #[test]
    fn body_similarity_rescues_weak_titles() {
        let body = "Allocate 500k GHST from the DAO treasury to fund the rarity farming season.";
        let sigprops = vec![qualified("s1", "[Sigprop] RF funding", body)];
        let coreprops = vec![qualified("c1", "[AGIP-9] Rarity Farming budget", body)];

        let pairs = GreedyMatcher::new().match_pairs(&sigprops, &coreprops);
        assert_eq!(pairs.len(), 1);
        assert!(pairs[0].similarity > 0.5);
        assert!(pairs[0].similarity <= 1.0);
    }

    #[test]
    fn unrelated_sigprop_yields_no_pair() {
        let sigprops = vec![qualified("s1", "[Sigprop] qqqq", "zzzz")];
        let coreprops = vec![qualified("c1", "[AGIP-1] Mint more land", "wwwwwwww")];
        assert!(GreedyMatcher::new()
            .match_pairs(&sigprops, &coreprops)
            .is_empty());
    }

    #[test]
    fn no_coreprop_appears_twice() {
        let sigprops: Vec<_> = (0..4)
            .map(|i| qualified(&format!("s{i}"), "[Sigprop] Same idea", ""))
            .collect();
        let coreprops: Vec<_> = (0..2)
            .map(|i| qualified(&format!("c{i}"), "Same idea", ""))
            .collect();

        let pairs = GreedyMatcher::new().match_pairs(&sigprops, &coreprops);
        assert_eq!(pairs.len(), 2);
        assert_ne!(pairs[0].coreprop.id(), pairs[1].coreprop.id());
    }
}
