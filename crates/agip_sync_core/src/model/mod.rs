//! Governance proposal data model.
//!
//! # Responsibility
//! - Define the proposal record read from the vote-tallying export.
//! - Define the derived shapes (qualified proposal, pair) passed between
//!   classifier, matcher, validator and reconciler.
//!
//! # Invariants
//! - `Proposal` is produced externally and never mutated by core.
//! - Derived shapes are not persisted on their own; only the tracking ledger is.

pub mod proposal;
