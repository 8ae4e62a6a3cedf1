//! Deployment-status tracking for paired proposals.
//!
//! # Responsibility
//! - Persist one tracking entry per AGIP ordinal.
//! - Reconcile entries against new pairs and observed deployment evidence.
//! - Render the per-proposal deploy scripts consumed by the deploy invoker.
//!
//! # Invariants
//! - The ledger is loaded once, mutated in memory and written once per run.
//! - Entries are never deleted and a `deployed` entry never regresses.
//! - Only [`reconciler::TrackingReconciler`] and the manual deployment record
//!   mutate entries.

pub mod entry;
pub mod evidence;
pub mod ledger;
pub mod reconciler;
pub mod template;
