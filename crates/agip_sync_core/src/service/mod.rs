//! Run-level orchestration.
//!
//! # Responsibility
//! - Chain fetch, classification, matching, validation and reconciliation
//!   into one synchronous run.
//! - Keep CLI wiring free of pipeline details.

pub mod sync_service;
