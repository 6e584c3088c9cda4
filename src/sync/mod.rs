//! Two-way issue reconciliation between a source and a target tracker.
//!
//! Every issue fetched from either side is folded into a canonical model,
//! matched across systems through link metadata (with an exact content
//! fallback), diffed field by field, and then either propagated through the
//! receiving provider or surfaced as a conflict. The module follows hexagonal
//! architecture:
//!
//! - Canonical model, matching and diffing in [`domain`]
//! - Provider, ledger and review contracts in [`ports`]
//! - In-memory and file-backed implementations in [`adapters`]
//! - The reconciliation engine and retry policy in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
