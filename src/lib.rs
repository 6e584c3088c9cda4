//! Tracksync: two-way issue reconciliation between trackers.
//!
//! This crate keeps a canonical "source" issue tracker and a downstream
//! "target" tracker consistent. Issues from both sides are normalized,
//! matched, diffed and either propagated or reported as conflicts, with a
//! persistent ledger remembering which issues have been linked.
//!
//! # Architecture
//!
//! Tracksync follows hexagonal architecture principles:
//!
//! - **Domain**: Pure reconciliation logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for trackers, the ledger and review
//! - **Adapters**: Concrete implementations of ports (in-memory, file-backed)
//!
//! # Modules
//!
//! - [`sync`]: Canonical issue model, matching, diffing and the engine

pub mod sync;
