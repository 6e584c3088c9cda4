//! Port contracts for issue reconciliation.
//!
//! Ports define infrastructure-agnostic interfaces used by the engine.

pub mod ledger;
pub mod provider;
pub mod review;

pub use ledger::{LedgerError, LedgerResult, SyncLedger};
pub use provider::{IssueProvider, ProviderError, ProviderResult};
pub use review::{AcceptAll, ChangeReviewer, ReviewDecision};
