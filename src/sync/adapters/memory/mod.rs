//! In-memory adapters for tests, dry runs and embedding.

mod ledger;
mod provider;

pub use ledger::InMemoryLedger;
pub use provider::{InMemoryProvider, ProviderOperation};
