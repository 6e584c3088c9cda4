//! File-backed adapters.

mod ledger;

pub use ledger::FileLedger;
