//! Unit tests for the sync module.
//!
//! Tests are organised by domain concept. Engine tests drive whole runs over
//! the in-memory adapters with a frozen clock.
