//! Ledger-backed client for the Mugs marketplace program.
//!
//! Provides:
//! - the ledger query seam and an in-memory ledger for dry runs
//! - ledger-aware instruction assembly and lazy record initialization
//! - transaction submission with timeouts and a single rebuild on init races
//! - program account scans and historical event retrieval
//! - the `mugs-cli` command helpers

pub mod assembler;
pub mod cli;
pub mod config;
pub mod hex;
pub mod history;
pub mod ledger;
pub mod metadata;
pub mod parse;
pub mod scan;
pub mod tx;
