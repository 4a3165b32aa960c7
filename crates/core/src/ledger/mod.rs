//! Dedup ledger.
//!
//! The ledger is the persisted set of release ids already handled. It is loaded
//! once per run, and every completed candidate is added and written back
//! immediately so an interrupted run never loses finished work.

mod store;
mod types;

pub use store::Ledger;
pub use types::{LedgerDocument, LedgerError, LEDGER_VERSION};
