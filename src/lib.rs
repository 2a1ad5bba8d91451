//! In-memory proof-of-work ledger with a UTXO model.
//!
//! A [`Ledger`] owns the chain, the UTXO set and the pending pool. Callers
//! submit [`Transaction`]s, then run mining cycles that seal pending
//! transactions into [`Block`]s, optionally racing several candidates on
//! worker threads.

pub mod blockchain;
pub mod config;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod miner;
pub mod report;
pub mod transaction;
pub mod workload;

pub use blockchain::{Block, Blockchain};
pub use config::{Config, LedgerConfig, MinerConfig, WorkloadConfig};
pub use error::{IntegrityViolation, LedgerError, RejectReason, Result};
pub use ledger::{CycleReport, Ledger, MinedBlock};
pub use miner::Miner;
pub use transaction::{Transaction, Utxo, UtxoSet};
