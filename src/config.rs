//! Runtime configuration, read from the environment (and `.env` via dotenvy
//! in the binary). Unset or unparsable values fall back to defaults.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::blockchain::{DEFAULT_DIFFICULTY, GENESIS_AMOUNT};
use crate::crypto::DIGEST_WIDTH;
use crate::error::{LedgerError, Result};

/// Number of candidates raced per round in concurrent mining.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Transactions per block.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Initial nonce-trial budget of a sealing attempt.
pub const DEFAULT_BUDGET_TRIALS: u64 = 100_000;

/// Initial wall-clock budget of a sealing attempt.
pub const DEFAULT_BUDGET_MILLIS: u64 = 250;

/// Budget multiplier applied each time an attempt exhausts its budget.
pub const DEFAULT_BUDGET_GROWTH: f64 = 1.5;

/// Growth cycles after which a search is reported as stalled.
pub const DEFAULT_STALL_AFTER: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct MinerConfig {
    pub budget_trials: u64,
    pub budget_time: Duration,
    pub growth: f64,
    pub stall_after: u32,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            budget_trials: DEFAULT_BUDGET_TRIALS,
            budget_time: Duration::from_millis(DEFAULT_BUDGET_MILLIS),
            growth: DEFAULT_BUDGET_GROWTH,
            stall_after: DEFAULT_STALL_AFTER,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    pub difficulty: u32,
    pub genesis_amount: u64,
    pub miner: MinerConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            genesis_amount: GENESIS_AMOUNT,
            miner: MinerConfig::default(),
        }
    }
}

impl LedgerConfig {
    pub fn with_difficulty(difficulty: u32) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.difficulty as usize > DIGEST_WIDTH {
            return Err(LedgerError::InvalidConfig(format!(
                "difficulty {} exceeds digest width {}",
                self.difficulty, DIGEST_WIDTH
            )));
        }
        if self.miner.growth.is_nan() || self.miner.growth <= 1.0 {
            return Err(LedgerError::InvalidConfig(format!(
                "budget growth must be > 1.0, got {}",
                self.miner.growth
            )));
        }
        if self.miner.budget_trials == 0 {
            return Err(LedgerError::InvalidConfig("budget trials must be > 0".into()));
        }
        if self.miner.budget_time.is_zero() {
            return Err(LedgerError::InvalidConfig("budget time must be > 0".into()));
        }
        Ok(())
    }
}

/// Demo workload settings.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadConfig {
    pub users: usize,
    pub transactions: usize,
    pub batch_size: usize,
    pub concurrency: usize,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            users: 1000,
            transactions: 1000,
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub ledger: LedgerConfig,
    pub workload: WorkloadConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Config::default();
        let miner = MinerConfig {
            budget_trials: parse_or(lookup("BUDGET_TRIALS"), d.ledger.miner.budget_trials),
            budget_time: lookup("BUDGET_MILLIS")
                .and_then(|v| v.trim().parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(d.ledger.miner.budget_time),
            growth: parse_or(lookup("BUDGET_GROWTH"), d.ledger.miner.growth),
            stall_after: parse_or(lookup("STALL_AFTER"), d.ledger.miner.stall_after),
        };

        Self {
            ledger: LedgerConfig {
                difficulty: parse_or(lookup("DIFFICULTY"), d.ledger.difficulty),
                genesis_amount: parse_or(lookup("GENESIS_AMOUNT"), d.ledger.genesis_amount),
                miner,
            },
            workload: WorkloadConfig {
                users: parse_or(lookup("USERS"), d.workload.users),
                transactions: parse_or(lookup("TRANSACTIONS"), d.workload.transactions),
                batch_size: parse_or(lookup("BATCH_SIZE"), d.workload.batch_size),
                concurrency: parse_or(lookup("CONCURRENCY"), d.workload.concurrency),
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.ledger.validate()?;
        if self.workload.batch_size == 0 {
            return Err(LedgerError::InvalidConfig("batch size must be > 0".into()));
        }
        if self.workload.concurrency == 0 {
            return Err(LedgerError::InvalidConfig("concurrency must be > 0".into()));
        }
        Ok(())
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
