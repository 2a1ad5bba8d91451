//! Proof-of-work search.
//!
//! `Miner::seal` runs the nonce search for one candidate under an adaptive
//! budget; `Miner::race` seals several candidates on scoped worker threads
//! and keeps the first one that finishes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use uuid::Uuid;

use crate::blockchain::Block;
use crate::config::MinerConfig;

/// Trial and wall-clock allowance of one search window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchBudget {
    pub trials: u64,
    pub time: Duration,
}

impl SearchBudget {
    pub fn from_config(config: &MinerConfig) -> Self {
        Self {
            trials: config.budget_trials,
            time: config.budget_time,
        }
    }

    /// Multiply both allowances by `factor` (rounding trials up).
    pub fn grow(&mut self, factor: f64) {
        self.trials = (self.trials as f64 * factor).ceil() as u64;
        self.time = Duration::try_from_secs_f64(self.time.as_secs_f64() * factor)
            .unwrap_or(Duration::MAX);
    }
}

/// A sealed block plus how much work it took.
#[derive(Debug, Clone)]
pub struct SealReport {
    pub block: Block,
    pub attempts: u64,
    pub growth_cycles: u32,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct RaceOutcome {
    /// Index of the winning candidate in the input list.
    pub winner: usize,
    pub report: SealReport,
    /// Candidates whose search was abandoned.
    pub superseded: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Miner {
    config: MinerConfig,
}

impl Miner {
    pub fn new(config: MinerConfig) -> Self {
        Self { config }
    }

    /// Search nonces until `block` meets its difficulty target or `cancelled`
    /// returns true. `cancelled` is checked before every trial.
    ///
    /// Whenever the current budget runs out the search keeps going with a
    /// budget grown by `config.growth`; past `config.stall_after` growth
    /// cycles each further growth is logged as a stalled search.
    pub fn seal(&self, mut block: Block, cancelled: impl Fn() -> bool) -> Option<SealReport> {
        let started = Instant::now();
        let mut budget = SearchBudget::from_config(&self.config);
        let mut window_start = started;
        let mut window_trials: u64 = 0;
        let mut attempts: u64 = 0;
        let mut growth_cycles: u32 = 0;

        loop {
            if cancelled() {
                debug!(
                    "search cancelled after {} attempts (nonce={})",
                    attempts,
                    block.nonce()
                );
                return None;
            }

            attempts += 1;
            if block.step() {
                return Some(SealReport {
                    block,
                    attempts,
                    growth_cycles,
                    elapsed: started.elapsed(),
                });
            }

            window_trials += 1;
            if window_trials >= budget.trials || window_start.elapsed() >= budget.time {
                budget.grow(self.config.growth);
                growth_cycles = growth_cycles.saturating_add(1);
                window_trials = 0;
                window_start = Instant::now();

                if growth_cycles >= self.config.stall_after {
                    warn!(
                        "stalled search: {} attempts over {:?}, {} budget growths (next budget {} trials / {:?})",
                        attempts,
                        started.elapsed(),
                        growth_cycles,
                        budget.trials,
                        budget.time
                    );
                } else {
                    debug!(
                        "budget exhausted after {} attempts; growing to {} trials / {:?}",
                        attempts, budget.trials, budget.time
                    );
                }
            }
        }
    }

    /// Seal every candidate in parallel and return the first to finish.
    /// The others are cancelled and their work discarded. Returns `None`
    /// when `candidates` is empty or `interrupt` stops every worker.
    pub fn race(&self, candidates: Vec<Block>, interrupt: &AtomicBool) -> Option<RaceOutcome> {
        let racers = candidates.len();
        if racers == 0 {
            return None;
        }

        let stop = AtomicBool::new(false);
        let (tx, rx) = mpsc::channel();

        let winner = thread::scope(|s| {
            for (index, block) in candidates.into_iter().enumerate() {
                let tx = tx.clone();
                let stop = &stop;
                s.spawn(move || {
                    let attempt = Uuid::new_v4();
                    debug!(
                        "RACE attempt {} (candidate #{}, {} txs) started",
                        attempt,
                        index,
                        block.transactions().len()
                    );
                    let cancelled =
                        || stop.load(Ordering::Relaxed) || interrupt.load(Ordering::Relaxed);
                    match self.seal(block, cancelled) {
                        Some(report) => {
                            debug!(
                                "RACE attempt {} sealed after {} attempts",
                                attempt, report.attempts
                            );
                            // the receiver only keeps the first result
                            let _ = tx.send((index, report));
                        }
                        None => debug!("RACE attempt {} abandoned", attempt),
                    }
                });
            }
            drop(tx);

            let first = rx.recv().ok();
            stop.store(true, Ordering::Relaxed);
            first
        });

        let (index, report) = winner?;
        info!(
            "RACE won by candidate #{} of {} (hash={}, nonce={}, {} attempts)",
            index,
            racers,
            report.block.hash(),
            report.block.nonce(),
            report.attempts
        );
        Some(RaceOutcome {
            winner: index,
            report,
            superseded: racers - 1,
        })
    }
}
