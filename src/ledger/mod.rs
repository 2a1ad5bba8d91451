//! The ledger: chain, UTXO set and pending pool behind one mutex, plus the
//! mining orchestration that turns pending transactions into blocks.

mod state;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::blockchain::{Block, Blockchain, GENESIS_OWNER, GENESIS_PREV_HASH};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, RejectReason, Result};
use crate::miner::Miner;
use crate::report::{BlockSummary, LedgerStats};
use crate::transaction::{Transaction, Utxo, UtxoSet};
use state::LedgerState;

/// A block that made it onto the chain in one mining round.
#[derive(Debug, Clone)]
pub struct MinedBlock {
    pub index: usize,
    pub block: Block,
    /// Sibling candidates that lost the race.
    pub superseded: usize,
    /// Pending transactions dropped because this block spent their inputs.
    pub evicted: usize,
}

/// Totals for one `run_mining_cycle` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub blocks: usize,
    pub transactions: usize,
    pub superseded: usize,
    pub evicted: usize,
    /// Sealed candidates refused at commit time.
    pub discarded: usize,
    pub interrupted: bool,
}

pub struct Ledger {
    state: Mutex<LedgerState>,
    miner: Miner,
    difficulty: u32,
    interrupt: Arc<AtomicBool>,
}

impl Ledger {
    /// Create a ledger whose genesis block holds one seed UTXO.
    pub fn new(difficulty: u32) -> Result<Self> {
        Self::with_config(LedgerConfig::with_difficulty(difficulty))
    }

    pub fn with_config(config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        let miner = Miner::new(config.miner.clone());

        let genesis_tx =
            Transaction::transfer(vec![], vec![(config.genesis_amount, GENESIS_OWNER)]);
        let candidate = Block::candidate(
            GENESIS_PREV_HASH.to_string(),
            vec![genesis_tx.clone()],
            config.difficulty,
        );
        let genesis = miner
            .seal(candidate, || false)
            .map(|report| report.block)
            .ok_or_else(|| LedgerError::InvalidConfig("genesis search was cancelled".into()))?;

        let mut utxo_set = UtxoSet::new();
        for out in genesis_tx.outputs() {
            utxo_set.insert(out.clone());
        }
        let chain = Blockchain::new(genesis, config.difficulty)?;
        info!(
            "ledger created: difficulty={} genesis={} seed={}",
            config.difficulty,
            chain.last_block().hash(),
            config.genesis_amount
        );

        Ok(Self {
            state: Mutex::new(LedgerState::new(chain, utxo_set)),
            miner,
            difficulty: config.difficulty,
            interrupt: Arc::new(AtomicBool::new(false)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Submit a transaction; `true` when it was admitted to the pending pool.
    pub fn submit(&self, tx: &Transaction) -> bool {
        self.try_submit(tx).is_ok()
    }

    /// Like `submit`, but says why a transaction was turned away.
    pub fn try_submit(&self, tx: &Transaction) -> std::result::Result<String, RejectReason> {
        let mut state = self.lock();
        match state.submit(tx) {
            Ok(()) => {
                debug!(
                    "tx {} admitted ({} in, {} out; pool size {})",
                    tx.id(),
                    tx.inputs().len(),
                    tx.outputs().len(),
                    state.pending.len()
                );
                Ok(tx.id().to_string())
            }
            Err(reason) => {
                warn!("tx {} rejected: {}", tx.id(), reason);
                Err(reason)
            }
        }
    }

    /// Mine blocks until fewer than `batch_size` transactions are pending.
    /// `concurrency` > 1 races that many randomly sampled candidates per block.
    pub fn run_mining_cycle(&self, batch_size: usize, concurrency: usize) -> Result<CycleReport> {
        check_mining_args(batch_size, concurrency)?;
        let mut report = CycleReport::default();

        loop {
            match self.mine_next(batch_size, concurrency) {
                Ok(Some(mined)) => {
                    report.blocks += 1;
                    report.transactions += mined.block.transactions().len();
                    report.superseded += mined.superseded;
                    report.evicted += mined.evicted;
                }
                Ok(None) => break,
                Err(e @ (LedgerError::StaleCandidate { .. } | LedgerError::ChainIntegrity(_))) => {
                    warn!("candidate discarded: {}", e);
                    report.discarded += 1;
                }
                Err(e) => return Err(e),
            }
        }

        report.interrupted = self.is_interrupted();
        info!(
            "mining cycle done: {} blocks, {} txs, {} superseded, {} evicted, {} pending",
            report.blocks,
            report.transactions,
            report.superseded,
            report.evicted,
            self.pending_len()
        );
        Ok(report)
    }

    /// One mining round. Returns `Ok(None)` when fewer than `batch_size`
    /// transactions are pending or the ledger was interrupted.
    pub fn mine_next(&self, batch_size: usize, concurrency: usize) -> Result<Option<MinedBlock>> {
        check_mining_args(batch_size, concurrency)?;
        if self.is_interrupted() {
            return Ok(None);
        }

        let candidates: Vec<Block> = {
            let state = self.lock();
            if state.pending.len() < batch_size {
                return Ok(None);
            }
            let tip = state.chain.last_block().hash().to_string();

            let batches = if concurrency == 1 {
                vec![state.select_batch(state.pending.iter(), batch_size)]
            } else {
                let mut rng = rand::thread_rng();
                (0..concurrency)
                    .map(|_| {
                        let sample = state
                            .pending
                            .choose_multiple(&mut rng, state.pending.len());
                        state.select_batch(sample, batch_size)
                    })
                    .collect()
            };

            batches
                .into_iter()
                .filter(|batch| !batch.is_empty())
                .map(|batch| Block::candidate(tip.clone(), batch, self.difficulty))
                .collect()
        };

        debug!(
            "batch selected: {} candidate(s) of up to {} txs",
            candidates.len(),
            batch_size
        );
        self.seal_and_commit(candidates)
    }

    /// Race one candidate per batch and commit the winner. Every transaction
    /// must currently be pending.
    pub fn race_candidates(&self, batches: Vec<Vec<Transaction>>) -> Result<Option<MinedBlock>> {
        let candidates = {
            let state = self.lock();
            for tx in batches.iter().flatten() {
                if !state.is_pending(tx.id()) {
                    return Err(LedgerError::Rejected {
                        txid: tx.id().to_string(),
                        reason: RejectReason::NotPending,
                    });
                }
            }
            let tip = state.chain.last_block().hash().to_string();
            batches
                .into_iter()
                .map(|batch| Block::candidate(tip.clone(), batch, self.difficulty))
                .collect()
        };
        self.seal_and_commit(candidates)
    }

    fn seal_and_commit(&self, candidates: Vec<Block>) -> Result<Option<MinedBlock>> {
        let sealed = if candidates.len() == 1 {
            candidates.into_iter().next().and_then(|block| {
                self.miner
                    .seal(block, || self.interrupt.load(Ordering::Relaxed))
                    .map(|report| (report.block, 0))
            })
        } else {
            self.miner
                .race(candidates, &self.interrupt)
                .map(|outcome| (outcome.report.block, outcome.superseded))
        };

        let Some((block, superseded)) = sealed else {
            debug!("no candidate sealed (interrupted or nothing to mine)");
            return Ok(None);
        };

        let (index, evicted) = {
            let mut state = self.lock();
            let evicted = state.commit(block.clone())?;
            (state.chain.len() - 1, evicted)
        };
        info!(
            "block #{} committed (hash={}, nonce={}, {} txs, {} superseded)",
            index,
            block.hash(),
            block.nonce(),
            block.transactions().len(),
            superseded
        );

        Ok(Some(MinedBlock {
            index,
            block,
            superseded,
            evicted,
        }))
    }

    /// Shared flag that stops in-flight searches when set.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    pub fn interrupt(&self) {
        self.interrupt.store(true, Ordering::Relaxed);
    }

    pub fn resume(&self) {
        self.interrupt.store(false, Ordering::Relaxed);
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupt.load(Ordering::Relaxed)
    }

    pub fn get_block(&self, index: usize) -> Result<Block> {
        let state = self.lock();
        state
            .chain
            .get(index)
            .cloned()
            .ok_or(LedgerError::BlockOutOfRange {
                index,
                len: state.chain.len(),
            })
    }

    pub fn block_summary(&self, index: usize) -> Result<BlockSummary> {
        self.get_block(index)
            .map(|block| BlockSummary::from_block(index, &block))
    }

    /// Read-only copy of the UTXO set.
    pub fn utxo_snapshot(&self) -> HashMap<String, Utxo> {
        self.lock().utxo_set.snapshot()
    }

    pub fn pending_snapshot(&self) -> Vec<Transaction> {
        self.lock().pending.clone()
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn chain_len(&self) -> usize {
        self.lock().chain.len()
    }

    pub fn tip_hash(&self) -> String {
        self.lock().chain.last_block().hash().to_string()
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn balance_of(&self, owner: &str) -> u128 {
        self.lock().utxo_set.balance_of(owner)
    }

    pub fn is_valid_chain(&self) -> bool {
        self.lock().chain.is_valid_chain()
    }

    pub fn stats(&self) -> LedgerStats {
        let state = self.lock();
        LedgerStats::collect(&state.chain, &state.utxo_set, state.pending.len())
    }
}

fn check_mining_args(batch_size: usize, concurrency: usize) -> Result<()> {
    if batch_size == 0 {
        return Err(LedgerError::InvalidConfig("batch size must be > 0".into()));
    }
    if concurrency == 0 {
        return Err(LedgerError::InvalidConfig("concurrency must be > 0".into()));
    }
    Ok(())
}
