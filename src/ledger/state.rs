use std::collections::HashSet;

use log::{debug, warn};

use crate::blockchain::{Block, Blockchain};
use crate::error::{LedgerError, RejectReason, Result};
use crate::transaction::{Transaction, UtxoSet};

/// Ids consumed and produced by the transactions picked so far in one batch.
#[derive(Debug, Default)]
struct BatchView {
    spent: HashSet<String>,
    created: HashSet<String>,
}

impl BatchView {
    /// Validate `tx` against `utxo` plus what this batch already touched,
    /// and record it on success.
    fn admit(&mut self, utxo: &UtxoSet, tx: &Transaction) -> std::result::Result<(), RejectReason> {
        utxo.validate(tx, &self.spent)?;
        if let Some(out) = tx.outputs().iter().find(|o| self.created.contains(&o.id)) {
            return Err(RejectReason::OutputCollision(out.id.clone()));
        }
        self.spent.extend(tx.inputs().iter().map(|u| u.id.clone()));
        self.created.extend(tx.outputs().iter().map(|u| u.id.clone()));
        Ok(())
    }
}

/// Everything the ledger mutates. Only ever touched under the ledger mutex.
#[derive(Debug)]
pub struct LedgerState {
    pub(super) chain: Blockchain,
    pub(super) utxo_set: UtxoSet,
    pub(super) pending: Vec<Transaction>,
}

impl LedgerState {
    pub fn new(chain: Blockchain, utxo_set: UtxoSet) -> Self {
        Self {
            chain,
            utxo_set,
            pending: Vec::new(),
        }
    }

    /// Admit `tx` into the pending pool if it is valid against the UTXO set.
    pub fn submit(&mut self, tx: &Transaction) -> std::result::Result<(), RejectReason> {
        if self.pending.iter().any(|p| p.id() == tx.id()) {
            return Err(RejectReason::AlreadyPending(tx.id().to_string()));
        }
        self.utxo_set.validate(tx, &HashSet::new())?;
        self.pending.push(tx.clone());
        Ok(())
    }

    /// Pick up to `batch_size` transactions from `order`, skipping any that
    /// conflict with an earlier pick.
    pub fn select_batch<'a>(
        &self,
        order: impl IntoIterator<Item = &'a Transaction>,
        batch_size: usize,
    ) -> Vec<Transaction> {
        let mut view = BatchView::default();
        let mut picked = Vec::with_capacity(batch_size);
        for tx in order {
            if picked.len() >= batch_size {
                break;
            }
            match view.admit(&self.utxo_set, tx) {
                Ok(()) => picked.push(tx.clone()),
                Err(reason) => debug!("batch skips {}: {}", tx.id(), reason),
            }
        }
        picked
    }

    pub fn is_pending(&self, txid: &str) -> bool {
        self.pending.iter().any(|p| p.id() == txid)
    }

    /// Append a sealed block and apply its effects as one unit.
    ///
    /// Nothing is mutated unless the block extends the tip, its seal checks
    /// out, and every transaction is still valid against the UTXO set in
    /// order. Returns how many pool entries were evicted because a committed
    /// transaction consumed one of their inputs.
    pub fn commit(&mut self, block: Block) -> Result<usize> {
        self.chain.check_extends(&block)?;

        let mut view = BatchView::default();
        for tx in block.transactions() {
            if let Err(reason) = view.admit(&self.utxo_set, tx) {
                return Err(LedgerError::StaleCandidate {
                    hash: block.hash().to_string(),
                    txid: tx.id().to_string(),
                    reason,
                });
            }
        }

        let Self {
            chain,
            utxo_set,
            pending,
        } = self;

        let block = chain.append(block)?;
        let committed: HashSet<&str> = block.transactions().iter().map(|t| t.id()).collect();
        for tx in block.transactions() {
            utxo_set.apply(tx);
        }
        pending.retain(|t| !committed.contains(t.id()));

        let before = pending.len();
        pending.retain(|t| match utxo_set.validate(t, &HashSet::new()) {
            Ok(()) => true,
            Err(reason) => {
                warn!("evicting pending tx {}: {}", t.id(), reason);
                false
            }
        });
        Ok(before - pending.len())
    }
}
