//! Serializable read-only views for printing and inspection.

use serde::Serialize;

use crate::blockchain::{Block, Blockchain};
use crate::transaction::UtxoSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockSummary {
    pub index: usize,
    pub hash: String,
    pub prev_hash: String,
    pub merkle_root: Option<String>,
    pub timestamp: i64,
    pub nonce: u64,
    pub difficulty: u32,
    pub transactions: usize,
}

impl BlockSummary {
    pub fn from_block(index: usize, block: &Block) -> Self {
        Self {
            index,
            hash: block.hash().to_string(),
            prev_hash: block.prev_hash().to_string(),
            merkle_root: block.merkle_root().map(str::to_string),
            timestamp: block.timestamp(),
            nonce: block.nonce(),
            difficulty: block.difficulty(),
            transactions: block.transactions().len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub height: usize,
    pub difficulty: u32,
    pub pending: usize,
    pub utxos: usize,
    pub total_value: u128,
    pub committed_transactions: usize,
    /// Millis between the last two blocks.
    pub last_interval_ms: Option<i64>,
}

impl LedgerStats {
    pub fn collect(chain: &Blockchain, utxo: &UtxoSet, pending: usize) -> Self {
        let height = chain.len();
        let last_interval_ms = height
            .checked_sub(2)
            .and_then(|i| chain.get(i))
            .map(|older| (chain.last_block().timestamp() - older.timestamp()).max(0));

        Self {
            height,
            difficulty: chain.difficulty(),
            pending,
            utxos: utxo.len(),
            total_value: utxo.total_value(),
            committed_transactions: chain.iter().map(|b| b.transactions().len()).sum(),
            last_interval_ms,
        }
    }
}
