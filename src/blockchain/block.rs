use chrono::Utc;
use serde::Serialize;

use super::merkle::merkle_root;
use crate::crypto::{digest, meets_difficulty};
use crate::error::IntegrityViolation;
use crate::transaction::Transaction;

/// A block of transactions sealed by proof-of-work.
///
/// Everything except `nonce` and `hash` is fixed at construction; those two
/// only move while the block is being sealed.
#[derive(Debug, Clone, Serialize)]
pub struct Block {
    prev_hash: String,
    timestamp: i64, // Unix millis (UTC)
    transactions: Vec<Transaction>,
    merkle_root: Option<String>,
    nonce: u64,
    difficulty: u32,
    hash: String,
}

impl Block {
    /// Create an unsealed candidate on top of `prev_hash`.
    pub fn candidate(prev_hash: String, transactions: Vec<Transaction>, difficulty: u32) -> Self {
        Self::with_timestamp(
            prev_hash,
            transactions,
            difficulty,
            Utc::now().timestamp_millis(),
        )
    }

    /// Same as `candidate` but with a fixed timestamp.
    pub fn with_timestamp(
        prev_hash: String,
        transactions: Vec<Transaction>,
        difficulty: u32,
        timestamp: i64,
    ) -> Self {
        let ids: Vec<&str> = transactions.iter().map(|t| t.id()).collect();
        let mut block = Self {
            prev_hash,
            timestamp,
            merkle_root: merkle_root(&ids),
            transactions,
            nonce: 0,
            difficulty,
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Digest of the header: prev hash, timestamp, merkle root, nonce, difficulty.
    pub fn compute_hash(&self) -> String {
        let preimage = format!(
            "{}:{}:{}:{}:{}",
            self.prev_hash,
            self.timestamp,
            self.merkle_root.as_deref().unwrap_or(""),
            self.nonce,
            self.difficulty
        );
        digest(preimage)
    }

    /// One iteration of the nonce search. Hashes the header with the current
    /// nonce; returns true and keeps the hash if it meets the target, else
    /// advances the nonce.
    pub fn step(&mut self) -> bool {
        let hash = self.compute_hash();
        if meets_difficulty(&hash, self.difficulty) {
            self.hash = hash;
            return true;
        }
        self.nonce = self.nonce.wrapping_add(1);
        false
    }

    pub fn is_sealed(&self) -> bool {
        self.check_seal().is_ok()
    }

    /// Validate the cached hash against the header and the difficulty target.
    /// (Does NOT validate chain linkage.)
    pub fn check_seal(&self) -> Result<(), IntegrityViolation> {
        let computed = self.compute_hash();
        if self.hash != computed {
            return Err(IntegrityViolation::HashMismatch {
                stored: self.hash.clone(),
                computed,
            });
        }
        if !meets_difficulty(&self.hash, self.difficulty) {
            return Err(IntegrityViolation::DifficultyNotMet {
                hash: self.hash.clone(),
                difficulty: self.difficulty,
            });
        }
        let ids: Vec<&str> = self.transactions.iter().map(|t| t.id()).collect();
        if merkle_root(&ids) != self.merkle_root {
            return Err(IntegrityViolation::MerkleMismatch);
        }
        Ok(())
    }

    pub fn prev_hash(&self) -> &str {
        &self.prev_hash
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn merkle_root(&self) -> Option<&str> {
        self.merkle_root.as_deref()
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }
}
