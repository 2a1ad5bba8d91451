use super::{Block, GENESIS_PREV_HASH};
use crate::error::IntegrityViolation;

/// Append-only sequence of sealed blocks. Index 0 is genesis.
#[derive(Debug)]
pub struct Blockchain {
    genesis: Block,
    blocks: Vec<Block>,
    difficulty: u32,
}

impl Blockchain {
    /// Start a chain from an already sealed genesis block.
    pub fn new(genesis: Block, difficulty: u32) -> Result<Self, IntegrityViolation> {
        if genesis.prev_hash() != GENESIS_PREV_HASH {
            return Err(IntegrityViolation::PrevHashMismatch {
                expected: GENESIS_PREV_HASH.to_string(),
                found: genesis.prev_hash().to_string(),
            });
        }
        genesis.check_seal()?;
        Ok(Self {
            genesis,
            blocks: Vec::new(),
            difficulty,
        })
    }

    /// Return the last block in the chain.
    pub fn last_block(&self) -> &Block {
        self.blocks.last().unwrap_or(&self.genesis)
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        match index {
            0 => Some(&self.genesis),
            i => self.blocks.get(i - 1),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        std::iter::once(&self.genesis).chain(self.blocks.iter())
    }

    /// Check that `block` may extend the current tip.
    pub fn check_extends(&self, block: &Block) -> Result<(), IntegrityViolation> {
        let tip = self.last_block().hash();
        if block.prev_hash() != tip {
            return Err(IntegrityViolation::PrevHashMismatch {
                expected: tip.to_string(),
                found: block.prev_hash().to_string(),
            });
        }
        if block.difficulty() < self.difficulty {
            return Err(IntegrityViolation::DifficultyNotMet {
                hash: block.hash().to_string(),
                difficulty: self.difficulty,
            });
        }
        block.check_seal()
    }

    /// Append a sealed block after checking linkage and proof-of-work.
    pub fn append(&mut self, block: Block) -> Result<&Block, IntegrityViolation> {
        self.check_extends(&block)?;
        self.blocks.push(block);
        Ok(self.last_block())
    }

    /// Validate the entire chain: linkage, hashes and PoW.
    pub fn is_valid_chain(&self) -> bool {
        if self.genesis.prev_hash() != GENESIS_PREV_HASH || !self.genesis.is_sealed() {
            return false;
        }
        let mut prev = &self.genesis;
        for current in &self.blocks {
            if current.prev_hash() != prev.hash() || !current.is_sealed() {
                return false;
            }
            prev = current;
        }
        true
    }

    pub fn len(&self) -> usize {
        self.blocks.len() + 1
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }
}
