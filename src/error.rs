//! Error types for the ledger core.

use thiserror::Error;

/// Why a transaction was not admitted to the pending pool
/// (or dropped from a candidate at commit time).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("transaction spends no inputs")]
    NoInputs,

    #[error("input {0} is not in the UTXO set")]
    UnknownInput(String),

    #[error("input {0} does not match the ledger record")]
    InputMismatch(String),

    #[error("input {0} is spent twice")]
    DuplicateInput(String),

    #[error("output id {0} collides with a live UTXO")]
    OutputCollision(String),

    #[error("inputs total {inputs} is less than outputs total {outputs}")]
    InsufficientInputs { inputs: u128, outputs: u128 },

    #[error("transaction {0} is already pending")]
    AlreadyPending(String),

    #[error("transaction is not in the pending pool")]
    NotPending,
}

/// A block that must never be appended to the chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    #[error("prev_hash {found} does not match tip {expected}")]
    PrevHashMismatch { expected: String, found: String },

    #[error("stored hash {stored} does not match header digest {computed}")]
    HashMismatch { stored: String, computed: String },

    #[error("hash {hash} does not meet difficulty {difficulty}")]
    DifficultyNotMet { hash: String, difficulty: u32 },

    #[error("merkle root does not commit to the block's transactions")]
    MerkleMismatch,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("transaction {txid} rejected: {reason}")]
    Rejected { txid: String, reason: RejectReason },

    #[error("chain integrity violation: {0}")]
    ChainIntegrity(#[from] IntegrityViolation),

    #[error("stale candidate {hash}: transaction {txid} no longer valid ({reason})")]
    StaleCandidate {
        hash: String,
        txid: String,
        reason: RejectReason,
    },

    #[error("block index {index} out of range (chain length {len})")]
    BlockOutOfRange { index: usize, len: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
