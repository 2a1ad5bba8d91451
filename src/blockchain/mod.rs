pub mod block;
pub mod merkle;
pub mod model;

pub use block::Block;
pub use merkle::merkle_root;
pub use model::Blockchain;

/// Default Proof-of-Work difficulty (number of leading zero hex chars).
pub const DEFAULT_DIFFICULTY: u32 = 3;

/// `prev_hash` of the genesis block.
pub const GENESIS_PREV_HASH: &str = "0";

/// Owner of the seed UTXO created with the ledger.
pub const GENESIS_OWNER: &str = "genesis_owner";

/// Amount of the seed UTXO.
pub const GENESIS_AMOUNT: u64 = 1_000_000;
