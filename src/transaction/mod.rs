pub mod model;
pub mod utxo;

pub use model::{Transaction, Utxo};
pub use utxo::UtxoSet;
