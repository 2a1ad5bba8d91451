use serde::{Deserialize, Serialize};

use crate::crypto::digest;

/// An unspent transaction output: a fixed amount owned by a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub id: String,
    pub amount: u64,
    pub owner: String,
}

impl Utxo {
    pub fn new(id: impl Into<String>, amount: u64, owner: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            amount,
            owner: owner.into(),
        }
    }
}

/// Consumes `inputs` and produces `outputs`. The id is a content hash taken
/// once at construction; fields are private so it cannot drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    id: String,
    inputs: Vec<Utxo>,
    outputs: Vec<Utxo>,
}

impl Transaction {
    /// Build a transaction from explicit output records.
    pub fn new(inputs: Vec<Utxo>, outputs: Vec<Utxo>) -> Self {
        let id = Self::compute_id(&inputs, outputs.iter().map(|o| o.amount));
        Self {
            id,
            inputs,
            outputs,
        }
    }

    /// Build a transaction paying `(amount, owner)` pairs. Output ids are
    /// derived from the transaction id as `"{txid}:{vout}"`.
    pub fn transfer<S: Into<String>>(inputs: Vec<Utxo>, payouts: Vec<(u64, S)>) -> Self {
        let id = Self::compute_id(&inputs, payouts.iter().map(|(amount, _)| *amount));
        let outputs = payouts
            .into_iter()
            .enumerate()
            .map(|(vout, (amount, owner))| Utxo::new(format!("{id}:{vout}"), amount, owner))
            .collect();
        Self {
            id,
            inputs,
            outputs,
        }
    }

    /// Digest over the ordered input ids and ordered output amounts.
    fn compute_id(inputs: &[Utxo], amounts: impl Iterator<Item = u64>) -> String {
        let input_ids: Vec<&str> = inputs.iter().map(|u| u.id.as_str()).collect();
        let amounts: Vec<u64> = amounts.collect();
        let payload = serde_json::json!({
            "inputs": input_ids,
            "outputs": amounts,
        });
        digest(payload.to_string())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn inputs(&self) -> &[Utxo] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Utxo] {
        &self.outputs
    }

    pub fn total_input_amount(&self) -> u128 {
        self.inputs.iter().map(|u| u.amount as u128).sum()
    }

    pub fn total_output_amount(&self) -> u128 {
        self.outputs.iter().map(|u| u.amount as u128).sum()
    }
}
