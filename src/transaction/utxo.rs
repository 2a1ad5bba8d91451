use std::collections::{HashMap, HashSet};

use super::model::{Transaction, Utxo};
use crate::error::RejectReason;

/// The authoritative index of unspent outputs, keyed by UTXO id.
///
/// Ids of spent outputs are remembered so they can never be minted again.
#[derive(Debug, Default, Clone)]
pub struct UtxoSet {
    map: HashMap<String, Utxo>,
    retired: HashSet<String>,
}

impl UtxoSet {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
            retired: HashSet::new(),
        }
    }

    /// Insert a single output into the set.
    pub fn insert(&mut self, utxo: Utxo) {
        self.map.insert(utxo.id.clone(), utxo);
    }

    /// Spend (remove) a single output. Returns the removed record if it existed.
    pub fn spend(&mut self, id: &str) -> Option<Utxo> {
        let spent = self.map.remove(id)?;
        self.retired.insert(spent.id.clone());
        Some(spent)
    }

    pub fn get(&self, id: &str) -> Option<&Utxo> {
        self.map.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.map.contains_key(id)
    }

    /// True when `id` was ever issued here, spent or not.
    pub fn is_known(&self, id: &str) -> bool {
        self.map.contains_key(id) || self.retired.contains(id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Read-only copy of the whole set.
    pub fn snapshot(&self) -> HashMap<String, Utxo> {
        self.map.clone()
    }

    pub fn balance_of(&self, owner: &str) -> u128 {
        self.map
            .values()
            .filter(|u| u.owner == owner)
            .map(|u| u.amount as u128)
            .sum()
    }

    pub fn total_value(&self) -> u128 {
        self.map.values().map(|u| u.amount as u128).sum()
    }

    /// Check `tx` against this set. `spent` holds ids already consumed by
    /// earlier transactions in the same batch; they count as missing and
    /// cannot be reused as output ids.
    pub fn validate(&self, tx: &Transaction, spent: &HashSet<String>) -> Result<(), RejectReason> {
        if tx.inputs().is_empty() {
            return Err(RejectReason::NoInputs);
        }

        let mut seen = HashSet::new();
        let mut input_sum: u128 = 0;
        for input in tx.inputs() {
            if !seen.insert(input.id.as_str()) {
                return Err(RejectReason::DuplicateInput(input.id.clone()));
            }
            if spent.contains(&input.id) {
                return Err(RejectReason::UnknownInput(input.id.clone()));
            }
            let record = self
                .get(&input.id)
                .ok_or_else(|| RejectReason::UnknownInput(input.id.clone()))?;
            if record != input {
                return Err(RejectReason::InputMismatch(input.id.clone()));
            }
            input_sum += record.amount as u128;
        }

        let output_sum = tx.total_output_amount();
        if input_sum < output_sum {
            return Err(RejectReason::InsufficientInputs {
                inputs: input_sum,
                outputs: output_sum,
            });
        }

        let mut fresh = HashSet::new();
        for output in tx.outputs() {
            let reused = self.is_known(&output.id) || spent.contains(&output.id);
            if reused || !fresh.insert(output.id.as_str()) {
                return Err(RejectReason::OutputCollision(output.id.clone()));
            }
        }

        Ok(())
    }

    /// Spend the inputs of `tx` and insert its outputs.
    pub fn apply(&mut self, tx: &Transaction) {
        for input in tx.inputs() {
            self.spend(&input.id);
        }
        for output in tx.outputs() {
            self.insert(output.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> UtxoSet {
        let mut set = UtxoSet::new();
        set.insert(Utxo::new("seed", 1000, "genesis"));
        set
    }

    #[test]
    fn accepts_spend_with_change() {
        let set = seeded();
        let tx = Transaction::transfer(
            vec![Utxo::new("seed", 1000, "genesis")],
            vec![(400, "bob"), (600, "genesis")],
        );
        assert_eq!(set.validate(&tx, &HashSet::new()), Ok(()));
    }

    #[test]
    fn rejects_unknown_and_overdrawn_inputs() {
        let set = seeded();
        let unknown = Transaction::transfer(vec![Utxo::new("nope", 5, "x")], vec![(5, "y")]);
        assert_eq!(
            set.validate(&unknown, &HashSet::new()),
            Err(RejectReason::UnknownInput("nope".into()))
        );

        let overdrawn =
            Transaction::transfer(vec![Utxo::new("seed", 1000, "genesis")], vec![(1001, "y")]);
        assert_eq!(
            set.validate(&overdrawn, &HashSet::new()),
            Err(RejectReason::InsufficientInputs {
                inputs: 1000,
                outputs: 1001
            })
        );
    }

    #[test]
    fn rejects_forged_and_duplicated_inputs() {
        let set = seeded();
        let forged =
            Transaction::transfer(vec![Utxo::new("seed", 5000, "genesis")], vec![(10, "y")]);
        assert_eq!(
            set.validate(&forged, &HashSet::new()),
            Err(RejectReason::InputMismatch("seed".into()))
        );

        let seed = Utxo::new("seed", 1000, "genesis");
        let twice = Transaction::transfer(vec![seed.clone(), seed], vec![(2000, "y")]);
        assert_eq!(
            set.validate(&twice, &HashSet::new()),
            Err(RejectReason::DuplicateInput("seed".into()))
        );
    }

    #[test]
    fn batch_spent_ids_count_as_missing() {
        let set = seeded();
        let tx = Transaction::transfer(vec![Utxo::new("seed", 1000, "genesis")], vec![(1, "y")]);
        let spent: HashSet<String> = ["seed".to_string()].into();
        assert_eq!(
            set.validate(&tx, &spent),
            Err(RejectReason::UnknownInput("seed".into()))
        );

        let mut set = seeded();
        set.insert(Utxo::new("other", 5, "carol"));
        let reuse =
            Transaction::new(vec![Utxo::new("other", 5, "carol")], vec![Utxo::new("seed", 5, "x")]);
        assert_eq!(
            set.validate(&reuse, &spent),
            Err(RejectReason::OutputCollision("seed".into()))
        );
    }

    #[test]
    fn outputs_cannot_reuse_spent_or_consumed_ids() {
        let mut set = seeded();
        let seed = Utxo::new("seed", 1000, "genesis");

        let echo = Transaction::new(vec![seed.clone()], vec![Utxo::new("seed", 10, "mallory")]);
        assert_eq!(
            set.validate(&echo, &HashSet::new()),
            Err(RejectReason::OutputCollision("seed".into()))
        );

        let spend = Transaction::transfer(vec![seed], vec![(1000, "bob")]);
        set.apply(&spend);
        assert!(set.is_known("seed"));

        let bob = spend.outputs()[0].clone();
        let revive = Transaction::new(vec![bob], vec![Utxo::new("seed", 1000, "mallory")]);
        assert_eq!(
            set.validate(&revive, &HashSet::new()),
            Err(RejectReason::OutputCollision("seed".into()))
        );
    }

    #[test]
    fn apply_moves_value() {
        let mut set = seeded();
        let tx = Transaction::transfer(
            vec![Utxo::new("seed", 1000, "genesis")],
            vec![(400, "bob"), (600, "genesis")],
        );
        set.apply(&tx);
        assert!(!set.contains("seed"));
        assert_eq!(set.len(), 2);
        assert_eq!(set.balance_of("bob"), 400);
        assert_eq!(set.total_value(), 1000);
    }
}
