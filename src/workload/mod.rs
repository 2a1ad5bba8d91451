//! Synthetic accounts and payments for demos and load tests.
//!
//! Users are funded from the genesis seed through an ordinary fan-out
//! transaction, so every UTXO they hold is backed by committed history.

use std::collections::HashMap;

use log::{debug, info};
use rand::Rng;

use crate::blockchain::GENESIS_OWNER;
use crate::crypto::digest;
use crate::error::{LedgerError, Result};
use crate::ledger::Ledger;
use crate::transaction::{Transaction, Utxo};

/// Smallest starting balance handed to a bootstrapped user.
pub const MIN_USER_BALANCE: u64 = 100;

#[derive(Debug, Clone)]
pub struct User {
    pub name: String,
    pub public_key: String,
    /// Committed outputs this user may spend.
    pub utxos: Vec<Utxo>,
    /// Outputs of submitted but not yet committed transactions.
    pub unconfirmed: Vec<Utxo>,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            public_key: digest(name.as_bytes()),
            name,
            utxos: Vec::new(),
            unconfirmed: Vec::new(),
        }
    }

    /// Sum of spendable (committed) outputs.
    pub fn balance(&self) -> u128 {
        self.utxos.iter().map(|u| u.amount as u128).sum()
    }

    /// Reconcile with a UTXO snapshot: drop outputs that are gone and
    /// promote unconfirmed outputs that are now committed.
    pub fn confirm(&mut self, snapshot: &HashMap<String, Utxo>) {
        self.utxos.retain(|u| snapshot.contains_key(&u.id));
        let (now_live, still_waiting): (Vec<Utxo>, Vec<Utxo>) = self
            .unconfirmed
            .drain(..)
            .partition(|u| snapshot.contains_key(&u.id));
        self.utxos.extend(now_live);
        self.unconfirmed = still_waiting;
    }
}

/// Create `count` users named `User{i}` and fund each with a random balance
/// carved out of the genesis seed. The funding transaction is mined as its
/// own block before returning.
pub fn bootstrap_users<R: Rng>(ledger: &Ledger, count: usize, rng: &mut R) -> Result<Vec<User>> {
    let mut users: Vec<User> = (0..count).map(|i| User::new(format!("User{i}"))).collect();
    if users.is_empty() {
        return Ok(users);
    }

    let seed = ledger
        .utxo_snapshot()
        .into_values()
        .filter(|u| u.owner == GENESIS_OWNER)
        .max_by_key(|u| u.amount)
        .ok_or_else(|| LedgerError::InvalidConfig("no genesis funds left to distribute".into()))?;

    let cap = seed.amount / count as u64;
    if cap < MIN_USER_BALANCE {
        return Err(LedgerError::InvalidConfig(format!(
            "seed of {} cannot fund {} users with at least {} each",
            seed.amount, count, MIN_USER_BALANCE
        )));
    }

    let mut payouts: Vec<(u64, String)> = users
        .iter()
        .map(|u| (rng.gen_range(MIN_USER_BALANCE..=cap), u.public_key.clone()))
        .collect();
    let handed_out: u64 = payouts.iter().map(|(amount, _)| amount).sum();
    if seed.amount > handed_out {
        payouts.push((seed.amount - handed_out, GENESIS_OWNER.to_string()));
    }

    let funding = Transaction::transfer(vec![seed], payouts);
    ledger
        .try_submit(&funding)
        .map_err(|reason| LedgerError::Rejected {
            txid: funding.id().to_string(),
            reason,
        })?;
    for (user, out) in users.iter_mut().zip(funding.outputs()) {
        user.unconfirmed.push(out.clone());
    }

    if let Some(mined) = ledger.race_candidates(vec![vec![funding.clone()]])? {
        debug!("funding tx {} committed in block #{}", funding.id(), mined.index);
    }
    let snapshot = ledger.utxo_snapshot();
    for user in &mut users {
        user.confirm(&snapshot);
    }

    info!("bootstrapped {} users from genesis seed", users.len());
    Ok(users)
}

/// Build up to `target` random payments between `users`.
///
/// Each payment spends one committed UTXO of a random sender, pays a random
/// amount to another user and returns the rest as change. A UTXO is spent at
/// most once, so every returned transaction is admissible on its own and no
/// two of them conflict. Fewer than `target` are returned once spendable
/// outputs run out.
pub fn generate_transactions<R: Rng>(
    users: &mut [User],
    target: usize,
    rng: &mut R,
) -> Vec<Transaction> {
    let mut transactions = Vec::with_capacity(target);
    if users.len() < 2 {
        return transactions;
    }

    while transactions.len() < target {
        let senders: Vec<usize> = users
            .iter()
            .enumerate()
            .filter(|(_, u)| u.utxos.iter().any(|o| o.amount > 0))
            .map(|(i, _)| i)
            .collect();
        if senders.is_empty() {
            break;
        }

        let sender = senders[rng.gen_range(0..senders.len())];
        let spendable: Vec<usize> = users[sender]
            .utxos
            .iter()
            .enumerate()
            .filter(|(_, o)| o.amount > 0)
            .map(|(i, _)| i)
            .collect();
        let utxo = users[sender]
            .utxos
            .swap_remove(spendable[rng.gen_range(0..spendable.len())]);

        let mut receiver = rng.gen_range(0..users.len() - 1);
        if receiver >= sender {
            receiver += 1;
        }

        let amount = rng.gen_range(1..=utxo.amount);
        let mut payouts = vec![(amount, users[receiver].public_key.clone())];
        if utxo.amount > amount {
            payouts.push((utxo.amount - amount, users[sender].public_key.clone()));
        }

        let tx = Transaction::transfer(vec![utxo], payouts);
        users[receiver].unconfirmed.push(tx.outputs()[0].clone());
        if let Some(change) = tx.outputs().get(1) {
            users[sender].unconfirmed.push(change.clone());
        }
        transactions.push(tx);
    }

    debug!("generated {} transactions", transactions.len());
    transactions
}
