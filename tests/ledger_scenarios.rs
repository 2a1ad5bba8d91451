//! End-to-end ledger scenarios through the public API.

use std::collections::HashSet;
use std::thread;

use pow_ledger::blockchain::GENESIS_PREV_HASH;
use pow_ledger::crypto::{digest, meets_difficulty};
use pow_ledger::workload::{bootstrap_users, generate_transactions};
use pow_ledger::{
    Block, Ledger, LedgerConfig, LedgerError, RejectReason, Transaction, Utxo, UtxoSet,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn ledger(difficulty: u32, seed: u64) -> Ledger {
    init_logging();
    Ledger::with_config(LedgerConfig {
        difficulty,
        genesis_amount: seed,
        ..LedgerConfig::default()
    })
    .unwrap()
}

fn seed_utxo(ledger: &Ledger) -> Utxo {
    ledger.utxo_snapshot().into_values().next().unwrap()
}

fn blocks(ledger: &Ledger) -> Vec<Block> {
    (0..ledger.chain_len())
        .map(|i| ledger.get_block(i).unwrap())
        .collect()
}

/// Replay every committed transaction from scratch.
fn replay(ledger: &Ledger) -> UtxoSet {
    let mut set = UtxoSet::new();
    for block in blocks(ledger) {
        for tx in block.transactions() {
            set.apply(tx);
        }
    }
    set
}

/// Linkage, proof-of-work, disjoint inputs, UTXO set equal to the replay of
/// history, and a pool holding only live, uncommitted transactions.
fn assert_history_consistent(ledger: &Ledger) {
    assert!(ledger.is_valid_chain());
    let chain = blocks(ledger);
    assert_eq!(chain[0].prev_hash(), GENESIS_PREV_HASH);
    for pair in chain.windows(2) {
        assert_eq!(pair[1].prev_hash(), pair[0].hash());
    }
    for b in &chain {
        assert!(meets_difficulty(b.hash(), b.difficulty()));
        assert_eq!(b.hash(), b.compute_hash());
    }

    let mut spent = HashSet::new();
    for b in &chain {
        for tx in b.transactions() {
            for input in tx.inputs() {
                assert!(spent.insert(input.id.clone()), "{} spent twice", input.id);
            }
        }
    }

    let utxos = ledger.utxo_snapshot();
    assert_eq!(replay(ledger).snapshot(), utxos);

    let committed = committed_ids(ledger);
    for tx in ledger.pending_snapshot() {
        assert!(!committed.contains(tx.id()));
        for input in tx.inputs() {
            assert!(utxos.contains_key(&input.id));
        }
    }
}

fn committed_ids(ledger: &Ledger) -> HashSet<String> {
    blocks(ledger)
        .iter()
        .flat_map(|b| b.transactions().iter().map(|t| t.id().to_string()))
        .collect()
}

#[test]
fn spend_with_change_moves_value() {
    let l = ledger(2, 1000);
    let seed = seed_utxo(&l);

    let tx = Transaction::transfer(
        vec![seed.clone()],
        vec![(400, "bob".to_string()), (600, seed.owner.clone())],
    );
    assert!(l.submit(&tx));
    l.run_mining_cycle(1, 1).unwrap();

    assert_eq!(l.chain_len(), 2);
    let utxos = l.utxo_snapshot();
    assert!(!utxos.contains_key(&seed.id));
    assert_eq!(utxos.len(), 2);
    assert_eq!(utxos[&tx.outputs()[0].id].amount, 400);
    assert_eq!(utxos[&tx.outputs()[0].id].owner, "bob");
    assert_eq!(utxos[&tx.outputs()[1].id].amount, 600);
}

#[test]
fn unknown_input_is_not_admitted() {
    let l = ledger(1, 1000);
    let ghost =
        Transaction::transfer(vec![Utxo::new("does-not-exist", 10, "x")], vec![(10, "y")]);

    assert!(!l.submit(&ghost));
    assert_eq!(l.pending_len(), 0);
}

#[test]
fn overspending_is_not_admitted() {
    let l = ledger(1, 1000);
    let tx = Transaction::transfer(vec![seed_utxo(&l)], vec![(1001, "greedy")]);
    assert!(!l.submit(&tx));
    assert_eq!(l.pending_len(), 0);
}

#[test]
fn race_commits_exactly_one_candidate() {
    let l = ledger(0, 1000);
    let seed = seed_utxo(&l);

    // split the seed so two independent spends exist
    let split = Transaction::transfer(vec![seed], vec![(500, "alice"), (500, "bob")]);
    assert!(l.submit(&split));
    l.run_mining_cycle(1, 1).unwrap();
    let before = l.chain_len();

    let a = Transaction::transfer(vec![split.outputs()[0].clone()], vec![(500, "carol")]);
    let b = Transaction::transfer(vec![split.outputs()[1].clone()], vec![(500, "dave")]);
    assert!(l.submit(&a));
    assert!(l.submit(&b));

    let mined = l
        .race_candidates(vec![vec![a.clone()], vec![b.clone()]])
        .unwrap()
        .unwrap();
    assert_eq!(mined.superseded, 1);
    assert_eq!(l.chain_len(), before + 1);

    let winner = mined.block.transactions()[0].id().to_string();
    let loser = if winner == a.id() { &b } else { &a };
    let pending: Vec<String> = l
        .pending_snapshot()
        .iter()
        .map(|t| t.id().to_string())
        .collect();
    assert_eq!(pending, vec![loser.id().to_string()]);
    assert!(l.utxo_snapshot().contains_key(&loser.inputs()[0].id));
}

#[test]
fn randomized_workload_keeps_every_invariant() {
    let l = ledger(1, 1_000_000);
    let mut rng = StdRng::seed_from_u64(2024);
    let mut users = bootstrap_users(&l, 30, &mut rng).unwrap();

    let txs = generate_transactions(&mut users, 30, &mut rng);
    for tx in &txs {
        assert!(l.submit(tx));
        assert!(tx.total_input_amount() >= tx.total_output_amount());
    }
    // a conflicting double spend of something already pending
    let dup = Transaction::transfer(txs[0].inputs().to_vec(), vec![(1, "thief")]);
    assert!(l.submit(&dup));

    let report = l.run_mining_cycle(4, 5).unwrap();
    assert!(l.pending_len() < 4);
    assert!(report.blocks > 0);
    assert_history_consistent(&l);

    // the double spend may burn value but can never mint it
    assert!(l.stats().total_value <= 1_000_000);
}

#[test]
fn spent_ids_cannot_be_minted_again() {
    let l = ledger(0, 1000);
    let seed = seed_utxo(&l);

    // an output may not take over the id of the input it consumes
    let echo = Transaction::new(
        vec![seed.clone()],
        vec![Utxo::new(seed.id.clone(), 10, "mallory")],
    );
    assert_eq!(
        l.try_submit(&echo),
        Err(RejectReason::OutputCollision(seed.id.clone()))
    );

    let pay = Transaction::transfer(vec![seed.clone()], vec![(1000, "bob")]);
    assert!(l.submit(&pay));
    l.run_mining_cycle(1, 1).unwrap();

    // nor resurrect it once it has been spent
    let revive = Transaction::new(
        vec![pay.outputs()[0].clone()],
        vec![Utxo::new(seed.id.clone(), 1000, "mallory")],
    );
    assert_eq!(
        l.try_submit(&revive),
        Err(RejectReason::OutputCollision(seed.id.clone()))
    );
    assert_eq!(l.pending_len(), 0);
    assert!(!l.utxo_snapshot().contains_key(&seed.id));
    assert_history_consistent(&l);
}

#[test]
fn competing_cycles_and_live_submissions_stay_consistent() {
    let owned = ledger(1, 1_000_000);
    let l = &owned;
    let mut rng = StdRng::seed_from_u64(77);
    let mut users = bootstrap_users(l, 40, &mut rng).unwrap();
    let txs = generate_transactions(&mut users, 40, &mut rng);
    assert!(txs.len() >= 2);

    let (early, late) = txs.split_at(txs.len() / 2);
    for tx in early {
        assert!(l.submit(tx));
    }

    let reports = thread::scope(|s| {
        let miners = [
            s.spawn(move || l.run_mining_cycle(2, 2)),
            s.spawn(move || l.run_mining_cycle(2, 3)),
        ];
        s.spawn(move || {
            for tx in late {
                assert!(l.submit(tx));
                thread::yield_now();
            }
        });
        miners.map(|m| m.join().unwrap().unwrap())
    });
    assert!(reports.iter().map(|r| r.blocks).sum::<usize>() > 0);
    assert_history_consistent(l);

    // drain whatever arrived after both cycles stopped
    l.run_mining_cycle(1, 1).unwrap();
    assert_eq!(l.pending_len(), 0);
    assert_history_consistent(l);

    let committed = committed_ids(l);
    for tx in &txs {
        assert!(committed.contains(tx.id()), "{} never committed", tx.id());
    }
}

#[test]
fn out_of_range_block_is_an_error() {
    let l = ledger(0, 10);
    assert!(matches!(
        l.get_block(5),
        Err(LedgerError::BlockOutOfRange { index: 5, len: 1 })
    ));
}

#[test]
fn digest_is_stable() {
    assert_eq!(digest("abc"), digest("abc"));
    assert_eq!(
        digest("abc"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}
