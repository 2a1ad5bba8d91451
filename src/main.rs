use dotenvy::dotenv;
use log::{error, info};

use pow_ledger::workload::{bootstrap_users, generate_transactions};
use pow_ledger::{Config, Ledger};

fn main() {
    let _ = dotenv();
    env_logger::init();

    if let Err(e) = run() {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run() -> pow_ledger::Result<()> {
    let config = Config::from_env();
    config.validate()?;
    let workload = &config.workload;

    println!(
        "⛓️ Starting ledger (difficulty={}, batch={}, concurrency={})",
        config.ledger.difficulty, workload.batch_size, workload.concurrency
    );

    let ledger = Ledger::with_config(config.ledger.clone())?;
    let mut rng = rand::thread_rng();

    let mut users = bootstrap_users(&ledger, workload.users, &mut rng)?;
    println!("Total Users Created: {}", users.len());

    let transactions = generate_transactions(&mut users, workload.transactions, &mut rng);
    println!("Total Transactions Created: {}", transactions.len());

    let admitted = transactions.iter().filter(|tx| ledger.submit(tx)).count();
    info!("{} of {} transactions admitted", admitted, transactions.len());

    let report = ledger.run_mining_cycle(workload.batch_size, workload.concurrency)?;
    let last = ledger.block_summary(ledger.chain_len() - 1)?;

    let output = serde_json::json!({
        "cycle": report,
        "stats": ledger.stats(),
        "last_block": last,
        "chain_valid": ledger.is_valid_chain(),
    });
    match serde_json::to_string_pretty(&output) {
        Ok(text) => println!("{text}"),
        Err(e) => error!("could not render report: {e}"),
    }
    Ok(())
}
