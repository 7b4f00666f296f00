#![forbid(unsafe_code)]
use clap::Parser;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use powchain::blockchain::{Block, Chain};
use powchain::cli::{init_tracing, load_from_config, load_mempool, DEFAULT_CONFIG_PATH};
use powchain::crypto::Address;
use powchain::miner::{build_block, select_payload, MiningJob, MiningOutcome};
use powchain::persistence::Persistence;
use powchain::wallet;
use std::time::{Duration, Instant};

/// Mine the next block from pending transactions, or the genesis block on an empty chain
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Wallet that signs the reward and fee entries
    #[arg(long)]
    wallet: String,
    /// Pay rewards to this address instead of the wallet's own
    #[arg(long)]
    payout: Option<String>,
    /// Give up after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Path to the configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let (config, db) = load_from_config(&cli.config)?;
    let miner = wallet::load_named_wallet(&config.wallet.dir, &cli.wallet)?.get_keypair()?;
    let payout = cli.payout.as_deref().map(Address::from_string).transpose()?;

    let Some(mut chain) = db.load_chain(&config.chain)? else {
        let genesis = Block::create_genesis(&miner, &config.chain)?;
        let chain = Chain::initialize(genesis, config.chain.clone())?;
        db.save_block(chain.most_recent())?;

        println!("{}", "Genesis block created".bright_green().bold());
        println!("  Hash:   {}", chain.most_recent().hash().bright_cyan());
        println!("  Reward: {} to {}", config.chain.creation_reward, miner.address());
        return Ok(());
    };

    let mempool = load_mempool(&config, &db)?;
    let payload = select_payload(&mempool, &config.chain)?;
    let block = build_block(&chain, &miner, payout, payload)?;
    let id = block.id();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")?);
    spinner.set_message(format!(
        "Mining block #{} at difficulty {}",
        id, config.chain.difficulty
    ));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let started = Instant::now();
    let job = MiningJob::spawn(block, config.chain.clone());
    let outcome = match cli.timeout_secs {
        Some(secs) => job.wait_timeout(Duration::from_secs(secs))?,
        None => job.wait()?,
    };

    let block = match outcome {
        MiningOutcome::Mined(block) => block,
        MiningOutcome::Cancelled => {
            spinner.finish_with_message(format!("Mining block #{} abandoned", id));
            println!("{}", "No block found before the timeout.".yellow());
            return Ok(());
        }
    };
    spinner.finish_with_message(format!("Mined block #{}", id));

    if !chain.append(block.clone()) {
        return Err(format!("block #{} no longer fits the stored chain", id).into());
    }
    chain.verify()?;
    db.save_block(&block)?;

    println!("{}", "Block mined".bright_green().bold());
    println!("  Id:       {}", block.id());
    println!("  Hash:     {}", block.hash().bright_cyan());
    println!("  Previous: {}", block.previous_hash());
    println!("  Nonce:    {}", block.nonce());
    println!("  Time:     {:.2}s", started.elapsed().as_secs_f64());
    for tx in block.batch().payload() {
        println!("  Included: {} (fee {})", tx.id().bright_yellow(), tx.fee());
    }
    Ok(())
}
