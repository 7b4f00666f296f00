#![forbid(unsafe_code)]
use clap::Parser;
use colored::*;
use powchain::cli::{init_tracing, load_from_config, load_mempool, DEFAULT_CONFIG_PATH};
use powchain::crypto::Address;
use powchain::persistence::Persistence;
use powchain::transaction::Transaction;
use powchain::wallet;

/// Sign a transfer from a named wallet and queue it for mining
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Wallet to send from
    #[arg(long)]
    from: String,
    /// Recipient address (0x followed by 40 hex characters)
    #[arg(long)]
    to: String,
    /// Amount to transfer
    #[arg(long)]
    value: u64,
    /// Fee paid to the miner
    #[arg(long, default_value_t = 1)]
    fee: u64,
    /// Optional message stored with the transaction
    #[arg(long)]
    message: Option<String>,
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
    let sender = wallet::load_named_wallet(&config.wallet.dir, &cli.from)?;
    let keypair = sender.get_keypair()?;
    let recipient = Address::from_string(&cli.to)?;

    let tx = Transaction::transfer(
        &keypair,
        recipient,
        cli.value,
        cli.fee,
        cli.message.clone(),
        &config.chain,
    )?;

    // Admission rules (duplicates, pool capacity) are checked before anything is stored.
    let mut mempool = load_mempool(&config, &db)?;
    mempool.add_transaction(tx.clone())?;
    db.save_pending(&tx)?;

    println!("{}", "Transaction queued".bright_green().bold());
    println!("  Id:     {}", tx.id().bright_cyan());
    println!("  From:   {}", sender.address.bright_yellow());
    println!("  To:     {}", tx.recipient().to_string().bright_yellow());
    println!("  Value:  {}", tx.value());
    println!("  Fee:    {}", tx.fee());
    println!("  Pending transactions: {}", mempool.len());
    Ok(())
}
