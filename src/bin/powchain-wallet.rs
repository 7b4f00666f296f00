#![forbid(unsafe_code)]
use clap::{Parser, Subcommand};
use colored::*;
use powchain::cli::{init_tracing, load_blockchain, load_from_config, DEFAULT_CONFIG_PATH};
use powchain::config::load_config;
use powchain::error::ChainError;
use powchain::wallet;

#[derive(Parser)]
#[command(author, version, about = "Manage PowChain wallets", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,
    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Creates a new named wallet
    New {
        /// Wallet name (letters, digits, '-' or '_')
        name: String,
    },
    /// Lists all wallets
    List,
    /// Shows a wallet's address and on-chain balance
    Show {
        name: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::New { name } => new_wallet(&cli.config, name)?,
        Commands::List => list(&cli.config)?,
        Commands::Show { name } => show(&cli.config, name)?,
    }

    Ok(())
}

fn new_wallet(config_path: &str, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let w = wallet::create_named_wallet(&config.wallet.dir, name)?;

    println!("{}", "Wallet created".bright_green().bold());
    println!("  Name:    {}", name.bright_yellow());
    println!("  Address: {}", w.address.bright_cyan());
    println!(
        "  File:    {}",
        wallet::wallet_path(&config.wallet.dir, name)?.display()
    );
    Ok(())
}

fn list(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let names = wallet::list_wallets(&config.wallet.dir)?;

    if names.is_empty() {
        println!("{}", "No wallets yet. Create one with `powchain-wallet new <name>`.".yellow());
        return Ok(());
    }

    for name in names {
        match wallet::load_named_wallet(&config.wallet.dir, &name) {
            Ok(w) => println!("{:<20} {}", name.bright_yellow(), w.address.bright_cyan()),
            Err(e) => println!("{:<20} {}", name.bright_yellow(), e.to_string().red()),
        }
    }
    Ok(())
}

fn show(config_path: &str, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (config, db) = load_from_config(config_path)?;
    let w = wallet::load_named_wallet(&config.wallet.dir, name)?;
    let address = w.address()?;

    println!("  Name:    {}", name.bright_yellow());
    println!("  Address: {}", address.to_string().bright_cyan());
    println!("  Created: {}", w.created);

    match load_blockchain(&config, &db) {
        Ok(chain) => println!("  Balance: {}", chain.balance_of(&address).to_string().bright_green()),
        Err(ChainError::ChainNotInitialized) => {
            println!("  Balance: {}", "no chain yet".dimmed())
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
