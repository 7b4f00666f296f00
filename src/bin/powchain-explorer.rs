#![forbid(unsafe_code)]
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Color as TableColor;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use powchain::blockchain::{Block, Chain};
use powchain::cli::{init_tracing, load_blockchain, load_from_config, load_mempool, DEFAULT_CONFIG_PATH};
use powchain::crypto::Address;
use powchain::transaction::Transaction;

#[derive(Parser)]
#[command(author, version, about = "Inspect the PowChain ledger", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prints the number of blocks
    Length,
    /// Shows one block and its transactions
    Block { id: u64 },
    /// Lists all blocks
    List,
    /// Prints the balance of an address
    Balance { address: String },
    /// Checks every block and link in the chain
    Validate,
    /// Lists pending transactions
    Pending,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let (config, db) = load_from_config(&cli.config)?;

    if let Commands::Pending = cli.command {
        let mempool = load_mempool(&config, &db)?;
        let pending = mempool.get_all_transactions();
        if pending.is_empty() {
            println!("{}", "No pending transactions.".yellow());
        } else {
            println!("{}", transaction_table(&pending));
        }
        return Ok(());
    }

    let chain = load_blockchain(&config, &db)?;
    match &cli.command {
        Commands::Length => println!("{}", chain.len()),
        Commands::Block { id } => {
            print_block(chain.get_block(*id)?);
        }
        Commands::List => println!("{}", block_table(&chain)),
        Commands::Balance { address } => {
            let address = Address::from_string(address)?;
            println!("{}", chain.balance_of(&address));
        }
        Commands::Validate => match chain.verify() {
            Ok(()) => println!(
                "{} ({} blocks)",
                "Chain is valid".bright_green().bold(),
                chain.len()
            ),
            Err(e) => {
                println!("{} {}", "Chain is invalid:".bright_red().bold(), e);
                std::process::exit(1);
            }
        },
        Commands::Pending => {}
    }

    Ok(())
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|name| {
            Cell::new(name)
                .fg(TableColor::Cyan)
                .add_attribute(Attribute::Bold)
        })
        .collect()
}

fn short(hash: &str) -> String {
    hash.chars().take(16).collect()
}

fn format_timestamp(millis: i64) -> String {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn block_table(chain: &Chain) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&["Id", "Hash", "Previous", "Nonce", "Transactions"]));

    for block in chain.blocks() {
        table.add_row(vec![
            Cell::new(format!("#{}", block.id())).fg(TableColor::White),
            Cell::new(short(block.hash())).fg(TableColor::Green),
            Cell::new(short(block.previous_hash())).fg(TableColor::Grey),
            Cell::new(block.nonce()),
            Cell::new(block.transactions().len()),
        ]);
    }
    table
}

fn transaction_table(transactions: &[Transaction]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&[
            "Id", "Kind", "From", "To", "Value", "Fee", "Date", "Message",
        ]));

    for tx in transactions {
        table.add_row(vec![
            Cell::new(short(&tx.id())).fg(TableColor::White),
            Cell::new(tx.kind()).fg(TableColor::Yellow),
            Cell::new(tx.sender().map(Address::to_string).unwrap_or_else(|| "-".to_string())),
            Cell::new(tx.recipient()),
            Cell::new(tx.value()).fg(TableColor::Green),
            Cell::new(tx.fee()),
            Cell::new(format_timestamp(tx.timestamp())).fg(TableColor::Grey),
            Cell::new(tx.message().unwrap_or("")),
        ]);
    }
    table
}

fn print_block(block: &Block) {
    println!("{}", format!("Block #{}", block.id()).bright_cyan().bold());
    println!("  Hash:     {}", block.hash());
    println!("  Previous: {}", block.previous_hash());
    println!("  Nonce:    {}", block.nonce());
    println!("{}", transaction_table(block.transactions()));
}
