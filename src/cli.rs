//! Shared setup for the command-line tools

use crate::blockchain::Chain;
use crate::config::{load_config, Config};
use crate::error::{ChainError, Result};
use crate::mempool::Mempool;
use crate::persistence::{Database, Persistence};
use std::path::Path;
use tracing::Level;

pub const DEFAULT_CONFIG_PATH: &str = "powchain.toml";

/// Install a fmt subscriber on stderr so stdout carries only command output.
pub fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn open_database(config: &Config) -> Result<Database> {
    Database::open(&config.storage.path)
}

/// Configuration and database, as every tool needs them.
pub fn load_from_config(path: impl AsRef<Path>) -> Result<(Config, Database)> {
    let config = load_config(path)?;
    let db = open_database(&config)?;
    Ok((config, db))
}

/// The stored chain, or `ChainNotInitialized` when no genesis block exists yet.
pub fn load_blockchain(config: &Config, db: &Database) -> Result<Chain> {
    db.load_chain(&config.chain)?
        .ok_or(ChainError::ChainNotInitialized)
}

pub fn load_mempool(config: &Config, db: &Database) -> Result<Mempool> {
    db.load_mempool(&config.chain)
}
