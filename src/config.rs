//! Configuration management for PowChain

use crate::error::{ChainError, Result};
use crate::mempool::SelectionPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Length of a SHA-256 digest rendered as hex.
pub const MAX_DIFFICULTY: usize = 64;

/// Network constants threaded through transaction, batch and block validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Value of every `CreationReward` transaction
    #[serde(default = "default_creation_reward")]
    pub creation_reward: u64,
    /// Number of leading `'0'` hex characters a mined block hash must have
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
    /// Payload transactions per block, before reward/fee synthesis
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    #[serde(default)]
    pub selection_policy: SelectionPolicy,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            creation_reward: default_creation_reward(),
            difficulty: default_difficulty(),
            block_size: default_block_size(),
            selection_policy: SelectionPolicy::default(),
        }
    }
}

impl ChainConfig {
    /// Expected number of transactions in a non-genesis block.
    pub fn batch_len(&self) -> usize {
        self.block_size + 2
    }

    pub fn with_difficulty(mut self, difficulty: usize) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.difficulty > MAX_DIFFICULTY {
            return Err(ChainError::InvalidConfig(format!(
                "difficulty must be at most {}, got {}",
                MAX_DIFFICULTY, self.difficulty
            )));
        }
        if self.block_size == 0 {
            return Err(ChainError::InvalidConfig(
                "block_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WalletConfig {
    #[serde(default = "default_wallet_dir")]
    pub dir: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            dir: default_wallet_dir(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
}

fn default_creation_reward() -> u64 {
    100
}

fn default_difficulty() -> usize {
    3
}

fn default_block_size() -> usize {
    1
}

fn default_db_path() -> String {
    "./data/powchain.db".to_string()
}

fn default_wallet_dir() -> String {
    "./data/wallets".to_string()
}

/// Parse a configuration document and validate the chain section.
pub fn parse_config(config_str: &str) -> Result<Config> {
    let config: Config = toml::from_str(config_str)?;
    config.chain.validate()?;

    if config.storage.path.is_empty() {
        return Err(ChainError::InvalidConfig(
            "storage.path must be set".to_string(),
        ));
    }
    if config.wallet.dir.is_empty() {
        return Err(ChainError::InvalidConfig("wallet.dir must be set".to_string()));
    }

    Ok(config)
}

/// Load configuration from `path`, falling back to defaults when the file is absent.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let config_str = fs::read_to_string(path)?;
    parse_config(&config_str)
}
