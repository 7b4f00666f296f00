//! Wallet files: one JSON document per named signing key
//!
//! Wallets live in their own directory, apart from the chain database.

use crate::crypto::{Address, KeyPair};
use crate::error::{ChainError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const WALLET_EXTENSION: &str = "json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub name: Option<String>,
    pub address: String,
    pub secret_key_hex: String,
    /// RFC 3339 creation time
    pub created: String,
}

impl Wallet {
    /// A wallet holding a freshly generated key pair.
    pub fn new(name: Option<String>) -> Result<Self> {
        Ok(Self::from_keypair(name, &KeyPair::generate()))
    }

    pub fn from_keypair(name: Option<String>, keypair: &KeyPair) -> Self {
        Wallet {
            name,
            address: keypair.address().to_string(),
            secret_key_hex: keypair.secret_key_hex(),
            created: Utc::now().to_rfc3339(),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    /// Load a wallet and check that its address matches its key.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            ChainError::WalletError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let wallet: Wallet = serde_json::from_str(&json)?;

        let derived = wallet.get_keypair()?.address();
        if derived.as_str() != wallet.address {
            return Err(ChainError::WalletError(format!(
                "Wallet {} records address {} but its key derives {}",
                path.display(),
                wallet.address,
                derived
            )));
        }
        Ok(wallet)
    }

    pub fn get_keypair(&self) -> Result<KeyPair> {
        KeyPair::from_secret_hex(&self.secret_key_hex)
    }

    pub fn address(&self) -> Result<Address> {
        Address::from_string(&self.address)
    }
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ChainError::WalletError(format!(
            "Invalid wallet name '{}': use letters, digits, '-' or '_'",
            name
        )))
    }
}

pub fn wallet_path(dir: impl AsRef<Path>, name: &str) -> Result<PathBuf> {
    validate_name(name)?;
    Ok(dir.as_ref().join(format!("{}.{}", name, WALLET_EXTENSION)))
}

/// Create and save a new wallet. Refuses to overwrite an existing one.
pub fn create_named_wallet(dir: impl AsRef<Path>, name: &str) -> Result<Wallet> {
    let dir = dir.as_ref();
    let path = wallet_path(dir, name)?;
    if path.exists() {
        return Err(ChainError::WalletError(format!(
            "Wallet '{}' already exists",
            name
        )));
    }

    fs::create_dir_all(dir)?;
    let wallet = Wallet::new(Some(name.to_string()))?;
    wallet.save(&path)?;

    info!(name, address = %wallet.address, "Wallet created");
    Ok(wallet)
}

pub fn load_named_wallet(dir: impl AsRef<Path>, name: &str) -> Result<Wallet> {
    let path = wallet_path(dir, name)?;
    if !path.exists() {
        return Err(ChainError::WalletError(format!(
            "Wallet '{}' not found",
            name
        )));
    }
    Wallet::load(path)
}

/// Names of all wallets in `dir`, sorted. A missing directory holds no wallets.
pub fn list_wallets(dir: impl AsRef<Path>) -> Result<Vec<String>> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(WALLET_EXTENSION) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            names.push(stem.to_string());
        }
    }
    names.sort();
    Ok(names)
}
