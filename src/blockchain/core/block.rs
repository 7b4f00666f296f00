use crate::blockchain::core::batch::TransactionBatch;
use crate::config::ChainConfig;
use crate::crypto::{sha256_hex, KeyPair};
use crate::error::{ChainError, Result};
use crate::transaction::{SignedTransaction, Transaction, TransactionKind};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Previous-hash sentinel carried by the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Borrowed view used to encode a block; must stay field-for-field identical to `BlockFields`.
#[derive(Serialize)]
struct BlockFieldsRef<'a> {
    id: u64,
    previous_hash: &'a str,
    transactions: Vec<SignedTransactionRef<'a>>,
    nonce: u64,
}

#[derive(Serialize)]
struct SignedTransactionRef<'a> {
    datastring: &'a str,
    signature: &'a str,
}

#[derive(Deserialize)]
struct BlockFields {
    id: u64,
    previous_hash: String,
    transactions: Vec<SignedTransaction>,
    nonce: u64,
}

fn encode_block(id: u64, previous_hash: &str, batch: &TransactionBatch, nonce: u64) -> Result<String> {
    let fields = BlockFieldsRef {
        id,
        previous_hash,
        transactions: batch
            .transactions()
            .iter()
            .map(|tx| SignedTransactionRef {
                datastring: tx.datastring(),
                signature: tx.signature(),
            })
            .collect(),
        nonce,
    };
    let bytes = bincode::serialize(&fields)?;
    Ok(STANDARD.encode(bytes))
}

/// True when `hash` starts with `difficulty` `'0'` hex characters.
pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    id: u64,
    previous_hash: String,
    batch: TransactionBatch,
    nonce: u64,
    datastring: String,
    hash: String,
}

impl Block {
    /// Build an unmined block (nonce 0).
    pub fn construct(id: u64, previous_hash: impl Into<String>, batch: TransactionBatch) -> Result<Self> {
        Self::with_nonce(id, previous_hash.into(), batch, 0)
    }

    fn with_nonce(id: u64, previous_hash: String, batch: TransactionBatch, nonce: u64) -> Result<Self> {
        let datastring = encode_block(id, &previous_hash, &batch, nonce)?;
        let hash = sha256_hex(datastring.as_bytes());
        Ok(Block {
            id,
            previous_hash,
            batch,
            nonce,
            datastring,
            hash,
        })
    }

    /// Block 0: a single creation reward paid to the signer, unmined.
    pub fn create_genesis(signer: &KeyPair, config: &ChainConfig) -> Result<Self> {
        let reward = Transaction::mint(
            TransactionKind::CreationReward,
            signer,
            signer.address(),
            config.creation_reward,
            config,
        )?;
        Self::construct(0, GENESIS_PREVIOUS_HASH, TransactionBatch::reconstruct(vec![reward]))
    }

    /// Rebuild a stored block. The recomputed datastring and hash must match the supplied ones.
    pub fn from_datastring(datastring: &str, hash: &str, config: &ChainConfig) -> Result<Self> {
        let bytes = STANDARD.decode(datastring)?;
        let fields: BlockFields = bincode::deserialize(&bytes)?;

        let transactions = fields
            .transactions
            .iter()
            .map(|signed| Transaction::from_signed(signed, config))
            .collect::<Result<Vec<_>>>()?;

        let block = Self::with_nonce(
            fields.id,
            fields.previous_hash,
            TransactionBatch::reconstruct(transactions),
            fields.nonce,
        )?;

        if block.datastring != datastring {
            return Err(ChainError::DatastringMismatch);
        }
        if block.hash != hash {
            return Err(ChainError::HashMismatch {
                expected: block.hash,
                actual: hash.to_string(),
            });
        }
        Ok(block)
    }

    pub fn is_mined(&self, config: &ChainConfig) -> bool {
        meets_difficulty(&self.hash, config.difficulty)
    }

    /// Search nonces until the hash meets the difficulty target.
    ///
    /// Fails with `InvalidConfig` when the target can never be met.
    pub fn mine(&mut self, config: &ChainConfig) -> Result<()> {
        let never = AtomicBool::new(false);
        self.mine_until(config, &never).map(|_| ())
    }

    /// Like [`Block::mine`], checking `cancel` once per nonce.
    ///
    /// Returns `Ok(true)` once mined and `Ok(false)` when cancelled. A cancelled
    /// block keeps a consistent nonce, datastring and hash.
    pub fn mine_until(&mut self, config: &ChainConfig, cancel: &AtomicBool) -> Result<bool> {
        config.validate()?;
        while !self.is_mined(config) {
            if cancel.load(Ordering::Relaxed) {
                return Ok(false);
            }
            let nonce = self.nonce.wrapping_add(1);
            let datastring = encode_block(self.id, &self.previous_hash, &self.batch, nonce)?;
            self.hash = sha256_hex(datastring.as_bytes());
            self.datastring = datastring;
            self.nonce = nonce;
        }
        Ok(true)
    }

    /// Self-checks, then batch shape and proof-of-work for every block but genesis.
    pub fn validate(&self, config: &ChainConfig) -> Result<()> {
        let datastring = encode_block(self.id, &self.previous_hash, &self.batch, self.nonce)?;
        if datastring != self.datastring {
            return Err(ChainError::DatastringMismatch);
        }
        let hash = sha256_hex(self.datastring.as_bytes());
        if hash != self.hash {
            return Err(ChainError::HashMismatch {
                expected: hash,
                actual: self.hash.clone(),
            });
        }

        if self.is_genesis() {
            return Ok(());
        }

        self.batch.validate(config)?;
        if !self.is_mined(config) {
            return Err(ChainError::NotMined(self.id));
        }
        Ok(())
    }

    pub fn is_genesis(&self) -> bool {
        self.id == 0
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn batch(&self) -> &TransactionBatch {
        &self.batch
    }

    pub fn transactions(&self) -> &[Transaction] {
        self.batch.transactions()
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn datastring(&self) -> &str {
        &self.datastring
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }
}
