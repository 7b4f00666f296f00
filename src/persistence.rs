//! Database persistence layer for PowChain

use crate::blockchain::{Block, Chain};
use crate::config::ChainConfig;
use crate::error::{ChainError, Result};
use crate::mempool::Mempool;
use crate::transaction::{SignedTransaction, Transaction};
use rusqlite::{params, Connection};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Storage backend for mined blocks and pending transactions.
///
/// Blocks are stored in their datastring form and come back through
/// [`Block::from_datastring`], so a corrupted record fails to load.
pub trait Persistence: Send + Sync {
    /// Store `block` and drop its transactions from the pending set, atomically.
    fn save_block(&self, block: &Block) -> Result<()>;
    /// All stored blocks in ascending id order.
    fn load_blocks(&self, config: &ChainConfig) -> Result<Vec<Block>>;
    fn save_pending(&self, tx: &Transaction) -> Result<()>;
    fn load_pending(&self, config: &ChainConfig) -> Result<Vec<Transaction>>;
    fn remove_pending(&self, tx_id: &str) -> Result<()>;

    /// `None` when nothing has been stored yet.
    fn load_chain(&self, config: &ChainConfig) -> Result<Option<Chain>> {
        let blocks = self.load_blocks(config)?;
        if blocks.is_empty() {
            return Ok(None);
        }
        Chain::from_blocks(blocks, config.clone()).map(Some)
    }

    fn load_mempool(&self, config: &ChainConfig) -> Result<Mempool> {
        let mut mempool = Mempool::new();
        for tx in self.load_pending(config)? {
            mempool.add_transaction(tx)?;
        }
        Ok(mempool)
    }
}

fn poisoned<T>(_: T) -> ChainError {
    ChainError::DatabaseError("Mutex poisoned".to_string())
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the SQLite file at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| ChainError::DatabaseError(format!("Failed to open database: {}", e)))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS blocks (
                id INTEGER PRIMARY KEY,
                hash TEXT NOT NULL UNIQUE,
                previous_hash TEXT NOT NULL,
                nonce INTEGER NOT NULL,
                datastring TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS block_transactions (
                block_id INTEGER NOT NULL REFERENCES blocks(id),
                position INTEGER NOT NULL,
                tx_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                sender TEXT,
                recipient TEXT NOT NULL,
                value INTEGER NOT NULL,
                fee INTEGER NOT NULL,
                datastring TEXT NOT NULL,
                signature TEXT NOT NULL,
                PRIMARY KEY (block_id, position)
            );
            CREATE TABLE IF NOT EXISTS pending_transactions (
                tx_id TEXT PRIMARY KEY,
                fee INTEGER NOT NULL,
                timestamp INTEGER NOT NULL,
                datastring TEXT NOT NULL,
                signature TEXT NOT NULL
            );",
        )
        .map_err(|e| ChainError::DatabaseError(format!("Failed to create tables: {}", e)))?;

        debug!(path = %path.display(), "Database opened");
        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    /// Number of stored blocks.
    pub fn block_count(&self) -> Result<u64> {
        let conn = self.conn.lock().map_err(poisoned)?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM blocks", [], |row| row.get(0))
            .map_err(|e| ChainError::DatabaseError(format!("Failed to count blocks: {}", e)))?;
        Ok(count as u64)
    }
}

impl Persistence for Database {
    fn save_block(&self, block: &Block) -> Result<()> {
        let conn = self.conn.lock().map_err(poisoned)?;
        let tx = conn.unchecked_transaction().map_err(|e| {
            ChainError::DatabaseError(format!("Failed to start transaction: {}", e))
        })?;

        tx.execute(
            "INSERT INTO blocks (id, hash, previous_hash, nonce, datastring)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                block.id() as i64,
                block.hash(),
                block.previous_hash(),
                block.nonce() as i64,
                block.datastring(),
            ],
        )
        .map_err(|e| ChainError::DatabaseError(format!("Failed to save block {}: {}", block.id(), e)))?;

        for (position, entry) in block.transactions().iter().enumerate() {
            let tx_id = entry.id();
            tx.execute(
                "INSERT INTO block_transactions
                    (block_id, position, tx_id, kind, sender, recipient, value, fee, datastring, signature)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    block.id() as i64,
                    position as i64,
                    tx_id,
                    entry.kind().as_str(),
                    entry.sender().map(|s| s.as_str()),
                    entry.recipient().as_str(),
                    entry.value() as i64,
                    entry.fee() as i64,
                    entry.datastring(),
                    entry.signature(),
                ],
            )
            .map_err(|e| {
                ChainError::DatabaseError(format!("Failed to save block transaction: {}", e))
            })?;

            tx.execute(
                "DELETE FROM pending_transactions WHERE tx_id = ?1",
                params![tx_id],
            )
            .map_err(|e| {
                ChainError::DatabaseError(format!("Failed to clear pending transaction: {}", e))
            })?;
        }

        tx.commit().map_err(|e| {
            ChainError::DatabaseError(format!("Failed to commit transaction: {}", e))
        })?;

        info!(id = block.id(), hash = %block.hash(), "Block persisted");
        Ok(())
    }

    fn load_blocks(&self, config: &ChainConfig) -> Result<Vec<Block>> {
        let conn = self.conn.lock().map_err(poisoned)?;
        let mut stmt = conn
            .prepare("SELECT id, hash, datastring FROM blocks ORDER BY id ASC")
            .map_err(|e| ChainError::DatabaseError(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                let id: i64 = row.get(0)?;
                let hash: String = row.get(1)?;
                let datastring: String = row.get(2)?;
                Ok((id, hash, datastring))
            })
            .map_err(|e| ChainError::DatabaseError(format!("Failed to query blocks: {}", e)))?;

        let mut blocks = Vec::new();
        for row in rows {
            let (id, hash, datastring) = row
                .map_err(|e| ChainError::DatabaseError(format!("Failed to read row: {}", e)))?;
            let block = Block::from_datastring(&datastring, &hash, config)?;
            if block.id() as i64 != id {
                return Err(ChainError::DatabaseError(format!(
                    "Block stored under id {} decodes to id {}",
                    id,
                    block.id()
                )));
            }
            blocks.push(block);
        }

        debug!(count = blocks.len(), "Loaded blocks");
        Ok(blocks)
    }

    fn save_pending(&self, tx: &Transaction) -> Result<()> {
        let conn = self.conn.lock().map_err(poisoned)?;
        let tx_id = tx.id();
        conn.execute(
            "INSERT INTO pending_transactions (tx_id, fee, timestamp, datastring, signature)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                tx_id,
                tx.fee() as i64,
                tx.timestamp(),
                tx.datastring(),
                tx.signature(),
            ],
        )
        .map_err(|e| {
            ChainError::DatabaseError(format!("Failed to save pending transaction: {}", e))
        })?;

        debug!(tx_id = %tx_id, "Pending transaction persisted");
        Ok(())
    }

    fn load_pending(&self, config: &ChainConfig) -> Result<Vec<Transaction>> {
        let conn = self.conn.lock().map_err(poisoned)?;
        let mut stmt = conn
            .prepare(
                "SELECT datastring, signature FROM pending_transactions
                 ORDER BY timestamp ASC, tx_id ASC",
            )
            .map_err(|e| ChainError::DatabaseError(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(SignedTransaction {
                    datastring: row.get(0)?,
                    signature: row.get(1)?,
                })
            })
            .map_err(|e| {
                ChainError::DatabaseError(format!("Failed to query pending transactions: {}", e))
            })?;

        let mut pending = Vec::new();
        for row in rows {
            let signed = row
                .map_err(|e| ChainError::DatabaseError(format!("Failed to read row: {}", e)))?;
            pending.push(Transaction::from_signed(&signed, config)?);
        }
        Ok(pending)
    }

    fn remove_pending(&self, tx_id: &str) -> Result<()> {
        let conn = self.conn.lock().map_err(poisoned)?;
        conn.execute(
            "DELETE FROM pending_transactions WHERE tx_id = ?1",
            params![tx_id],
        )
        .map_err(|e| {
            ChainError::DatabaseError(format!("Failed to remove pending transaction: {}", e))
        })?;
        Ok(())
    }
}

/// Simple in-memory persistence implementation useful for tests and ephemeral runs.
#[derive(Clone, Default)]
pub struct InMemoryPersistence {
    blocks: Arc<Mutex<BTreeMap<u64, Block>>>,
    pending: Arc<Mutex<Vec<Transaction>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persistence for InMemoryPersistence {
    fn save_block(&self, block: &Block) -> Result<()> {
        let mut blocks = self.blocks.lock().map_err(poisoned)?;
        let mut pending = self.pending.lock().map_err(poisoned)?;

        if blocks.contains_key(&block.id()) {
            return Err(ChainError::DatabaseError(format!(
                "Block {} already stored",
                block.id()
            )));
        }

        let included: HashSet<String> = block.transactions().iter().map(Transaction::id).collect();
        pending.retain(|tx| !included.contains(&tx.id()));
        blocks.insert(block.id(), block.clone());
        Ok(())
    }

    fn load_blocks(&self, config: &ChainConfig) -> Result<Vec<Block>> {
        let blocks = self.blocks.lock().map_err(poisoned)?;
        blocks
            .values()
            .map(|block| Block::from_datastring(block.datastring(), block.hash(), config))
            .collect()
    }

    fn save_pending(&self, tx: &Transaction) -> Result<()> {
        let mut pending = self.pending.lock().map_err(poisoned)?;
        if pending.iter().any(|p| p.id() == tx.id()) {
            return Err(ChainError::DuplicateTransaction(tx.id()));
        }
        pending.push(tx.clone());
        Ok(())
    }

    fn load_pending(&self, config: &ChainConfig) -> Result<Vec<Transaction>> {
        let pending = self.pending.lock().map_err(poisoned)?;
        pending
            .iter()
            .map(|tx| Transaction::reconstruct(tx.datastring(), tx.signature(), config))
            .collect()
    }

    fn remove_pending(&self, tx_id: &str) -> Result<()> {
        let mut pending = self.pending.lock().map_err(poisoned)?;
        pending.retain(|tx| tx.id() != tx_id);
        Ok(())
    }
}
