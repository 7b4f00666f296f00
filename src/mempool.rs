//! Pending transaction pool

use crate::blockchain::Block;
use crate::error::{ChainError, Result};
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// Capacity of [`Mempool::new`].
pub const DEFAULT_MAX_TRANSACTIONS: usize = 10_000;

/// Order in which pending transactions are picked for a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Every transaction at or above the pool's lowest fee, lowest fee first.
    #[default]
    MinimumFeeThreshold,
    /// Largest fee first, ties broken by age.
    HighestFeeFirst,
}

/// Validated transactions waiting to be mined, keyed by transaction id.
///
/// Admission rejects mint kinds, duplicates and anything past capacity.
#[derive(Debug, Clone)]
pub struct Mempool {
    transactions: HashMap<String, Transaction>,
    max_transactions: usize,
}

impl Default for Mempool {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_TRANSACTIONS)
    }
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty pool holding at most `max_transactions` entries.
    pub fn with_capacity(max_transactions: usize) -> Self {
        Mempool {
            transactions: HashMap::new(),
            max_transactions,
        }
    }

    /// Admit a user transaction. Reward and fee entries are only ever synthesized by a miner.
    pub fn add_transaction(&mut self, tx: Transaction) -> Result<()> {
        if tx.kind().is_mint() {
            return Err(ChainError::InvalidTransaction(format!(
                "{} transactions cannot be submitted to the pool",
                tx.kind()
            )));
        }

        let id = tx.id();
        if self.transactions.contains_key(&id) {
            return Err(ChainError::DuplicateTransaction(id));
        }
        if self.transactions.len() >= self.max_transactions {
            return Err(ChainError::MempoolFull);
        }

        debug!(tx_id = %id, fee = tx.fee(), "Transaction added to mempool");
        self.transactions.insert(id, tx);
        Ok(())
    }

    /// Remove and return the transaction with `id`.
    pub fn remove_transaction(&mut self, id: &str) -> Option<Transaction> {
        self.transactions.remove(id)
    }

    /// Drop every pending transaction that `block` includes.
    pub fn remove_included(&mut self, block: &Block) -> usize {
        block
            .transactions()
            .iter()
            .filter(|tx| self.transactions.remove(&tx.id()).is_some())
            .count()
    }

    pub fn get_transaction(&self, id: &str) -> Option<&Transaction> {
        self.transactions.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.transactions.contains_key(id)
    }

    /// All pending transactions, oldest first.
    pub fn get_all_transactions(&self) -> Vec<Transaction> {
        let mut all: Vec<Transaction> = self.transactions.values().cloned().collect();
        all.sort_by(|a, b| by_age(a, b));
        all
    }

    /// Lowest fee currently pending, `None` for an empty pool.
    pub fn minimum_fee(&self) -> Option<u64> {
        self.transactions.values().map(Transaction::fee).min()
    }

    /// Up to `count` transactions in `policy` order.
    pub fn select(&self, policy: SelectionPolicy, count: usize) -> Vec<Transaction> {
        let mut candidates: Vec<&Transaction> = match policy {
            SelectionPolicy::MinimumFeeThreshold => {
                let Some(threshold) = self.minimum_fee() else {
                    return Vec::new();
                };
                self.transactions
                    .values()
                    .filter(|tx| tx.fee() >= threshold)
                    .collect()
            }
            SelectionPolicy::HighestFeeFirst => self.transactions.values().collect(),
        };

        candidates.sort_by(|a, b| {
            let by_fee = match policy {
                SelectionPolicy::MinimumFeeThreshold => a.fee().cmp(&b.fee()),
                SelectionPolicy::HighestFeeFirst => b.fee().cmp(&a.fee()),
            };
            by_fee.then_with(|| by_age(a, b))
        });

        candidates.into_iter().take(count).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

fn by_age(a: &Transaction, b: &Transaction) -> Ordering {
    a.timestamp()
        .cmp(&b.timestamp())
        .then_with(|| a.id().cmp(&b.id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainConfig;
    use crate::crypto::KeyPair;
    use crate::transaction::{TransactionData, TransactionKind};
    use chrono::{Duration, TimeZone, Utc};

    fn transfer_at(fee: u64, seconds: i64) -> Transaction {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(seconds);
        let data = TransactionData::new(
            TransactionKind::Transfer,
            Some(alice.address()),
            bob.address(),
            alice.public_key_hex(),
            10,
            fee,
        )
        .with_timestamp(at);
        Transaction::create(data, &alice, &ChainConfig::default()).unwrap()
    }

    #[test]
    fn test_add_and_remove() {
        let mut pool = Mempool::new();
        let tx = transfer_at(1, 0);
        let id = tx.id();

        pool.add_transaction(tx.clone()).unwrap();
        assert_eq!(pool.len(), 1);
        assert!(pool.contains(&id));
        assert_eq!(pool.get_transaction(&id), Some(&tx));

        assert_eq!(pool.remove_transaction(&id), Some(tx));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut pool = Mempool::new();
        let tx = transfer_at(1, 0);
        pool.add_transaction(tx.clone()).unwrap();
        assert!(matches!(
            pool.add_transaction(tx),
            Err(ChainError::DuplicateTransaction(_))
        ));
    }

    #[test]
    fn test_capacity_bound() {
        let mut pool = Mempool::with_capacity(2);
        pool.add_transaction(transfer_at(1, 0)).unwrap();
        pool.add_transaction(transfer_at(2, 1)).unwrap();
        assert_eq!(
            pool.add_transaction(transfer_at(3, 2)),
            Err(ChainError::MempoolFull)
        );
    }

    #[test]
    fn test_mint_kinds_refused() {
        let miner = KeyPair::generate();
        let reward = Transaction::mint(
            TransactionKind::CreationReward,
            &miner,
            miner.address(),
            100,
            &ChainConfig::default(),
        )
        .unwrap();

        let mut pool = Mempool::new();
        assert!(matches!(
            pool.add_transaction(reward),
            Err(ChainError::InvalidTransaction(_))
        ));
    }

    #[test]
    fn test_minimum_fee_threshold_prefers_low_fees() {
        let mut pool = Mempool::new();
        let cheap = transfer_at(1, 5);
        let pricey = transfer_at(9, 0);
        let middle = transfer_at(4, 1);
        for tx in [&cheap, &pricey, &middle] {
            pool.add_transaction((*tx).clone()).unwrap();
        }

        assert_eq!(pool.minimum_fee(), Some(1));
        let picked = pool.select(SelectionPolicy::MinimumFeeThreshold, 2);
        assert_eq!(picked, vec![cheap, middle]);
    }

    #[test]
    fn test_highest_fee_first() {
        let mut pool = Mempool::new();
        let cheap = transfer_at(1, 0);
        let pricey = transfer_at(9, 1);
        pool.add_transaction(cheap.clone()).unwrap();
        pool.add_transaction(pricey.clone()).unwrap();

        let picked = pool.select(SelectionPolicy::HighestFeeFirst, 5);
        assert_eq!(picked, vec![pricey, cheap]);
    }

    #[test]
    fn test_equal_fees_ordered_by_timestamp() {
        let mut pool = Mempool::new();
        let later = transfer_at(3, 10);
        let earlier = transfer_at(3, 2);
        pool.add_transaction(later.clone()).unwrap();
        pool.add_transaction(earlier.clone()).unwrap();

        for policy in [
            SelectionPolicy::MinimumFeeThreshold,
            SelectionPolicy::HighestFeeFirst,
        ] {
            assert_eq!(pool.select(policy, 1), vec![earlier.clone()]);
        }
        assert_eq!(pool.get_all_transactions(), vec![earlier, later]);
    }

    #[test]
    fn test_select_from_empty_pool() {
        let pool = Mempool::new();
        assert!(pool.select(SelectionPolicy::MinimumFeeThreshold, 1).is_empty());
        assert_eq!(pool.minimum_fee(), None);
    }
}
