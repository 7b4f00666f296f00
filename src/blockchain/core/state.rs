use crate::blockchain::core::block::Block;
use crate::blockchain::core::chain::Chain;
use crate::crypto::Address;
use crate::transaction::Transaction;
use std::collections::HashMap;

/// Per-address balances folded from a chain.
///
/// Recipients are credited `value`, senders (when present) are debited
/// `value`. Fees are not moved here: they reach the miner through the
/// block's `Fee` entry. Balances can go negative since spendability is not
/// enforced by the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerState {
    pub balances: HashMap<Address, i128>,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_chain(chain: &Chain) -> Self {
        let mut state = Self::new();
        for block in chain.blocks() {
            state.apply_block(block);
        }
        state
    }

    pub fn apply_block(&mut self, block: &Block) {
        for tx in block.transactions() {
            self.apply_transaction(tx);
        }
    }

    pub fn apply_transaction(&mut self, tx: &Transaction) {
        let value = i128::from(tx.value());
        *self.balances.entry(tx.recipient().clone()).or_insert(0) += value;
        if let Some(sender) = tx.sender() {
            *self.balances.entry(sender.clone()).or_insert(0) -= value;
        }
    }

    /// Zero for addresses that never appeared.
    pub fn get_balance(&self, address: &Address) -> i128 {
        self.balances.get(address).copied().unwrap_or(0)
    }
}
