use crate::config::ChainConfig;
use crate::crypto::{Address, KeyPair};
use crate::error::{ChainError, Result};
use crate::transaction::{Transaction, TransactionKind};

/// One block's payload: `[creation reward, ...payload, fee]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionBatch {
    transactions: Vec<Transaction>,
}

impl TransactionBatch {
    /// Bracket `payload` with a reward and a fee entry paid to the miner.
    ///
    /// The recipient is `miner_address` when given, otherwise the signer's own
    /// address. The result must satisfy the batch invariants for `config`.
    pub fn create(
        signer: &KeyPair,
        miner_address: Option<Address>,
        payload: Vec<Transaction>,
        config: &ChainConfig,
    ) -> Result<Self> {
        let recipient = miner_address.unwrap_or_else(|| signer.address());

        let total_fee = total_fees(&payload).ok_or_else(|| {
            ChainError::InvalidTransaction("payload fee total overflows".to_string())
        })?;

        let reward = Transaction::mint(
            TransactionKind::CreationReward,
            signer,
            recipient.clone(),
            config.creation_reward,
            config,
        )?;
        let fee = Transaction::mint(TransactionKind::Fee, signer, recipient, total_fee, config)?;

        let mut transactions = Vec::with_capacity(payload.len() + 2);
        transactions.push(reward);
        transactions.extend(payload);
        transactions.push(fee);

        let batch = TransactionBatch { transactions };
        batch.validate(config)?;
        Ok(batch)
    }

    /// Wrap an already assembled sequence, e.g. one rebuilt from storage.
    pub fn reconstruct(transactions: Vec<Transaction>) -> Self {
        TransactionBatch { transactions }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn get(&self, index: usize) -> Option<&Transaction> {
        self.transactions.get(index)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Entries strictly between the reward and the fee.
    pub fn payload(&self) -> &[Transaction] {
        match self.transactions.len() {
            0..=2 => &[],
            n => &self.transactions[1..n - 1],
        }
    }
}

/// Sum of fees, `None` on overflow.
pub(crate) fn total_fees(transactions: &[Transaction]) -> Option<u64> {
    transactions
        .iter()
        .try_fold(0u64, |acc, tx| acc.checked_add(tx.fee()))
}
