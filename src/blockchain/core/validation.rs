use crate::blockchain::core::batch::{total_fees, TransactionBatch};
use crate::blockchain::core::block::Block;
use crate::config::ChainConfig;
use crate::error::{ChainError, Result};
use crate::transaction::TransactionKind;

impl TransactionBatch {
    /// Check length, boundary kinds, boundary values and each entry, stopping at the first violation.
    pub fn validate(&self, config: &ChainConfig) -> Result<()> {
        let transactions = self.transactions();
        if transactions.len() != config.batch_len() {
            return Err(ChainError::InvalidBatchLength {
                expected: config.batch_len(),
                actual: transactions.len(),
            });
        }

        let (first, last) = match (transactions.first(), transactions.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(ChainError::InvalidBatchLength {
                    expected: config.batch_len(),
                    actual: 0,
                })
            }
        };

        if first.kind() != TransactionKind::CreationReward {
            return Err(ChainError::InvalidBatchBoundaryKind {
                position: "first",
                expected: TransactionKind::CreationReward.to_string(),
                actual: first.kind().to_string(),
            });
        }
        if last.kind() != TransactionKind::Fee {
            return Err(ChainError::InvalidBatchBoundaryKind {
                position: "last",
                expected: TransactionKind::Fee.to_string(),
                actual: last.kind().to_string(),
            });
        }

        if first.value() != config.creation_reward {
            return Err(ChainError::InvalidBatchReward {
                expected: config.creation_reward,
                actual: first.value(),
            });
        }

        let expected_fee = total_fees(self.payload()).ok_or(ChainError::InvalidBatchFee {
            expected: u64::MAX,
            actual: last.value(),
        })?;
        if last.value() != expected_fee {
            return Err(ChainError::InvalidBatchFee {
                expected: expected_fee,
                actual: last.value(),
            });
        }

        for tx in transactions {
            tx.verify(config)?;
        }

        Ok(())
    }
}

/// Linkage rules between two adjacent blocks; `index` is the position of `current`.
pub fn validate_link(
    previous: &Block,
    current: &Block,
    index: usize,
    config: &ChainConfig,
) -> Result<()> {
    if current.id() != previous.id() + 1 {
        return Err(ChainError::ChainLinkageBroken {
            index,
            reason: format!(
                "expected block id {}, found {}",
                previous.id() + 1,
                current.id()
            ),
        });
    }

    current.validate(config)?;

    if current.previous_hash() != previous.hash() {
        return Err(ChainError::ChainLinkageBroken {
            index,
            reason: format!(
                "previous hash {} does not match hash {} of block {}",
                current.previous_hash(),
                previous.hash(),
                previous.id()
            ),
        });
    }

    Ok(())
}
