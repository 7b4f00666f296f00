//! Transaction validation rules
use crate::config::ChainConfig;
use crate::crypto::verify_signature;
use crate::error::{ChainError, Result};
use crate::transaction::types::{Transaction, TransactionData, TransactionKind};

impl Transaction {
    /// Validate a (datastring, signature) pair without building a transaction.
    ///
    /// Rules are checked in order and the first violation is returned: sender
    /// presence, signature, canonical encoding, key ownership, mint constraints,
    /// reward value.
    pub fn validate(datastring: &str, signature: &str, config: &ChainConfig) -> Result<()> {
        let data = TransactionData::decode(datastring)?;
        validate_fields(&data, datastring, signature, config)
    }

    /// Rebuild a transaction from its stored datastring and signature.
    pub fn reconstruct(datastring: &str, signature: &str, config: &ChainConfig) -> Result<Self> {
        let data = TransactionData::decode(datastring)?;
        validate_fields(&data, datastring, signature, config)?;

        Ok(Transaction {
            data,
            datastring: datastring.to_string(),
            signature: signature.to_string(),
        })
    }

    /// Re-run validation on an already constructed transaction.
    pub fn verify(&self, config: &ChainConfig) -> Result<()> {
        Self::validate(&self.datastring, &self.signature, config)
    }
}

fn validate_fields(
    data: &TransactionData,
    datastring: &str,
    signature: &str,
    config: &ChainConfig,
) -> Result<()> {
    if data.kind.requires_sender() && data.sender.is_none() {
        return Err(ChainError::MissingSender(data.kind.to_string()));
    }

    verify_signature(&data.public_key, datastring.as_bytes(), signature)?;

    // The decoded fields must re-encode to exactly the signed text.
    if data.encode()? != datastring {
        return Err(ChainError::DatastringMismatch);
    }

    if data.kind.requires_sender() {
        if let Some(sender) = &data.sender {
            if !sender.is_owned_by(&data.public_key) {
                return Err(ChainError::OwnershipMismatch {
                    sender: sender.to_string(),
                    public_key: data.public_key.clone(),
                });
            }
        }
    }

    if data.kind.is_mint() {
        if data.sender.is_some() {
            return Err(ChainError::UnexpectedSender(data.kind.to_string()));
        }
        if data.fee != 0 {
            return Err(ChainError::InvalidFeeOnMint(data.kind.to_string()));
        }
    }

    if data.kind == TransactionKind::CreationReward && data.value != config.creation_reward {
        return Err(ChainError::InvalidRewardValue {
            expected: config.creation_reward,
            actual: data.value,
        });
    }

    Ok(())
}
