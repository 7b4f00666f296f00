//! Transaction types for PowChain
use crate::config::ChainConfig;
use crate::crypto::{sha256_hex, Address, KeyPair};
use crate::error::Result;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind tag of a transaction. The variant order is part of the canonical encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    Transfer,
    CreationReward,
    Fee,
    PublishContract,
    ExecuteContract,
}

impl TransactionKind {
    /// Reward and fee entries are minted by the block producer and carry no sender.
    pub fn is_mint(self) -> bool {
        matches!(self, TransactionKind::CreationReward | TransactionKind::Fee)
    }

    pub fn requires_sender(self) -> bool {
        !self.is_mint()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Transfer => "transfer",
            TransactionKind::CreationReward => "creationReward",
            TransactionKind::Fee => "fee",
            TransactionKind::PublishContract => "publishContract",
            TransactionKind::ExecuteContract => "executeContract",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The signed field set of a transaction, in canonical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionData {
    pub kind: TransactionKind,
    /// Unix milliseconds
    pub timestamp: i64,
    pub sender: Option<Address>,
    pub recipient: Address,
    /// Compressed public key of the signer, lowercase hex
    pub public_key: String,
    pub value: u64,
    pub fee: u64,
    pub message: Option<String>,
}

impl TransactionData {
    pub fn new(
        kind: TransactionKind,
        sender: Option<Address>,
        recipient: Address,
        public_key: impl Into<String>,
        value: u64,
        fee: u64,
    ) -> Self {
        TransactionData {
            kind,
            timestamp: Utc::now().timestamp_millis(),
            sender,
            recipient,
            public_key: public_key.into(),
            value,
            fee,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp.timestamp_millis();
        self
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }

    /// Canonical datastring: bincode of the field set, base64 wrapped.
    pub fn encode(&self) -> Result<String> {
        let bytes = bincode::serialize(self)?;
        Ok(STANDARD.encode(bytes))
    }

    pub fn decode(datastring: &str) -> Result<Self> {
        let bytes = STANDARD.decode(datastring)?;
        Ok(bincode::deserialize(&bytes)?)
    }
}

/// Storage and transport form of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub datastring: String,
    pub signature: String,
}

/// A validated, immutable transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub(crate) data: TransactionData,
    pub(crate) datastring: String,
    pub(crate) signature: String,
}

impl Transaction {
    /// Encode `data`, sign the datastring with `signer` and run the full validation.
    pub fn create(data: TransactionData, signer: &KeyPair, config: &ChainConfig) -> Result<Self> {
        let datastring = data.encode()?;
        let signature = signer.sign(datastring.as_bytes());
        Self::validate(&datastring, &signature, config)?;

        Ok(Transaction {
            data,
            datastring,
            signature,
        })
    }

    /// A transfer from the signer's own address.
    pub fn transfer(
        signer: &KeyPair,
        recipient: Address,
        value: u64,
        fee: u64,
        message: Option<String>,
        config: &ChainConfig,
    ) -> Result<Self> {
        let mut data = TransactionData::new(
            TransactionKind::Transfer,
            Some(signer.address()),
            recipient,
            signer.public_key_hex(),
            value,
            fee,
        );
        data.message = message;
        Self::create(data, signer, config)
    }

    /// A sender-less reward or fee entry signed by the block producer.
    pub fn mint(
        kind: TransactionKind,
        signer: &KeyPair,
        recipient: Address,
        value: u64,
        config: &ChainConfig,
    ) -> Result<Self> {
        let data = TransactionData::new(kind, None, recipient, signer.public_key_hex(), value, 0);
        Self::create(data, signer, config)
    }

    pub fn from_signed(signed: &SignedTransaction, config: &ChainConfig) -> Result<Self> {
        Self::reconstruct(&signed.datastring, &signed.signature, config)
    }

    pub fn to_signed(&self) -> SignedTransaction {
        SignedTransaction {
            datastring: self.datastring.clone(),
            signature: self.signature.clone(),
        }
    }

    /// Lowercase hex SHA-256 of the datastring.
    pub fn id(&self) -> String {
        sha256_hex(self.datastring.as_bytes())
    }

    pub fn data(&self) -> &TransactionData {
        &self.data
    }

    pub fn kind(&self) -> TransactionKind {
        self.data.kind
    }

    pub fn sender(&self) -> Option<&Address> {
        self.data.sender.as_ref()
    }

    pub fn recipient(&self) -> &Address {
        &self.data.recipient
    }

    pub fn public_key(&self) -> &str {
        &self.data.public_key
    }

    pub fn value(&self) -> u64 {
        self.data.value
    }

    pub fn fee(&self) -> u64 {
        self.data.fee
    }

    pub fn message(&self) -> Option<&str> {
        self.data.message.as_deref()
    }

    pub fn timestamp(&self) -> i64 {
        self.data.timestamp
    }

    pub fn datastring(&self) -> &str {
        &self.datastring
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }
}
