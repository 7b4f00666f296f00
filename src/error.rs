//! Error types for PowChain

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Signature verification failed")]
    SignatureInvalid,
    #[error("Sender {sender} does not own public key {public_key}")]
    OwnershipMismatch { sender: String, public_key: String },
    #[error("Transaction of kind {0} requires a sender")]
    MissingSender(String),
    #[error("Transaction of kind {0} cannot have a sender")]
    UnexpectedSender(String),
    #[error("Creation reward must be {expected}, got {actual}")]
    InvalidRewardValue { expected: u64, actual: u64 },
    #[error("Fee must be 0 for transactions of kind {0}")]
    InvalidFeeOnMint(String),
    #[error("Datastring mismatch: recomputed encoding differs from the supplied one")]
    DatastringMismatch,
    #[error("Hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },
    #[error("Transaction batch must hold {expected} transactions, got {actual}")]
    InvalidBatchLength { expected: usize, actual: usize },
    #[error("Transaction batch {position} entry must be {expected}, got {actual}")]
    InvalidBatchBoundaryKind {
        position: &'static str,
        expected: String,
        actual: String,
    },
    #[error("Batch creation reward must be {expected}, got {actual}")]
    InvalidBatchReward { expected: u64, actual: u64 },
    #[error("Batch fee entry must be {expected}, got {actual}")]
    InvalidBatchFee { expected: u64, actual: u64 },
    #[error("Block {0} hasn't been mined")]
    NotMined(u64),
    #[error("Chain linkage broken at index {index}: {reason}")]
    ChainLinkageBroken { index: usize, reason: String },
    #[error("Malformed datastring: {0}")]
    MalformedDatastring(String),
    #[error("Cryptographic error: {0}")]
    CryptoError(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Wallet error: {0}")]
    WalletError(String),
    #[error("Mempool is full")]
    MempoolFull,
    #[error("Transaction {0} is already pending")]
    DuplicateTransaction(String),
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("Not enough pending transactions: need {needed}, have {available}")]
    NotEnoughPending { needed: usize, available: usize },
    #[error("Mining worker failed: {0}")]
    MiningWorker(String),
    #[error("Chain has not been initialized with a genesis block")]
    ChainNotInitialized,
    #[error("Block not found: {0}")]
    BlockNotFound(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for ChainError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        ChainError::MalformedDatastring(err.to_string())
    }
}

impl From<base64::DecodeError> for ChainError {
    fn from(err: base64::DecodeError) -> Self {
        ChainError::MalformedDatastring(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::WalletError(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::InvalidConfig(err.to_string())
    }
}

impl From<rusqlite::Error> for ChainError {
    fn from(err: rusqlite::Error) -> Self {
        ChainError::DatabaseError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
