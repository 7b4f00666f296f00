//! PowChain - a minimal proof-of-work ledger with signed, canonically encoded transactions
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Transaction batches, blocks, chain linkage and balances
//! - [`transaction`] - Transaction types, signing and validation
//! - [`mempool`] - Pending transaction pool and selection policies
//!
//! ## Mining
//! - [`miner`] - Block assembly and cancellable proof-of-work
//!
//! ## Cryptography
//! - [`crypto`] - Addresses, key pairs and signatures (secp256k1)
//!
//! ## State Management
//! - [`wallet`] - Named wallet files
//! - [`persistence`] - Database layer (SQLite)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - [`cli`] - CLI utilities

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod mempool;
pub mod transaction;

// ============================================================================
// Mining
// ============================================================================
pub mod miner;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// State Management
// ============================================================================
pub mod persistence;
pub mod wallet;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod cli;
pub mod config;
pub mod error;
