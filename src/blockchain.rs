// Thin re-export module: implementation is in `blockchain/core.rs`, split into
// batch, block, chain, ledger state and validation submodules.

pub mod core;
pub use core::*;
