//! Block assembly and proof-of-work mining

use crate::blockchain::{Block, Chain, TransactionBatch};
use crate::config::ChainConfig;
use crate::crypto::{Address, KeyPair};
use crate::error::{ChainError, Result};
use crate::mempool::Mempool;
use crate::transaction::Transaction;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Pick exactly `block_size` pending transactions according to the configured policy.
pub fn select_payload(mempool: &Mempool, config: &ChainConfig) -> Result<Vec<Transaction>> {
    let payload = mempool.select(config.selection_policy, config.block_size);
    if payload.len() < config.block_size {
        return Err(ChainError::NotEnoughPending {
            needed: config.block_size,
            available: mempool.len(),
        });
    }
    Ok(payload)
}

/// Wrap `payload` into the next unmined block on top of `chain`.
pub fn build_block(
    chain: &Chain,
    signer: &KeyPair,
    miner_address: Option<Address>,
    payload: Vec<Transaction>,
) -> Result<Block> {
    let batch = TransactionBatch::create(signer, miner_address, payload, chain.config())?;
    Block::construct(chain.len() as u64, chain.most_recent().hash(), batch)
}

/// Mine `block` to completion, then validate it.
pub fn mine_block(mut block: Block, config: &ChainConfig) -> Result<Block> {
    let started = Instant::now();
    block.mine(config)?;
    block.validate(config)?;
    info!(
        id = block.id(),
        nonce = block.nonce(),
        hash = %block.hash(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Mined block"
    );
    Ok(block)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiningOutcome {
    Mined(Block),
    Cancelled,
}

/// Proof-of-work search running on a background thread.
///
/// Dropping the job cancels the search and joins the thread.
pub struct MiningJob {
    cancel: Arc<AtomicBool>,
    receiver: Receiver<Result<MiningOutcome>>,
    handle: Option<JoinHandle<()>>,
}

impl MiningJob {
    /// Start mining `block` on its own thread. Configuration errors surface from `wait`.
    pub fn spawn(mut block: Block, config: ChainConfig) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let (sender, receiver) = bounded(1);
        let flag = Arc::clone(&cancel);

        let handle = thread::spawn(move || {
            debug!(id = block.id(), difficulty = config.difficulty, "Mining started");
            let outcome = match block.mine_until(&config, &flag) {
                Ok(true) => block.validate(&config).map(|()| MiningOutcome::Mined(block)),
                Ok(false) => Ok(MiningOutcome::Cancelled),
                Err(e) => Err(e),
            };
            // The receiver may already be gone if the job was dropped.
            let _ = sender.send(outcome);
        });

        MiningJob {
            cancel,
            receiver,
            handle: Some(handle),
        }
    }

    /// Ask the search to stop at its next nonce.
    pub fn cancel(&self) {
        if !self.cancel.swap(true, Ordering::Relaxed) {
            info!("Mining cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Block until the search finishes or is cancelled.
    pub fn wait(mut self) -> Result<MiningOutcome> {
        let outcome = self
            .receiver
            .recv()
            .map_err(|e| ChainError::MiningWorker(e.to_string()))?;
        self.join();
        outcome
    }

    /// Wait at most `timeout`; on expiry the search is cancelled and `Cancelled` is returned.
    pub fn wait_timeout(mut self, timeout: Duration) -> Result<MiningOutcome> {
        let outcome = match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "Mining timed out");
                self.cancel();
                // A block found in the same instant still wins.
                self.receiver
                    .recv()
                    .map_err(|e| ChainError::MiningWorker(e.to_string()))?
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(ChainError::MiningWorker(
                    "mining thread exited without a result".to_string(),
                ))
            }
        };
        self.join();
        outcome
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Mining thread panicked");
            }
        }
    }
}

impl Drop for MiningJob {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        self.join();
    }
}
