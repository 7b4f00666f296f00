use crate::blockchain::core::block::Block;
use crate::blockchain::core::state::LedgerState;
use crate::blockchain::core::validation::validate_link;
use crate::config::ChainConfig;
use crate::crypto::Address;
use crate::error::{ChainError, Result};
use tracing::{debug, info, warn};

/// Ordered, append-only sequence of blocks starting at a validated genesis block.
#[derive(Debug, Clone)]
pub struct Chain {
    config: ChainConfig,
    blocks: Vec<Block>,
}

impl Chain {
    /// Start a chain from `genesis`, which must be block 0 and pass validation.
    pub fn initialize(genesis: Block, config: ChainConfig) -> Result<Self> {
        config.validate()?;

        if genesis.id() != 0 {
            return Err(ChainError::ChainLinkageBroken {
                index: 0,
                reason: format!("genesis block must have id 0, found {}", genesis.id()),
            });
        }
        genesis.validate(&config)?;

        info!(hash = %genesis.hash(), "Chain initialized from genesis block");
        Ok(Chain {
            config,
            blocks: vec![genesis],
        })
    }

    /// Rebuild a chain from stored blocks, checking every link.
    pub fn from_blocks(blocks: Vec<Block>, config: ChainConfig) -> Result<Self> {
        let mut iter = blocks.into_iter();
        let genesis = iter.next().ok_or(ChainError::ChainNotInitialized)?;

        let mut chain = Self::initialize(genesis, config)?;
        chain.blocks.extend(iter);
        chain.verify()?;

        debug!(length = chain.len(), "Chain loaded");
        Ok(chain)
    }

    /// Accept `block` only when its id equals the current length. Never mutates on rejection.
    ///
    /// Linkage, hash and proof-of-work are not checked here; see [`Chain::verify`].
    pub fn append(&mut self, block: Block) -> bool {
        let expected = self.blocks.len() as u64;
        if block.id() != expected {
            warn!(
                expected,
                actual = block.id(),
                "Rejected block with out-of-sequence id"
            );
            return false;
        }

        info!(id = block.id(), hash = %block.hash(), "Appended block");
        self.blocks.push(block);
        true
    }

    /// Walk adjacent pairs and return the first violation.
    pub fn verify(&self) -> Result<()> {
        for (index, pair) in self.blocks.windows(2).enumerate() {
            validate_link(&pair[0], &pair[1], index + 1, &self.config)?;
        }
        Ok(())
    }

    /// [`Chain::verify`] as a plain yes/no, logging the first failure.
    pub fn validate_all(&self) -> bool {
        match self.verify() {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Chain validation failed");
                false
            }
        }
    }

    /// Block whose id is `id`, if the chain is that long.
    pub fn find_by_id(&self, id: u64) -> Option<&Block> {
        let index = usize::try_from(id).ok()?;
        self.blocks.get(index).filter(|block| block.id() == id)
    }

    /// Like [`Chain::find_by_id`], failing with `BlockNotFound`.
    pub fn get_block(&self, id: u64) -> Result<&Block> {
        self.find_by_id(id)
            .ok_or_else(|| ChainError::BlockNotFound(format!("#{}", id)))
    }

    /// Linear scan; hashes are not indexed.
    pub fn find_by_hash(&self, hash: &str) -> Option<&Block> {
        self.blocks.iter().find(|block| block.hash() == hash)
    }

    /// The tip of the chain. Never fails, since genesis is always present.
    pub fn most_recent(&self) -> &Block {
        // `initialize` guarantees at least the genesis block.
        &self.blocks[self.blocks.len() - 1]
    }

    /// Id of the most recent block.
    pub fn max_index(&self) -> u64 {
        self.most_recent().id()
    }

    /// Number of blocks, genesis included.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Incoming minus outgoing values for `address` across the whole chain.
    pub fn balance_of(&self, address: &Address) -> i128 {
        LedgerState::from_chain(self).get_balance(address)
    }
}
