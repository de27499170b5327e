//! Contract the manager consumes from the chain backend.

use spvd_primitives::{Block, Hash256, Transaction};

/// Sparse list of recent block hashes used to negotiate a sync start point.
pub type BlockLocator = Vec<Hash256>;

/// Outcome of a successful block commit.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BlockCommit {
    /// False when the block was already known.
    pub is_new: bool,
    /// True when the best tip moved to a different branch.
    pub reorg: bool,
    /// Best height after the commit.
    pub height: u64,
    /// Matched transactions in the block that turned out not to be ours.
    pub false_positives: u32,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ChainError {
    /// The block does not connect to any chain we know about.
    OrphanBlock,
    InvalidBlock(String),
    InvalidTx(String),
    Storage(String),
}

impl std::fmt::Display for ChainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainError::OrphanBlock => write!(f, "orphan block"),
            ChainError::InvalidBlock(reason) => write!(f, "invalid block: {reason}"),
            ChainError::InvalidTx(reason) => write!(f, "invalid transaction: {reason}"),
            ChainError::Storage(reason) => write!(f, "storage error: {reason}"),
        }
    }
}

impl std::error::Error for ChainError {}

pub trait Chain: Send {
    fn best_height(&self) -> u64;

    fn latest_block_locator(&self) -> BlockLocator;

    /// Whether the block is known in any form (main chain, side chain, or
    /// orphan pool).
    fn have_block(&self, hash: &Hash256) -> bool;

    fn commit_block(&self, block: Block) -> Result<BlockCommit, ChainError>;

    /// Commit a transaction to the wallet-visible state. Returns true when
    /// the transaction matched the bloom filter but is not actually ours.
    fn commit_tx(&self, tx: Transaction) -> Result<bool, ChainError>;
}
