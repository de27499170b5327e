//! Block synchronization manager for an SPV client.
//!
//! The manager drives initial block download and steady-state block and
//! transaction ingestion against bloom-filtering peers. All bookkeeping
//! (peer states, in-flight request sets, the SPV mempool view) is owned by
//! one worker thread that drains a bounded event queue, so no locks guard
//! the hot state. Callers interact through [`SyncManager`]; the chain
//! backend and peer transport plug in via the [`Chain`] and [`SyncPeer`]
//! contracts.

pub mod chain;
pub mod config;
pub mod manager;
pub mod peer;

pub use chain::{BlockCommit, BlockLocator, Chain, ChainError};
pub use config::Config;
pub use manager::{
    SyncManager, MAX_BAD_BLOCK_RATE, MAX_FALSE_POSITIVE_RATE, MAX_REQUESTED_BLOCKS,
    MAX_REQUESTED_TXNS,
};
pub use peer::SyncPeer;
