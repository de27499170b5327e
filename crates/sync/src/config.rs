use spvd_p2p::BloomFilter;

use crate::chain::Chain;

/// Sync manager configuration.
pub struct Config {
    /// Upper bound on connected peers; sizes the inbound event queue.
    pub max_peers: usize,
    /// Number of sync candidates required before initial download starts.
    pub min_peers_for_sync: usize,
    /// The chain backend blocks and transactions are committed to.
    pub chain: Box<dyn Chain>,
    /// Rebuilds the bloom filter from current wallet state; called whenever
    /// a peer's false-positive rate forces a filter reload.
    pub update_filter: Box<dyn Fn() -> BloomFilter + Send>,
}
