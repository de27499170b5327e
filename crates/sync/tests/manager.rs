//! End-to-end tests driving the manager through its public API.
//!
//! A mock chain and mock peers stand in for the real backends. Fire-and-
//! forget events are fenced with a query event: the worker drains the queue
//! in order, so once the query answers, everything before it has run.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};

use spvd_p2p::{BloomFilter, InvVect, Message, NODE_BLOOM, NODE_NETWORK};
use spvd_primitives::{Block, BlockHeader, Hash256, Transaction, TxIn, TxOut, OutPoint, ZERO_HASH};
use spvd_sync::{BlockCommit, BlockLocator, Chain, ChainError, Config, SyncManager, SyncPeer};

struct TestPeer {
    id: u64,
    services: u64,
    height: AtomicU64,
    get_blocks: Mutex<Vec<(BlockLocator, Hash256)>>,
    messages: Mutex<Vec<Message>>,
    disconnected: AtomicBool,
    _quit_tx: Sender<()>,
    quit_rx: Receiver<()>,
}

impl TestPeer {
    fn new(id: u64, services: u64, height: u64) -> Arc<Self> {
        let (quit_tx, quit_rx) = bounded(1);
        Arc::new(Self {
            id,
            services,
            height: AtomicU64::new(height),
            get_blocks: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
            disconnected: AtomicBool::new(false),
            _quit_tx: quit_tx,
            quit_rx,
        })
    }

    fn candidate(id: u64, height: u64) -> Arc<Self> {
        Self::new(id, NODE_NETWORK | NODE_BLOOM, height)
    }

    fn get_blocks_count(&self) -> usize {
        self.get_blocks.lock().unwrap().len()
    }

    fn sent_get_data(&self) -> Vec<Vec<InvVect>> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter_map(|message| match message {
                Message::GetData(vectors) => Some(vectors.clone()),
                _ => None,
            })
            .collect()
    }

    fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::Relaxed)
    }
}

impl SyncPeer for TestPeer {
    fn id(&self) -> u64 {
        self.id
    }

    fn addr(&self) -> String {
        format!("10.0.0.{}:18333", self.id)
    }

    fn services(&self) -> u64 {
        self.services
    }

    fn height(&self) -> u64 {
        self.height.load(Ordering::Relaxed)
    }

    fn update_height(&self, height: u64) {
        self.height.store(height, Ordering::Relaxed);
    }

    fn push_get_blocks_msg(&self, locator: BlockLocator, stop_hash: Hash256) {
        self.get_blocks.lock().unwrap().push((locator, stop_hash));
    }

    fn queue_message(&self, message: Message, done: Option<Sender<()>>) {
        self.messages.lock().unwrap().push(message);
        if let Some(done) = done {
            let _ = done.send(());
        }
    }

    fn disconnect(&self) {
        self.disconnected.store(true, Ordering::Relaxed);
    }

    fn quit(&self) -> Receiver<()> {
        self.quit_rx.clone()
    }
}

#[derive(Default)]
struct TestChainState {
    best_height: AtomicU64,
    known_blocks: Mutex<HashSet<Hash256>>,
    block_results: Mutex<VecDeque<Result<BlockCommit, ChainError>>>,
}

#[derive(Clone, Default)]
struct TestChain(Arc<TestChainState>);

impl Chain for TestChain {
    fn best_height(&self) -> u64 {
        self.0.best_height.load(Ordering::Relaxed)
    }

    fn latest_block_locator(&self) -> BlockLocator {
        vec![ZERO_HASH]
    }

    fn have_block(&self, hash: &Hash256) -> bool {
        self.0.known_blocks.lock().unwrap().contains(hash)
    }

    fn commit_block(&self, _block: Block) -> Result<BlockCommit, ChainError> {
        let scripted = self.0.block_results.lock().unwrap().pop_front();
        let result = scripted.unwrap_or_else(|| {
            Ok(BlockCommit {
                is_new: true,
                reorg: false,
                height: self.0.best_height.load(Ordering::Relaxed) + 1,
                false_positives: 0,
            })
        });
        if let Ok(commit) = &result {
            if commit.is_new {
                self.0.best_height.store(commit.height, Ordering::Relaxed);
            }
        }
        result
    }

    fn commit_tx(&self, _tx: Transaction) -> Result<bool, ChainError> {
        Ok(false)
    }
}

fn new_manager(chain: TestChain, min_peers_for_sync: usize) -> SyncManager {
    SyncManager::new(Config {
        max_peers: 8,
        min_peers_for_sync,
        chain: Box::new(chain),
        update_filter: Box::new(|| BloomFilter::new(16, 0.001, 0, 0)),
    })
}

fn make_block(tag: u32) -> Block {
    Block::new(
        BlockHeader {
            version: 1,
            prev_block: ZERO_HASH,
            merkle_root: ZERO_HASH,
            time: tag,
            bits: 0,
            nonce: tag,
        },
        Vec::new(),
    )
}

fn make_tx(tag: u8) -> Transaction {
    Transaction {
        version: 1,
        inputs: vec![TxIn {
            prevout: OutPoint::new([tag; 32], 0),
            script_sig: Vec::new(),
            sequence: 0,
        }],
        outputs: vec![TxOut {
            value: i64::from(tag),
            script_pubkey: Vec::new(),
        }],
        lock_time: 0,
    }
}

fn deliver_block(manager: &SyncManager, peer: &Arc<TestPeer>, block: Block) {
    let (reply_tx, reply_rx) = bounded(1);
    manager.queue_block(block, Arc::clone(peer) as Arc<dyn SyncPeer>, reply_tx);
    reply_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("block ack");
}

fn deliver_tx(manager: &SyncManager, peer: &Arc<TestPeer>, tx: Transaction) {
    let (reply_tx, reply_rx) = bounded(1);
    manager.queue_tx(tx, Arc::clone(peer) as Arc<dyn SyncPeer>, reply_tx);
    reply_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("tx ack");
}

#[test]
fn start_and_stop_are_idempotent() {
    let manager = new_manager(TestChain::default(), 1);
    manager.start();
    manager.start();
    manager.stop();
    manager.stop();
}

#[test]
fn bootstrap_selects_sync_peer_and_requests_blocks() {
    let manager = new_manager(TestChain::default(), 1);
    manager.start();

    let peer = TestPeer::candidate(1, 100);
    manager.new_peer(Arc::clone(&peer) as Arc<dyn SyncPeer>);

    // The query fences the fire-and-forget new-peer event.
    assert_eq!(manager.sync_peer_id(), 1);
    assert!(!manager.is_current());

    let calls = peer.get_blocks.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, ZERO_HASH);

    manager.stop();
}

#[test]
fn no_sync_peer_means_current() {
    let manager = new_manager(TestChain::default(), 1);
    manager.start();

    assert_eq!(manager.sync_peer_id(), 0);
    assert!(manager.is_current());

    manager.stop();
}

#[test]
fn small_sync_round_trip_becomes_current() {
    let manager = new_manager(TestChain::default(), 1);
    manager.start();

    let peer = TestPeer::candidate(1, 2);
    manager.new_peer(Arc::clone(&peer) as Arc<dyn SyncPeer>);
    assert_eq!(manager.sync_peer_id(), 1);
    assert!(!manager.is_current());

    for tag in 1..=2u32 {
        let block = make_block(tag);
        manager.queue_inv(
            vec![InvVect::block(block.hash())],
            Arc::clone(&peer) as Arc<dyn SyncPeer>,
        );
        deliver_block(&manager, &peer, block);
    }

    assert!(manager.is_current());
    // The last commit reported our height back to the peer.
    assert_eq!(peer.height(), 2);
    assert!(!peer.is_disconnected());

    manager.stop();
}

#[test]
fn unsolicited_block_from_sync_peer_disconnects() {
    let manager = new_manager(TestChain::default(), 1);
    manager.start();

    let peer = TestPeer::candidate(1, 100);
    manager.new_peer(Arc::clone(&peer) as Arc<dyn SyncPeer>);
    assert_eq!(manager.sync_peer_id(), 1);

    deliver_block(&manager, &peer, make_block(1));

    assert!(peer.is_disconnected());

    manager.stop();
}

#[test]
fn unsolicited_tx_disconnects() {
    let manager = new_manager(TestChain::default(), 1);
    manager.start();

    let peer = TestPeer::candidate(1, 0);
    manager.new_peer(Arc::clone(&peer) as Arc<dyn SyncPeer>);
    assert_eq!(manager.sync_peer_id(), 1);

    deliver_tx(&manager, &peer, make_tx(1));

    assert!(peer.is_disconnected());

    manager.stop();
}

#[test]
fn done_peer_clears_sync_peer() {
    let manager = new_manager(TestChain::default(), 1);
    manager.start();

    let peer = TestPeer::candidate(1, 100);
    manager.new_peer(Arc::clone(&peer) as Arc<dyn SyncPeer>);
    assert_eq!(manager.sync_peer_id(), 1);

    manager.done_peer(Arc::clone(&peer) as Arc<dyn SyncPeer>);

    assert_eq!(manager.sync_peer_id(), 0);
    assert!(manager.is_current());

    manager.stop();
}

#[test]
fn departed_sync_peer_hands_over_to_next_candidate() {
    let manager = new_manager(TestChain::default(), 1);
    manager.start();

    let first = TestPeer::candidate(1, 100);
    let second = TestPeer::candidate(2, 90);
    manager.new_peer(Arc::clone(&first) as Arc<dyn SyncPeer>);
    manager.new_peer(Arc::clone(&second) as Arc<dyn SyncPeer>);
    assert_eq!(manager.sync_peer_id(), 1);

    manager.done_peer(Arc::clone(&first) as Arc<dyn SyncPeer>);

    assert_eq!(manager.sync_peer_id(), 2);
    assert_eq!(second.get_blocks_count(), 1);

    manager.stop();
}

#[test]
fn inv_produces_one_getdata_per_hash() {
    let manager = new_manager(TestChain::default(), 1);
    manager.start();

    let peer = TestPeer::candidate(1, 0);
    manager.new_peer(Arc::clone(&peer) as Arc<dyn SyncPeer>);
    assert_eq!(manager.sync_peer_id(), 1);

    let hash = [3u8; 32];
    manager.queue_inv(
        vec![InvVect::block(hash)],
        Arc::clone(&peer) as Arc<dyn SyncPeer>,
    );
    manager.queue_inv(
        vec![InvVect::block(hash)],
        Arc::clone(&peer) as Arc<dyn SyncPeer>,
    );
    assert!(manager.is_current());

    let requested: usize = peer
        .sent_get_data()
        .iter()
        .map(|vectors| vectors.iter().filter(|v| v.hash == hash).count())
        .sum();
    assert_eq!(requested, 1);

    manager.stop();
}

#[test]
fn pause_holds_event_processing_until_released() {
    let manager = new_manager(TestChain::default(), 1);
    manager.start();

    let resume = manager.pause();

    let peer = TestPeer::candidate(1, 100);
    manager.new_peer(Arc::clone(&peer) as Arc<dyn SyncPeer>);

    // The new-peer event sits behind the pause.
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(peer.get_blocks_count(), 0);

    drop(resume);
    assert_eq!(manager.sync_peer_id(), 1);
    assert_eq!(peer.get_blocks_count(), 1);

    manager.stop();
}

#[test]
fn submissions_after_stop_are_dropped_but_acked() {
    let manager = new_manager(TestChain::default(), 1);
    manager.start();
    manager.stop();

    let peer = TestPeer::candidate(1, 100);
    manager.new_peer(Arc::clone(&peer) as Arc<dyn SyncPeer>);

    // Block and tx submissions still signal their reply channels.
    let (reply_tx, reply_rx) = bounded(1);
    manager.queue_block(
        make_block(1),
        Arc::clone(&peer) as Arc<dyn SyncPeer>,
        reply_tx,
    );
    reply_rx
        .recv_timeout(Duration::from_secs(1))
        .expect("ack after shutdown");

    let (reply_tx, reply_rx) = bounded(1);
    manager.queue_tx(make_tx(1), Arc::clone(&peer) as Arc<dyn SyncPeer>, reply_tx);
    reply_rx
        .recv_timeout(Duration::from_secs(1))
        .expect("ack after shutdown");

    assert_eq!(manager.sync_peer_id(), 0);
    assert!(manager.is_current());
    assert_eq!(peer.get_blocks_count(), 0);
}
