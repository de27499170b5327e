//! The block synchronization manager.
//!
//! One worker thread owns every piece of mutable state and drains a bounded
//! event queue in arrival order. Peers submit blocks and transactions with a
//! reply channel and wait for the ack before sending the next one, which
//! caps the manager at one in-flight block/tx event per peer.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, select, Receiver, Sender};

use spvd_log::{log_debug, log_error, log_info, log_trace, log_warn};
use spvd_p2p::{InvKind, InvVect, Message, MAX_INV_PER_MSG, NODE_BLOOM, NODE_NETWORK};
use spvd_primitives::{hash256_to_hex, Block, Hash256, Transaction, ZERO_HASH};

use crate::chain::ChainError;
use crate::config::Config;
use crate::peer::SyncPeer;

/// Maximum tolerated ratio of bad blocks to received blocks per peer.
pub const MAX_BAD_BLOCK_RATE: f64 = 0.001;

/// Maximum tolerated ratio of false-positive transactions per peer before
/// the bloom filter is rebuilt and reloaded.
pub const MAX_FALSE_POSITIVE_RATE: f64 = 0.001;

/// Maximum number of requested block hashes to keep in memory.
pub const MAX_REQUESTED_BLOCKS: usize = MAX_INV_PER_MSG;

/// Maximum number of requested transaction hashes to keep in memory.
pub const MAX_REQUESTED_TXNS: usize = MAX_INV_PER_MSG;

enum Event {
    NewPeer(Arc<dyn SyncPeer>),
    DonePeer(Arc<dyn SyncPeer>),
    Inv {
        peer: Arc<dyn SyncPeer>,
        vectors: Vec<InvVect>,
    },
    Block {
        peer: Arc<dyn SyncPeer>,
        block: Block,
        reply: Sender<()>,
    },
    Tx {
        peer: Arc<dyn SyncPeer>,
        tx: Transaction,
        reply: Sender<()>,
    },
    SyncPeerId {
        reply: Sender<u64>,
    },
    IsCurrent {
        reply: Sender<bool>,
    },
    Pause {
        unpause: Receiver<()>,
    },
}

/// Per-peer false-positive counters.
///
/// These are the one piece of peer state touched outside the worker thread:
/// the filter-reload waiter zeroes them once the peer has taken the new
/// filter. Relaxed atomics keep that reset race-free.
#[derive(Debug, Default)]
struct FalsePositiveCounters {
    received_txs: AtomicU32,
    false_positives: AtomicU32,
}

impl FalsePositiveCounters {
    fn note_tx(&self) {
        self.received_txs.fetch_add(1, Ordering::Relaxed);
    }

    fn note_false_positives(&self, count: u32) {
        self.false_positives.fetch_add(count, Ordering::Relaxed);
    }

    fn rate(&self) -> f64 {
        f64::from(self.false_positives.load(Ordering::Relaxed))
            / f64::from(self.received_txs.load(Ordering::Relaxed))
    }

    fn reset(&self) {
        self.received_txs.store(0, Ordering::Relaxed);
        self.false_positives.store(0, Ordering::Relaxed);
    }
}

struct PeerState {
    peer: Arc<dyn SyncPeer>,
    sync_candidate: bool,
    request_queue: VecDeque<InvVect>,
    requested_txns: HashSet<Hash256>,
    requested_blocks: HashSet<Hash256>,
    received_blocks: u32,
    bad_blocks: u32,
    fp: Arc<FalsePositiveCounters>,
}

impl PeerState {
    fn new(peer: Arc<dyn SyncPeer>, sync_candidate: bool) -> Self {
        Self {
            peer,
            sync_candidate,
            request_queue: VecDeque::new(),
            requested_txns: HashSet::new(),
            requested_blocks: HashSet::new(),
            received_blocks: 0,
            bad_blocks: 0,
            fp: Arc::new(FalsePositiveCounters::default()),
        }
    }

    fn bad_block_rate(&self) -> f64 {
        f64::from(self.bad_blocks) / f64::from(self.received_blocks)
    }
}

fn is_sync_candidate(peer: &dyn SyncPeer) -> bool {
    let services = peer.services();
    services & NODE_NETWORK != 0 && services & NODE_BLOOM != 0
}

/// Evict one arbitrary entry once the set is at capacity, keeping memory
/// bounded under advertisement floods. `HashSet` iteration order depends on
/// a per-process random SipHash key, so the victim is not attacker-steerable.
fn limit_insert(set: &mut HashSet<Hash256>, hash: Hash256, limit: usize) -> Option<Hash256> {
    let mut evicted = None;
    if set.len() + 1 > limit {
        if let Some(victim) = set.iter().next().copied() {
            set.remove(&victim);
            evicted = Some(victim);
        }
    }
    set.insert(hash);
    evicted
}

/// The worker-thread side of the manager. All fields are owned by the event
/// loop; nothing here is shared.
struct SyncWorker {
    cfg: Config,
    shutdown: Arc<AtomicBool>,
    requested_txns: HashSet<Hash256>,
    requested_blocks: HashSet<Hash256>,
    tx_mempool: HashSet<Hash256>,
    sync_peer: Option<Arc<dyn SyncPeer>>,
    peer_states: HashMap<u64, PeerState>,
}

impl SyncWorker {
    fn new(cfg: Config, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            cfg,
            shutdown,
            requested_txns: HashSet::new(),
            requested_blocks: HashSet::new(),
            tx_mempool: HashSet::new(),
            sync_peer: None,
            peer_states: HashMap::new(),
        }
    }

    fn run(&mut self, event_rx: Receiver<Event>, quit_rx: Receiver<()>) {
        loop {
            select! {
                recv(event_rx) -> event => match event {
                    Ok(event) => self.handle_event(event),
                    Err(_) => break,
                },
                recv(quit_rx) -> _ => break,
            }
        }
        log_trace!("sync manager event loop done");
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::NewPeer(peer) => self.handle_new_peer(peer),
            Event::DonePeer(peer) => self.handle_done_peer(&peer),
            Event::Inv { peer, vectors } => self.handle_inv(&peer, vectors),
            Event::Block { peer, block, reply } => {
                self.handle_block(&peer, block);
                let _ = reply.send(());
            }
            Event::Tx { peer, tx, reply } => {
                self.handle_tx(&peer, tx);
                let _ = reply.send(());
            }
            Event::SyncPeerId { reply } => {
                let peer_id = self.sync_peer.as_ref().map(|peer| peer.id()).unwrap_or(0);
                let _ = reply.send(peer_id);
            }
            Event::IsCurrent { reply } => {
                let _ = reply.send(self.current());
            }
            Event::Pause { unpause } => {
                // The caller holds the sender and has exclusive access to a
                // quiescent manager until it signals or drops it.
                let _ = unpause.recv();
            }
        }
    }

    /// Whether we believe we are synced with our peers.
    fn current(&self) -> bool {
        match &self.sync_peer {
            // No sync peer: nothing tells us otherwise.
            None => true,
            // Below the height we are syncing to, we are not current no
            // matter what the chain thinks.
            Some(peer) => self.cfg.chain.best_height() >= peer.height(),
        }
    }

    fn is_sync_peer(&self, peer: &Arc<dyn SyncPeer>) -> bool {
        self.sync_peer
            .as_ref()
            .map_or(false, |sync| sync.id() == peer.id())
    }

    fn handle_new_peer(&mut self, peer: Arc<dyn SyncPeer>) {
        if self.shutdown.load(Ordering::Relaxed) {
            return;
        }

        log_info!("new valid peer {} ({})", peer.id(), peer.addr());

        let sync_candidate = is_sync_candidate(peer.as_ref());
        let peer_id = peer.id();
        self.peer_states
            .insert(peer_id, PeerState::new(peer, sync_candidate));

        if sync_candidate && self.sync_peer.is_none() {
            self.start_sync();
        }
    }

    fn handle_done_peer(&mut self, peer: &Arc<dyn SyncPeer>) {
        let Some(state) = self.peer_states.remove(&peer.id()) else {
            log_warn!("done peer message for unknown peer {}", peer.addr());
            return;
        };

        log_info!("lost peer {} ({})", peer.id(), peer.addr());

        // Release the peer's in-flight requests so the next inv from
        // another peer fetches them from elsewhere.
        for tx_hash in &state.requested_txns {
            self.requested_txns.remove(tx_hash);
        }
        for block_hash in &state.requested_blocks {
            self.requested_blocks.remove(block_hash);
        }

        if self.is_sync_peer(peer) {
            self.sync_peer = None;
            self.start_sync();
        }
    }

    /// Choose the best candidate peer and start the initial block download
    /// from it. A no-op while a sync is already running.
    fn start_sync(&mut self) {
        let candidates = self
            .peer_states
            .values()
            .filter(|state| state.sync_candidate)
            .count();
        if candidates < self.cfg.min_peers_for_sync {
            return;
        }

        if self.sync_peer.is_some() {
            return;
        }

        let best_height = self.cfg.chain.best_height();
        let mut best_peer: Option<Arc<dyn SyncPeer>> = None;
        for state in self.peer_states.values_mut() {
            if !state.sync_candidate {
                continue;
            }

            // Strictly below our tip means the peer has nothing for us.
            // Equal heights stay candidates so two fresh nodes at zero can
            // still pair up.
            if state.peer.height() < best_height {
                state.sync_candidate = false;
                continue;
            }

            match &best_peer {
                None => best_peer = Some(Arc::clone(&state.peer)),
                Some(best) if state.peer.height() > best.height() => {
                    best_peer = Some(Arc::clone(&state.peer));
                }
                Some(_) => {}
            }
        }

        match best_peer {
            Some(peer) => self.sync_with(&peer),
            None => log_warn!("no sync peer candidates available"),
        }
    }

    fn sync_with(&mut self, peer: &Arc<dyn SyncPeer>) {
        // Stale requests against a previous sync peer would make us ignore
        // blocks we still need.
        self.requested_blocks.clear();

        log_info!(
            "syncing to block height {} from peer {}",
            peer.height(),
            peer.addr()
        );

        let locator = self.cfg.chain.latest_block_locator();
        peer.push_get_blocks_msg(locator, ZERO_HASH);
        self.sync_peer = Some(Arc::clone(peer));
    }

    /// Rebuild the bloom filter and load it onto the peer. The counter
    /// reset must not block the event loop, so a helper thread waits for
    /// either the send completion or the peer going away.
    fn update_bloom_filter(&self, peer: &Arc<dyn SyncPeer>, counters: &Arc<FalsePositiveCounters>) {
        let filter = (self.cfg.update_filter)();
        let (done_tx, done_rx) = bounded(1);
        peer.queue_message(Message::FilterLoad(filter.filter_load()), Some(done_tx));

        let counters = Arc::clone(counters);
        let quit = peer.quit();
        let spawned = thread::Builder::new()
            .name("filter-reload".to_string())
            .spawn(move || {
                select! {
                    recv(done_rx) -> sent => {
                        if sent.is_ok() {
                            counters.reset();
                        }
                    }
                    recv(quit) -> _ => {}
                }
            });
        if let Err(err) = spawned {
            log_error!("failed to spawn filter reload waiter: {err}");
        }
    }

    /// Whether the advertised inventory is already known to us.
    fn have_inventory(&self, vector: &InvVect) -> bool {
        match vector.kind {
            InvKind::Block | InvKind::FilteredBlock => self.cfg.chain.have_block(&vector.hash),
            InvKind::Tx => self.tx_mempool.contains(&vector.hash),
            // Claim unsupported kinds are known so we never request them.
            InvKind::Unknown(_) => true,
        }
    }

    fn handle_inv(&mut self, peer: &Arc<dyn SyncPeer>, vectors: Vec<InvVect>) {
        if !self.peer_states.contains_key(&peer.id()) {
            log_warn!("inv message from unknown peer {}", peer.addr());
            return;
        }

        // Ignore invs from everyone but the sync peer while catching up;
        // fetching them would mostly produce orphans.
        if !self.is_sync_peer(peer) && !self.current() {
            return;
        }

        for mut vector in vectors {
            match vector.kind {
                // An SPV client never wants a full block.
                InvKind::Block => vector.kind = InvKind::FilteredBlock,
                InvKind::Tx => {}
                _ => continue,
            }

            if self.have_inventory(&vector) {
                continue;
            }

            if let Some(state) = self.peer_states.get_mut(&peer.id()) {
                state.request_queue.push_back(vector);
            }
        }

        self.push_get_data_msg(peer);
    }

    /// Drain as much of the peer's request queue as fits into one getdata
    /// message; whatever does not fit is requested on the next inv.
    fn push_get_data_msg(&mut self, peer: &Arc<dyn SyncPeer>) {
        let mut vectors: Vec<InvVect> = Vec::new();
        let mut evicted_blocks: Vec<Hash256> = Vec::new();
        let mut evicted_txns: Vec<Hash256> = Vec::new();

        let Some(state) = self.peer_states.get_mut(&peer.id()) else {
            return;
        };
        while let Some(vector) = state.request_queue.pop_front() {
            match vector.kind {
                InvKind::FilteredBlock => {
                    // Request the block unless it is already pending
                    // against some peer.
                    if !self.requested_blocks.contains(&vector.hash) {
                        if let Some(victim) =
                            limit_insert(&mut self.requested_blocks, vector.hash, MAX_REQUESTED_BLOCKS)
                        {
                            evicted_blocks.push(victim);
                        }
                        state.requested_blocks.insert(vector.hash);
                        vectors.push(vector);
                    }
                }
                InvKind::Tx => {
                    if !self.requested_txns.contains(&vector.hash) {
                        if let Some(victim) =
                            limit_insert(&mut self.requested_txns, vector.hash, MAX_REQUESTED_TXNS)
                        {
                            evicted_txns.push(victim);
                        }
                        state.requested_txns.insert(vector.hash);
                        vectors.push(vector);
                    }
                }
                _ => {}
            }

            if vectors.len() >= MAX_INV_PER_MSG {
                break;
            }
        }

        // An evicted hash must leave its owner's set too, or the owner
        // would still treat a late arrival as solicited.
        for victim in evicted_blocks {
            if self.requested_blocks.contains(&victim) {
                continue;
            }
            for peer_state in self.peer_states.values_mut() {
                if peer_state.requested_blocks.remove(&victim) {
                    break;
                }
            }
        }
        for victim in evicted_txns {
            if self.requested_txns.contains(&victim) {
                continue;
            }
            for peer_state in self.peer_states.values_mut() {
                if peer_state.requested_txns.remove(&victim) {
                    break;
                }
            }
        }

        if !vectors.is_empty() {
            peer.queue_message(Message::GetData(vectors), None);
        }
    }

    fn handle_tx(&mut self, peer: &Arc<dyn SyncPeer>, tx: Transaction) {
        let tx_hash = tx.txid();

        let counters = {
            let Some(state) = self.peer_states.get_mut(&peer.id()) else {
                log_warn!("tx message from unknown peer {}", peer.addr());
                return;
            };

            if !state.requested_txns.remove(&tx_hash) {
                log_warn!(
                    "peer {} sent us a transaction we did not request",
                    peer.addr()
                );
                peer.disconnect();
                return;
            }
            state.fp.note_tx();
            Arc::clone(&state.fp)
        };

        // Keep the hash out of future requests either way: on success the
        // chain knows it, on failure the next inv retries it.
        self.tx_mempool.insert(tx_hash);
        self.requested_txns.remove(&tx_hash);

        let false_positive = match self.cfg.chain.commit_tx(tx) {
            Ok(false_positive) => false_positive,
            Err(err) => {
                log_error!("commit transaction error: {err}");
                false
            }
        };

        if false_positive {
            log_debug!(
                "tx {} from peer {} is a false positive",
                hash256_to_hex(&tx_hash),
                peer.id()
            );
            counters.note_false_positives(1);
            if counters.rate() > MAX_FALSE_POSITIVE_RATE {
                self.update_bloom_filter(peer, &counters);
            }
        }
    }

    fn handle_block(&mut self, peer: &Arc<dyn SyncPeer>, block: Block) {
        // Unsolicited blocks mid-sync will not connect anyway.
        if !self.is_sync_peer(peer) && !self.current() {
            log_warn!("received block from {} while not current", peer.addr());
            return;
        }

        let block_hash = block.header.hash();
        {
            let Some(state) = self.peer_states.get_mut(&peer.id()) else {
                log_warn!("block message from unknown peer {}", peer.addr());
                peer.disconnect();
                return;
            };

            // An unrequested block is misbehavior, full stop.
            if !state.requested_blocks.remove(&block_hash) {
                log_warn!("peer {} sent us a block we did not request", peer.addr());
                peer.disconnect();
                return;
            }
            state.received_blocks += 1;
        }
        self.requested_blocks.remove(&block_hash);

        let commit = match self.cfg.chain.commit_block(block) {
            Ok(commit) => commit,
            Err(ChainError::OrphanBlock) => {
                if self.current() {
                    // We may be synced onto a minority branch. Restart the
                    // locator dialog with the peer that knows better.
                    log_debug!(
                        "received orphan block while current, checking peer {} for more blocks",
                        peer.addr()
                    );
                    if let Some(state) = self.peer_states.get_mut(&peer.id()) {
                        state.request_queue.clear();
                        state.requested_blocks.clear();
                    }
                    self.requested_blocks.clear();
                    self.sync_with(peer);
                } else {
                    // Mid-sync this may just be the last block of a batch;
                    // score it and only cut the peer loose past the
                    // threshold.
                    let disconnect = match self.peer_states.get_mut(&peer.id()) {
                        Some(state) => {
                            state.bad_blocks += 1;
                            state.bad_block_rate() > MAX_BAD_BLOCK_RATE
                        }
                        None => false,
                    };
                    if disconnect {
                        log_warn!(
                            "disconnecting peer {}: too many blocks that do not fit our chain",
                            peer.addr()
                        );
                        peer.disconnect();
                    } else {
                        log_warn!(
                            "received orphan block {} from peer {}",
                            hash256_to_hex(&block_hash),
                            peer.addr()
                        );
                    }
                }
                return;
            }
            Err(err) => {
                log_error!("commit block error: {err}");
                return;
            }
        };

        // Matched transactions in the block that are not actually ours
        // count toward the peer's false-positive rate.
        let mut refresh = None;
        if let Some(state) = self.peer_states.get_mut(&peer.id()) {
            state.fp.note_false_positives(commit.false_positives);
            if state.fp.rate() > MAX_FALSE_POSITIVE_RATE {
                refresh = Some(Arc::clone(&state.fp));
            }
        }
        if let Some(counters) = refresh {
            self.update_bloom_filter(peer, &counters);
        }

        if !commit.is_new {
            log_debug!("received duplicate block {}", hash256_to_hex(&block_hash));
            return;
        }

        log_info!(
            "received block {} at height {}",
            hash256_to_hex(&block_hash),
            commit.height
        );

        if commit.reorg && self.current() {
            // The tip moved branches; the next sync cycle starts clean.
            if let Some(state) = self.peer_states.get_mut(&peer.id()) {
                state.request_queue.clear();
                state.requested_blocks.clear();
            }
            self.requested_blocks.clear();
        }

        // Only confirmations matter to an SPV wallet.
        self.tx_mempool.clear();

        if self.current() {
            peer.update_height(commit.height);
            return;
        }

        // Still behind: either ask for the next window or drain what the
        // peer already advertised.
        let queue_empty = self
            .peer_states
            .get(&peer.id())
            .map(|state| state.request_queue.is_empty())
            .unwrap_or(true);
        if queue_empty {
            log_debug!("request queue empty, pushing a fresh block locator");
            let locator = self.cfg.chain.latest_block_locator();
            peer.push_get_blocks_msg(locator, ZERO_HASH);
            return;
        }
        self.push_get_data_msg(peer);
    }
}

/// Public handle to the sync manager.
///
/// Constructed with [`SyncManager::new`]; nothing happens until
/// [`SyncManager::start`] spawns the worker. All submission methods are
/// no-ops once [`SyncManager::stop`] has begun.
pub struct SyncManager {
    started: AtomicBool,
    shutdown: Arc<AtomicBool>,
    event_tx: Sender<Event>,
    quit_tx: Mutex<Option<Sender<()>>>,
    boot: Mutex<Option<WorkerBoot>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

struct WorkerBoot {
    worker: SyncWorker,
    event_rx: Receiver<Event>,
    quit_rx: Receiver<()>,
}

impl SyncManager {
    pub fn new(config: Config) -> Self {
        let capacity = config.max_peers.saturating_mul(3).max(1);
        let (event_tx, event_rx) = bounded(capacity);
        let (quit_tx, quit_rx) = bounded(1);
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker = SyncWorker::new(config, Arc::clone(&shutdown));
        Self {
            started: AtomicBool::new(false),
            shutdown,
            event_tx,
            quit_tx: Mutex::new(Some(quit_tx)),
            boot: Mutex::new(Some(WorkerBoot {
                worker,
                event_rx,
                quit_rx,
            })),
            worker: Mutex::new(None),
        }
    }

    /// Spawn the worker thread. Safe to call more than once; only the
    /// first call has an effect.
    pub fn start(&self) {
        if self
            .started
            .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
            .is_err()
        {
            return;
        }

        let boot = match self.boot.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        let Some(boot) = boot else {
            return;
        };

        log_trace!("starting sync manager");
        let spawned = thread::Builder::new()
            .name("sync-manager".to_string())
            .spawn(move || {
                let WorkerBoot {
                    mut worker,
                    event_rx,
                    quit_rx,
                } = boot;
                worker.run(event_rx, quit_rx);
            });
        match spawned {
            Ok(handle) => {
                if let Ok(mut guard) = self.worker.lock() {
                    *guard = Some(handle);
                }
            }
            Err(err) => log_error!("failed to spawn sync manager worker: {err}"),
        }
    }

    /// Shut the manager down and wait for the worker to exit.
    pub fn stop(&self) {
        if self
            .shutdown
            .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
            .is_err()
        {
            log_warn!("sync manager is already in the process of shutting down");
            return;
        }

        log_info!("sync manager shutting down");

        // Dropping the retained sender disconnects the quit channel, which
        // ends the event loop.
        if let Ok(mut guard) = self.quit_tx.lock() {
            guard.take();
        }

        let handle = match self.worker.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    /// Inform the manager of a newly negotiated peer.
    pub fn new_peer(&self, peer: Arc<dyn SyncPeer>) {
        if self.shutdown.load(Ordering::Relaxed) {
            return;
        }
        let _ = self.event_tx.send(Event::NewPeer(peer));
    }

    /// Inform the manager that a peer has disconnected.
    pub fn done_peer(&self, peer: Arc<dyn SyncPeer>) {
        if self.shutdown.load(Ordering::Relaxed) {
            return;
        }
        let _ = self.event_tx.send(Event::DonePeer(peer));
    }

    /// Queue an inv message. Fire-and-forget; peers do not block on invs.
    pub fn queue_inv(&self, vectors: Vec<InvVect>, peer: Arc<dyn SyncPeer>) {
        if self.shutdown.load(Ordering::Relaxed) {
            return;
        }
        let _ = self.event_tx.send(Event::Inv { peer, vectors });
    }

    /// Queue a transaction for processing. `reply` is signalled once the
    /// event has been handled, throttling the submitter to one in-flight
    /// transaction per peer.
    pub fn queue_tx(&self, tx: Transaction, peer: Arc<dyn SyncPeer>, reply: Sender<()>) {
        if self.shutdown.load(Ordering::Relaxed) {
            let _ = reply.send(());
            return;
        }
        let _ = self.event_tx.send(Event::Tx { peer, tx, reply });
    }

    /// Queue a block for processing. `reply` is signalled once the event
    /// has been handled.
    pub fn queue_block(&self, block: Block, peer: Arc<dyn SyncPeer>, reply: Sender<()>) {
        if self.shutdown.load(Ordering::Relaxed) {
            let _ = reply.send(());
            return;
        }
        let _ = self.event_tx.send(Event::Block { peer, block, reply });
    }

    /// Id of the current sync peer, or 0 when there is none.
    pub fn sync_peer_id(&self) -> u64 {
        if self.shutdown.load(Ordering::Relaxed) {
            return 0;
        }
        let (reply_tx, reply_rx) = bounded(1);
        if self
            .event_tx
            .send(Event::SyncPeerId { reply: reply_tx })
            .is_err()
        {
            return 0;
        }
        reply_rx.recv().unwrap_or(0)
    }

    /// Whether the manager believes it is synced with its peers.
    pub fn is_current(&self) -> bool {
        if self.shutdown.load(Ordering::Relaxed) {
            return true;
        }
        let (reply_tx, reply_rx) = bounded(1);
        if self
            .event_tx
            .send(Event::IsCurrent { reply: reply_tx })
            .is_err()
        {
            return true;
        }
        reply_rx.recv().unwrap_or(true)
    }

    /// Pause the event loop. All processing halts until the returned
    /// sender is signalled or dropped; keep the pause short.
    pub fn pause(&self) -> Sender<()> {
        let (unpause_tx, unpause_rx) = bounded(1);
        let _ = self.event_tx.send(Event::Pause {
            unpause: unpause_rx,
        });
        unpause_tx
    }
}
