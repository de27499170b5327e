//! Contract the manager consumes from the peer transport.

use crossbeam_channel::{Receiver, Sender};

use spvd_p2p::Message;
use spvd_primitives::Hash256;

use crate::chain::BlockLocator;

/// A connected, version-negotiated peer as seen by the sync manager.
///
/// The manager never owns the connection. Implementations are handles into
/// the transport layer, and the producer promises to deliver a `done_peer`
/// event before dropping its side of the handle.
pub trait SyncPeer: Send + Sync {
    /// Stable numeric id, unique for the lifetime of the connection.
    fn id(&self) -> u64;

    fn addr(&self) -> String;

    /// Advertised service bitmask.
    fn services(&self) -> u64;

    /// Advertised best height; may advance as the peer announces blocks.
    fn height(&self) -> u64;

    fn update_height(&self, height: u64);

    /// Send a getblocks message for the inventory after `locator`, up to
    /// `stop_hash` (all-zero for "as many as you have").
    fn push_get_blocks_msg(&self, locator: BlockLocator, stop_hash: Hash256);

    /// Queue an outbound message. `done` is signalled once the message has
    /// been handed to the wire.
    fn queue_message(&self, message: Message, done: Option<Sender<()>>);

    fn disconnect(&self);

    /// A channel that disconnects when the peer goes away.
    fn quit(&self) -> Receiver<()>;
}
