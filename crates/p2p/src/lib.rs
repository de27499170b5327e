//! Wire messages and bloom filter support for the SPV protocol.

pub mod bloom;
pub mod message;

pub use bloom::{murmur3_32, BloomFilter};
pub use message::{
    FilterLoad, InvKind, InvVect, Message, MAX_INV_PER_MSG, NODE_BLOOM, NODE_NETWORK,
    PROTOCOL_VERSION,
};
