//! The message vocabulary the sync manager speaks.
//!
//! Payload layouts follow the Bitcoin wire conventions: little-endian
//! integers, CompactSize counts, 32-byte hashes in wire order.

use spvd_primitives::encoding::{DecodeError, Decoder, Encoder};
use spvd_primitives::Hash256;

pub const PROTOCOL_VERSION: i32 = 70001;

/// Service bit advertised by peers that serve the full chain.
pub const NODE_NETWORK: u64 = 1;
/// Service bit advertised by peers that accept bloom-filtered connections.
pub const NODE_BLOOM: u64 = 1 << 2;

/// Maximum number of inventory vectors in a single inv/getdata message.
pub const MAX_INV_PER_MSG: usize = 50_000;

const MAX_LOCATOR_HASHES: usize = 128;

/// Maximum serialized filter size in bytes (BIP37).
pub const MAX_FILTER_SIZE: usize = 36_000;
/// Maximum number of filter hash functions (BIP37).
pub const MAX_FILTER_HASH_FUNCS: u32 = 50;

// Inventory vector min size: 4-byte kind + 32-byte hash.
const INV_VECT_SIZE: usize = 36;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum InvKind {
    Tx,
    Block,
    FilteredBlock,
    Unknown(u32),
}

impl InvKind {
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => Self::Tx,
            2 => Self::Block,
            3 => Self::FilteredBlock,
            other => Self::Unknown(other),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Self::Tx => 1,
            Self::Block => 2,
            Self::FilteredBlock => 3,
            Self::Unknown(code) => code,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct InvVect {
    pub kind: InvKind,
    pub hash: Hash256,
}

impl InvVect {
    pub fn new(kind: InvKind, hash: Hash256) -> Self {
        Self { kind, hash }
    }

    pub fn tx(hash: Hash256) -> Self {
        Self::new(InvKind::Tx, hash)
    }

    pub fn block(hash: Hash256) -> Self {
        Self::new(InvKind::Block, hash)
    }

    pub fn filtered_block(hash: Hash256) -> Self {
        Self::new(InvKind::FilteredBlock, hash)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterLoad {
    pub filter: Vec<u8>,
    pub hash_funcs: u32,
    pub tweak: u32,
    pub flags: u8,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    Inv(Vec<InvVect>),
    GetData(Vec<InvVect>),
    GetBlocks {
        locator: Vec<Hash256>,
        stop_hash: Hash256,
    },
    FilterLoad(FilterLoad),
}

impl Message {
    pub fn command(&self) -> &'static str {
        match self {
            Self::Inv(_) => "inv",
            Self::GetData(_) => "getdata",
            Self::GetBlocks { .. } => "getblocks",
            Self::FilterLoad(_) => "filterload",
        }
    }

    pub fn payload(&self) -> Vec<u8> {
        match self {
            Self::Inv(vectors) => build_inv_payload(vectors),
            Self::GetData(vectors) => build_inv_payload(vectors),
            Self::GetBlocks { locator, stop_hash } => build_getblocks_payload(locator, stop_hash),
            Self::FilterLoad(filter) => build_filterload_payload(filter),
        }
    }

    pub fn parse(command: &str, payload: &[u8]) -> Result<Self, DecodeError> {
        match command {
            "inv" => Ok(Self::Inv(parse_inv(payload)?)),
            "getdata" => Ok(Self::GetData(parse_inv(payload)?)),
            "getblocks" => {
                let (locator, stop_hash) = parse_getblocks(payload)?;
                Ok(Self::GetBlocks { locator, stop_hash })
            }
            "filterload" => Ok(Self::FilterLoad(parse_filterload(payload)?)),
            _ => Err(DecodeError::InvalidData("unknown message command")),
        }
    }
}

pub fn build_inv_payload(vectors: &[InvVect]) -> Vec<u8> {
    let mut encoder = Encoder::new();
    encoder.write_varint(vectors.len() as u64);
    for vector in vectors {
        encoder.write_u32_le(vector.kind.code());
        encoder.write_hash(&vector.hash);
    }
    encoder.into_inner()
}

pub fn parse_inv(payload: &[u8]) -> Result<Vec<InvVect>, DecodeError> {
    let mut decoder = Decoder::new(payload);
    let count = decoder.read_count(INV_VECT_SIZE)?;
    if count > MAX_INV_PER_MSG {
        return Err(DecodeError::InvalidData("inv count too large"));
    }
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let kind = InvKind::from_code(decoder.read_u32_le()?);
        let hash = decoder.read_hash()?;
        out.push(InvVect { kind, hash });
    }
    if !decoder.is_empty() {
        return Err(DecodeError::TrailingBytes);
    }
    Ok(out)
}

pub fn build_getblocks_payload(locator: &[Hash256], stop_hash: &Hash256) -> Vec<u8> {
    let mut encoder = Encoder::new();
    encoder.write_i32_le(PROTOCOL_VERSION);
    encoder.write_varint(locator.len() as u64);
    for hash in locator {
        encoder.write_hash(hash);
    }
    encoder.write_hash(stop_hash);
    encoder.into_inner()
}

pub fn parse_getblocks(payload: &[u8]) -> Result<(Vec<Hash256>, Hash256), DecodeError> {
    let mut decoder = Decoder::new(payload);
    let _protocol_version = decoder.read_i32_le()?;
    let count = decoder.read_count(32)?;
    if count > MAX_LOCATOR_HASHES {
        return Err(DecodeError::InvalidData("locator count too large"));
    }
    let mut locator = Vec::with_capacity(count);
    for _ in 0..count {
        locator.push(decoder.read_hash()?);
    }
    let stop_hash = decoder.read_hash()?;
    if !decoder.is_empty() {
        return Err(DecodeError::TrailingBytes);
    }
    Ok((locator, stop_hash))
}

pub fn build_filterload_payload(filter: &FilterLoad) -> Vec<u8> {
    let mut encoder = Encoder::new();
    encoder.write_var_bytes(&filter.filter);
    encoder.write_u32_le(filter.hash_funcs);
    encoder.write_u32_le(filter.tweak);
    encoder.write_u8(filter.flags);
    encoder.into_inner()
}

pub fn parse_filterload(payload: &[u8]) -> Result<FilterLoad, DecodeError> {
    let mut decoder = Decoder::new(payload);
    let filter = decoder.read_var_bytes()?;
    if filter.len() > MAX_FILTER_SIZE {
        return Err(DecodeError::InvalidData("filter too large"));
    }
    let hash_funcs = decoder.read_u32_le()?;
    if hash_funcs > MAX_FILTER_HASH_FUNCS {
        return Err(DecodeError::InvalidData("too many filter hash functions"));
    }
    let tweak = decoder.read_u32_le()?;
    let flags = decoder.read_u8()?;
    if !decoder.is_empty() {
        return Err(DecodeError::TrailingBytes);
    }
    Ok(FilterLoad {
        filter,
        hash_funcs,
        tweak,
        flags,
    })
}
