//! BIP37-style bloom filter.
//!
//! The filter is loaded onto remote peers so they relay only matching
//! transactions. Sizing follows the standard formulas: for `n` elements and
//! target false-positive rate `p`, the bit count is `-n * ln(p) / ln(2)^2`
//! and the hash-function count is `bits / n * ln(2)`, both capped by the
//! wire-format limits.

use crate::message::{FilterLoad, MAX_FILTER_HASH_FUNCS, MAX_FILTER_SIZE};

// Seed multiplier fixed by BIP37 so filter matches are reproducible.
const HASH_SEED_MULTIPLIER: u32 = 0xfba4_c795;

const LN2: f64 = std::f64::consts::LN_2;

#[derive(Clone, Debug)]
pub struct BloomFilter {
    bits: Vec<u8>,
    hash_funcs: u32,
    tweak: u32,
    flags: u8,
}

impl BloomFilter {
    /// Build a filter sized for `elements` entries at `false_positive_rate`.
    pub fn new(elements: u32, false_positive_rate: f64, tweak: u32, flags: u8) -> Self {
        let elements = f64::from(elements.max(1));
        let rate = false_positive_rate.clamp(1e-9, 1.0);
        let bit_count = -elements * rate.ln() / (LN2 * LN2);
        let byte_len = ((bit_count / 8.0).ceil() as usize).clamp(1, MAX_FILTER_SIZE);
        let hash_funcs = ((byte_len as f64) * 8.0 / elements * LN2).ceil() as u32;
        let hash_funcs = hash_funcs.clamp(1, MAX_FILTER_HASH_FUNCS);
        Self {
            bits: vec![0u8; byte_len],
            hash_funcs,
            tweak,
            flags,
        }
    }

    pub fn from_filter_load(load: &FilterLoad) -> Self {
        Self {
            bits: load.filter.clone(),
            hash_funcs: load.hash_funcs.clamp(1, MAX_FILTER_HASH_FUNCS),
            tweak: load.tweak,
            flags: load.flags,
        }
    }

    fn bit_index(&self, hash_num: u32, data: &[u8]) -> usize {
        let seed = hash_num
            .wrapping_mul(HASH_SEED_MULTIPLIER)
            .wrapping_add(self.tweak);
        (murmur3_32(data, seed) as usize) % (self.bits.len() * 8)
    }

    pub fn insert(&mut self, data: &[u8]) {
        for hash_num in 0..self.hash_funcs {
            let index = self.bit_index(hash_num, data);
            self.bits[index >> 3] |= 1 << (index & 7);
        }
    }

    pub fn contains(&self, data: &[u8]) -> bool {
        (0..self.hash_funcs).all(|hash_num| {
            let index = self.bit_index(hash_num, data);
            self.bits[index >> 3] & (1 << (index & 7)) != 0
        })
    }

    pub fn filter_load(&self) -> FilterLoad {
        FilterLoad {
            filter: self.bits.clone(),
            hash_funcs: self.hash_funcs,
            tweak: self.tweak,
            flags: self.flags,
        }
    }
}

/// 32-bit MurmurHash3, the hash function BIP37 filters are defined over.
pub fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    const C1: u32 = 0xcc9e_2d51;
    const C2: u32 = 0x1b87_3593;

    let mut h = seed;
    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(C1);
        k = k.rotate_left(15);
        k = k.wrapping_mul(C2);
        h ^= k;
        h = h.rotate_left(13);
        h = h.wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut k = 0u32;
        for (i, byte) in tail.iter().enumerate() {
            k ^= u32::from(*byte) << (8 * i);
        }
        k = k.wrapping_mul(C1);
        k = k.rotate_left(15);
        k = k.wrapping_mul(C2);
        h ^= k;
    }

    h ^= data.len() as u32;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}
