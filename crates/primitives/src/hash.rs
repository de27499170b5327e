use sha2::{Digest, Sha256};

pub type Hash256 = [u8; 32];

/// The all-zero hash, used as the open-ended stop hash in locator requests.
pub const ZERO_HASH: Hash256 = [0u8; 32];

pub fn sha256(data: &[u8]) -> Hash256 {
    let digest = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

pub fn sha256d(data: &[u8]) -> Hash256 {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut out = [0u8; 32];
    out.copy_from_slice(&second);
    out
}

/// Render a hash in display byte order (reversed, as block explorers print).
pub fn hash256_to_hex(hash: &Hash256) -> String {
    let mut out = String::with_capacity(64);
    for byte in hash.iter().rev() {
        out.push(hex_digit(byte >> 4));
        out.push(hex_digit(byte & 0x0f));
    }
    out
}

fn hex_digit(value: u8) -> char {
    match value {
        0..=9 => (b'0' + value) as char,
        _ => (b'a' + value - 10) as char,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_display_order() {
        let mut hash = [0u8; 32];
        hash[31] = 0xab;
        hash[0] = 0x01;
        let hex = hash256_to_hex(&hash);
        assert!(hex.starts_with("ab"));
        assert!(hex.ends_with("01"));
        assert_eq!(hex.len(), 64);
    }

    #[test]
    fn double_hash_differs_from_single() {
        let data = b"spv";
        assert_ne!(sha256(data), sha256d(data));
        assert_eq!(sha256d(data), sha256(&sha256(data)));
    }
}
