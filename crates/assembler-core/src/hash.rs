//! SHA256 double-hashing and byte-order helpers.

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// A 32-byte digest, in internal byte order unless stated otherwise.
pub type Hash256 = [u8; 32];

/// Bitcoin's double SHA256: SHA256(SHA256(data)).
///
/// This is used for block header hashing, transaction IDs, merkle trees and
/// the witness commitment.
#[inline]
pub fn double_sha256(data: &[u8]) -> Hash256 {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    second.into()
}

/// Single SHA256 hash.
#[inline]
pub fn sha256(data: &[u8]) -> Hash256 {
    Sha256::digest(data).into()
}

/// Reverse the byte order of a 32-byte array.
///
/// Bitcoin displays hashes in reverse byte order relative to how they are
/// hashed and serialized.
#[inline]
pub fn reverse_bytes(bytes: &Hash256) -> Hash256 {
    let mut reversed = *bytes;
    reversed.reverse();
    reversed
}

/// Convert a hash to its display format (reversed hex).
pub fn hash_to_display_hex(hash: &Hash256) -> String {
    hex::encode(reverse_bytes(hash))
}

/// Parse a display-format (reversed) hex hash into internal byte order.
pub fn display_hex_to_hash(field: &'static str, display: &str) -> Result<Hash256> {
    let bytes = hex::decode(display).map_err(|e| Error::malformed(field, e.to_string()))?;
    let mut hash: Hash256 = bytes.as_slice().try_into().map_err(|_| {
        Error::malformed(field, format!("expected 32 bytes, got {}", bytes.len()))
    })?;
    hash.reverse();
    Ok(hash)
}

/// Count leading zero bits in the DISPLAYED hash format.
///
/// The "leading zeros" of a displayed block hash like "00000000000..." are
/// the trailing bytes of the internal representation.
pub fn count_leading_zeros(hash: &Hash256) -> u32 {
    let mut zeros = 0u32;
    for byte in hash.iter().rev() {
        if *byte == 0 {
            zeros += 8;
        } else {
            zeros += byte.leading_zeros();
            break;
        }
    }
    zeros
}
