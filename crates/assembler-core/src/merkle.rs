//! Merkle tree computation for Bitcoin transactions.

use crate::error::Result;
use crate::hash::{display_hex_to_hash, double_sha256, Hash256};

/// Compute the merkle root from a list of digests in internal byte order.
///
/// A single digest is its own root and is returned without hashing. Each
/// level pairs adjacent digests; an odd level pairs its last digest with
/// itself. Returns `None` for an empty list.
pub fn compute_merkle_root(leaves: &[Hash256]) -> Option<Hash256> {
    let mut current_level: Vec<Hash256> = leaves.to_vec();

    while current_level.len() > 1 {
        let mut next_level = Vec::with_capacity(current_level.len().div_ceil(2));

        for pair in current_level.chunks(2) {
            let left = pair[0];
            let right = pair.get(1).copied().unwrap_or(left);

            let mut combined = [0u8; 64];
            combined[..32].copy_from_slice(&left);
            combined[32..].copy_from_slice(&right);
            next_level.push(double_sha256(&combined));
        }

        current_level = next_level;
    }

    current_level.first().copied()
}

/// Compute the merkle root from identifiers given in display (reversed) hex.
///
/// Each identifier is decoded into internal byte order before hashing. The
/// root is returned in internal byte order.
pub fn merkle_root_from_display<S: AsRef<str>>(ids: &[S]) -> Result<Option<Hash256>> {
    let leaves = ids
        .iter()
        .map(|id| display_hex_to_hash("merkle leaf", id.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    Ok(compute_merkle_root(&leaves))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::hash::hash_to_display_hex;

    fn hash_pair(left: &Hash256, right: &Hash256) -> Hash256 {
        let mut combined = [0u8; 64];
        combined[..32].copy_from_slice(left);
        combined[32..].copy_from_slice(right);
        double_sha256(&combined)
    }

    #[test]
    fn test_empty_merkle_root() {
        assert_eq!(compute_merkle_root(&[]), None);
        assert_eq!(merkle_root_from_display::<&str>(&[]).unwrap(), None);
    }

    #[test]
    fn test_single_tx_merkle_root() {
        let txid = [0x42u8; 32];
        let root = compute_merkle_root(&[txid]);
        assert_eq!(root, Some(txid));
    }

    #[test]
    fn test_two_tx_merkle_root() {
        let tx1 = [0x11u8; 32];
        let tx2 = [0x22u8; 32];

        let root = compute_merkle_root(&[tx1, tx2]).unwrap();
        assert_eq!(root, hash_pair(&tx1, &tx2));
    }

    #[test]
    fn test_three_tx_merkle_root() {
        // With 3 transactions, the third is paired with itself
        let tx1 = [0x11u8; 32];
        let tx2 = [0x22u8; 32];
        let tx3 = [0x33u8; 32];

        let root = compute_merkle_root(&[tx1, tx2, tx3]).unwrap();

        let h12 = hash_pair(&tx1, &tx2);
        let h33 = hash_pair(&tx3, &tx3);
        assert_eq!(root, hash_pair(&h12, &h33));

        // The duplicated leaf is not the same tree as the two-leaf one
        assert_ne!(root, compute_merkle_root(&[tx1, tx2]).unwrap());
    }

    #[test]
    fn test_five_tx_merkle_root_duplicates_on_every_odd_level() {
        let txs: Vec<Hash256> = (1..=5u8).map(|b| [b; 32]).collect();
        let root = compute_merkle_root(&txs).unwrap();

        // Level 1 has three nodes, so its last node is duplicated as well
        let h12 = hash_pair(&txs[0], &txs[1]);
        let h34 = hash_pair(&txs[2], &txs[3]);
        let h55 = hash_pair(&txs[4], &txs[4]);
        let left = hash_pair(&h12, &h34);
        let right = hash_pair(&h55, &h55);
        assert_eq!(root, hash_pair(&left, &right));
    }

    #[test]
    fn test_display_ids_are_reversed_before_hashing() {
        let tx1 = [0x01u8; 32];
        let mut tx2 = [0u8; 32];
        tx2[0] = 0xff;

        let ids = [hash_to_display_hex(&tx1), hash_to_display_hex(&tx2)];
        let root = merkle_root_from_display(&ids).unwrap().unwrap();
        assert_eq!(root, hash_pair(&tx1, &tx2));

        // A lone display id comes back in internal order, unhashed
        let single = merkle_root_from_display(&ids[1..]).unwrap().unwrap();
        assert_eq!(single, tx2);
    }

    #[test]
    fn test_block_170_merkle_root() {
        // First block with a non-coinbase transaction
        let ids = [
            "b1fea52486ce0c62bb442b530a3f0132b826c74e473d1f2c220bfa78111c5082",
            "f4184fc596403b9d638783cf57adfe4c75c605f6356fbc91338530e9831e9e16",
        ];
        let root = merkle_root_from_display(&ids).unwrap().unwrap();
        assert_eq!(
            hash_to_display_hex(&root),
            "7dac2c5666815c17a3b36427de37bb9d2e2c5ccec3f8633eb91a4205cb4c10ff"
        );
    }

    #[test]
    fn test_malformed_display_id() {
        let err = merkle_root_from_display(&["not hex"]).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { .. }));
    }
}
