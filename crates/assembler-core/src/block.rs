//! Bitcoin block header construction and the assembled block artifact.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::consensus::{BLOCK_HEADER_SIZE, HEADER_PREFIX_SIZE};
use crate::error::{Error, Result};
use crate::hash::{double_sha256, hash_to_display_hex, Hash256};

/// A Bitcoin block header (80 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub version: i32,
    /// Hash of the previous block (internal byte order).
    pub prev_block_hash: Hash256,
    /// Merkle root of all transactions (internal byte order).
    pub merkle_root: Hash256,
    /// Block timestamp (Unix time).
    pub timestamp: u32,
    /// Difficulty target in compact "bits" format.
    pub bits: u32,
    pub nonce: u32,
}

impl BlockHeader {
    /// Create a new block header with a zero nonce.
    pub fn new(
        version: i32,
        prev_block_hash: Hash256,
        merkle_root: Hash256,
        timestamp: u32,
        bits: u32,
    ) -> Self {
        BlockHeader {
            version,
            prev_block_hash,
            merkle_root,
            timestamp,
            bits,
            nonce: 0,
        }
    }

    /// Serialize the block header to 80 bytes.
    pub fn serialize(&self) -> [u8; BLOCK_HEADER_SIZE] {
        let mut header = [0u8; BLOCK_HEADER_SIZE];
        header[..HEADER_PREFIX_SIZE].copy_from_slice(&self.serialize_without_nonce());
        header[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        header
    }

    /// Serialize the header without the nonce (76 bytes).
    /// Used for mining where only the nonce changes.
    pub fn serialize_without_nonce(&self) -> [u8; HEADER_PREFIX_SIZE] {
        let mut header = [0u8; HEADER_PREFIX_SIZE];

        header[0..4].copy_from_slice(&self.version.to_le_bytes());
        header[4..36].copy_from_slice(&self.prev_block_hash);
        header[36..68].copy_from_slice(&self.merkle_root);
        header[68..72].copy_from_slice(&self.timestamp.to_le_bytes());
        header[72..76].copy_from_slice(&self.bits.to_le_bytes());

        header
    }

    /// Parse an 80-byte serialized header.
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let bytes: &[u8; BLOCK_HEADER_SIZE] = bytes.try_into().map_err(|_| {
            Error::malformed("header", format!("expected 80 bytes, got {}", bytes.len()))
        })?;

        let le_u32 = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let mut prev_block_hash = [0u8; 32];
        prev_block_hash.copy_from_slice(&bytes[4..36]);
        let mut merkle_root = [0u8; 32];
        merkle_root.copy_from_slice(&bytes[36..68]);

        Ok(BlockHeader {
            version: le_u32(0) as i32,
            prev_block_hash,
            merkle_root,
            timestamp: le_u32(68),
            bits: le_u32(72),
            nonce: le_u32(76),
        })
    }

    /// Compute the block hash (double SHA256), internal byte order.
    pub fn hash(&self) -> Hash256 {
        double_sha256(&self.serialize())
    }
}

/// The finished block: mined header, final coinbase and ordered txids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockArtifact {
    /// Serialized 80-byte header, as hex.
    pub header: String,
    /// Coinbase transaction with witness, as hex.
    pub coinbase_tx: String,
    /// Transaction ids in display order, coinbase first.
    pub txids: Vec<String>,
}

impl BlockArtifact {
    pub(crate) fn new(header: &BlockHeader, coinbase_tx: String, txids: Vec<String>) -> Self {
        BlockArtifact {
            header: hex::encode(header.serialize()),
            coinbase_tx,
            txids,
        }
    }

    /// Decode the header back into its fields.
    pub fn block_header(&self) -> Result<BlockHeader> {
        let bytes = hex::decode(&self.header).map_err(|e| Error::malformed("header", e.to_string()))?;
        BlockHeader::deserialize(&bytes)
    }

    /// Block hash in display byte order.
    pub fn block_hash(&self) -> Result<String> {
        Ok(hash_to_display_hex(&self.block_header()?.hash()))
    }
}

/// Renders the artifact one value per line: header, coinbase, then txids.
impl fmt::Display for BlockArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header)?;
        writeln!(f, "{}", self.coinbase_tx)?;
        for txid in &self.txids {
            writeln!(f, "{}", txid)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::display_hex_to_hash;

    fn genesis_header() -> BlockHeader {
        let merkle_root = display_hex_to_hash(
            "merkle_root",
            "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b",
        )
        .unwrap();
        let mut header = BlockHeader::new(1, [0u8; 32], merkle_root, 1231006505, 0x1d00ffff);
        header.nonce = 2083236893;
        header
    }

    #[test]
    fn test_block_header_serialization() {
        let prev_hash = [0x12u8; 32];
        let merkle_root = [0x34u8; 32];

        let mut header = BlockHeader::new(0x20000000, prev_hash, merkle_root, 1700000000, 0x17034219);
        header.nonce = 0xDEADBEEF;

        let serialized = header.serialize();

        assert_eq!(serialized.len(), 80);
        assert_eq!(&serialized[0..4], &[0x00, 0x00, 0x00, 0x20]);
        assert_eq!(&serialized[4..36], &prev_hash[..]);
        assert_eq!(&serialized[36..68], &merkle_root[..]);
        assert_eq!(&serialized[68..72], &1700000000u32.to_le_bytes());
        assert_eq!(&serialized[72..76], &[0x19, 0x42, 0x03, 0x17]);
        assert_eq!(&serialized[76..80], &[0xEF, 0xBE, 0xAD, 0xDE]);

        assert_eq!(&serialized[..76], &header.serialize_without_nonce()[..]);
    }

    #[test]
    fn test_genesis_block_hash() {
        let header = genesis_header();
        assert_eq!(
            hash_to_display_hex(&header.hash()),
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
        );
    }

    #[test]
    fn test_header_deserialize() {
        let header = genesis_header();
        let parsed = BlockHeader::deserialize(&header.serialize()).unwrap();
        assert_eq!(parsed, header);

        assert!(matches!(
            BlockHeader::deserialize(&[0u8; 79]),
            Err(Error::MalformedInput { field: "header", .. })
        ));
    }

    #[test]
    fn test_artifact_lines() {
        let header = genesis_header();
        let artifact = BlockArtifact::new(&header, "cafe".into(), vec!["aa".into(), "bb".into()]);

        let rendered = artifact.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].len(), 160);
        assert_eq!(lines[1], "cafe");
        assert_eq!(&lines[2..], &["aa", "bb"]);

        assert_eq!(
            artifact.block_hash().unwrap(),
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
        );
    }
}
