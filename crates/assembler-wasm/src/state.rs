//! Serializable state handed to JavaScript.

use assembler_core::hash::{count_leading_zeros, hash_to_display_hex, Hash256};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

/// Mining statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MiningStats {
    /// Total hashes computed.
    pub total_hashes: u64,
    /// Current hash rate (hashes per second).
    pub hash_rate: f64,
    /// Whether a valid block was found.
    pub block_found: bool,
    /// Next nonce to try.
    pub current_nonce: u32,
    /// Whether every nonce in the search window was tried.
    pub exhausted: bool,
    /// Elapsed time in milliseconds.
    pub elapsed_ms: f64,
    /// Hash of the found block, display format.
    pub block_hash: Option<String>,
    /// Number of leading zeros in the found block's hash.
    pub leading_zeros: u32,
}

impl MiningStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update hash rate based on elapsed time.
    pub fn update_hash_rate(&mut self) {
        if self.elapsed_ms > 0.0 {
            self.hash_rate = (self.total_hashes as f64) / (self.elapsed_ms / 1000.0);
        }
    }

    /// Format hash rate for display.
    pub fn format_hash_rate(&self) -> String {
        if self.hash_rate >= 1_000_000_000.0 {
            format!("{:.2} GH/s", self.hash_rate / 1_000_000_000.0)
        } else if self.hash_rate >= 1_000_000.0 {
            format!("{:.2} MH/s", self.hash_rate / 1_000_000.0)
        } else if self.hash_rate >= 1_000.0 {
            format!("{:.2} KH/s", self.hash_rate / 1_000.0)
        } else {
            format!("{:.2} H/s", self.hash_rate)
        }
    }

    /// Convert to a JavaScript object.
    pub fn to_js(&self) -> Result<JsValue, JsValue> {
        to_js(self)
    }
}

/// Prepared block information for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateInfo {
    /// Block height.
    pub height: u32,
    /// Previous block hash (display format).
    pub prev_hash: String,
    /// Difficulty bits (compact format).
    pub bits: u32,
    /// Target as big-endian hex.
    pub target: String,
    /// Network difficulty.
    pub difficulty: f64,
    /// Human-readable difficulty.
    pub difficulty_display: String,
    /// Average number of hashes needed to find the block.
    pub expected_hashes: f64,
    /// Candidates loaded.
    pub candidates: usize,
    /// Candidates accepted by the verifier.
    pub selected: usize,
    /// Collected fees in satoshis.
    pub fees: u64,
    /// Block reward (subsidy + fees) in satoshis.
    pub reward: u64,
    /// Block reward in BTC.
    pub reward_btc: f64,
    /// Merkle root (display format).
    pub merkle_root: String,
    /// Coinbase txid (display format).
    pub coinbase_txid: String,
}

impl TemplateInfo {
    /// Convert to a JavaScript object.
    pub fn to_js(&self) -> Result<JsValue, JsValue> {
        to_js(self)
    }
}

/// Result of a mining batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningResultInfo {
    /// Whether a valid block was found.
    pub block_found: bool,
    /// The winning nonce (if found).
    pub nonce: Option<u32>,
    /// The block hash (if found), display format.
    pub hash: Option<String>,
    /// Number of leading zeros in hash.
    pub leading_zeros: u32,
    /// Hashes computed in this batch.
    pub hashes_computed: u64,
}

impl MiningResultInfo {
    /// Result of a batch that found a block at `nonce`.
    pub fn found(nonce: u32, hash: &Hash256, hashes_computed: u64) -> Self {
        MiningResultInfo {
            block_found: true,
            nonce: Some(nonce),
            hash: Some(hash_to_display_hex(hash)),
            leading_zeros: count_leading_zeros(hash),
            hashes_computed,
        }
    }

    /// Result of a batch without a winning nonce.
    pub fn not_found(hashes_computed: u64) -> Self {
        MiningResultInfo {
            block_found: false,
            nonce: None,
            hash: None,
            leading_zeros: 0,
            hashes_computed,
        }
    }

    /// Convert to a JavaScript object.
    pub fn to_js(&self) -> Result<JsValue, JsValue> {
        to_js(self)
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {:?}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_hash_rate() {
        let mut stats = MiningStats::new();
        assert_eq!(stats.format_hash_rate(), "0.00 H/s");

        stats.total_hashes = 2_500_000;
        stats.elapsed_ms = 1000.0;
        stats.update_hash_rate();
        assert_eq!(stats.format_hash_rate(), "2.50 MH/s");
    }

    #[test]
    fn test_found_result_reports_display_hash() {
        // Internal order: the displayed leading zeros are the trailing bytes
        let mut hash = [0xffu8; 32];
        hash[30] = 0x00;
        hash[31] = 0x00;

        let info = MiningResultInfo::found(7, &hash, 8);
        assert!(info.block_found);
        assert_eq!(info.nonce, Some(7));
        assert_eq!(info.leading_zeros, 16);
        assert!(info.hash.unwrap().starts_with("0000ff"));
        assert_eq!(info.hashes_computed, 8);

        let info = MiningResultInfo::not_found(64);
        assert!(!info.block_found);
        assert_eq!(info.nonce, None);
        assert_eq!(info.hashes_computed, 64);
    }
}
