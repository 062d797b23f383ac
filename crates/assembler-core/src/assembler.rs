//! Block assembly pipeline.
//!
//! [`BlockAssembler`] validates its parameters once, then turns a set of
//! candidate transactions into a [`BlockArtifact`]:
//!
//! 1. keep the candidates the signature verifier accepts
//! 2. pay subsidy plus fees to the coinbase
//! 3. commit to the witness merkle root (coinbase slot zeroed) in the coinbase
//! 4. build the transaction merkle root over the final coinbase and candidates
//! 5. search the header nonce
//!
//! Callers that drive the search themselves (for example in small batches)
//! use [`BlockAssembler::prepare`] and [`PreparedBlock::finish`].

use std::sync::atomic::AtomicBool;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::block::{BlockArtifact, BlockHeader};
use crate::coinbase::{CoinbaseBuilder, CoinbaseTransaction};
use crate::consensus::{block_subsidy, COINBASE_WTXID};
use crate::difficulty::Target;
use crate::error::{Error, Result};
use crate::filter::{select_valid, total_fees, SignatureVerifier};
use crate::hash::{display_hex_to_hash, hash_to_display_hex, Hash256};
use crate::merkle::compute_merkle_root;
use crate::miner::{mine_header, MinedHeader, SearchLimits};
use crate::record::TransactionRecord;
use crate::witness::embed_commitment;

/// Default block height.
pub const DEFAULT_HEIGHT: u32 = 10;

/// Default block version.
pub const DEFAULT_VERSION: i32 = 4;

/// Default compact target; expands to `0000ffff00...00`.
pub const DEFAULT_BITS: u32 = 0x1f00ffff;

/// Parameters of one block build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockParams {
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_version")]
    pub version: i32,
    /// Previous block hash, display hex.
    #[serde(default = "default_prev_block_hash")]
    pub prev_block_hash: String,
    /// Header timestamp (Unix time).
    #[serde(default)]
    pub time: u32,
    #[serde(default = "default_bits")]
    pub bits: u32,
    /// Explicit target as hex; the target encoded by `bits` when absent.
    #[serde(default)]
    pub target: Option<String>,
    /// Identity the block reward is paid to.
    pub payout: String,
    #[serde(default)]
    pub limits: SearchLimits,
}

fn default_height() -> u32 {
    DEFAULT_HEIGHT
}

fn default_version() -> i32 {
    DEFAULT_VERSION
}

fn default_prev_block_hash() -> String {
    hex::encode([0u8; 32])
}

fn default_bits() -> u32 {
    DEFAULT_BITS
}

impl BlockParams {
    /// Parameters with default values paying to `payout`.
    pub fn new(payout: impl Into<String>) -> Self {
        BlockParams {
            height: DEFAULT_HEIGHT,
            version: DEFAULT_VERSION,
            prev_block_hash: default_prev_block_hash(),
            time: 0,
            bits: DEFAULT_BITS,
            target: None,
            payout: payout.into(),
            limits: SearchLimits::default(),
        }
    }
}

/// Validated block parameters, ready to assemble blocks.
#[derive(Debug, Clone)]
pub struct BlockAssembler {
    params: BlockParams,
    prev_block_hash: Hash256,
    target: Target,
}

impl BlockAssembler {
    /// Validate `params`.
    ///
    /// Fails with [`Error::MalformedInput`] before any hashing work when the
    /// previous block hash or target does not decode, the target is zero or
    /// the payout identity is empty.
    pub fn new(params: BlockParams) -> Result<Self> {
        let prev_block_hash = display_hex_to_hash("prev_block_hash", &params.prev_block_hash)?;

        let bits_target = Target::from_bits(params.bits);
        let target = match &params.target {
            Some(hex) => {
                let target = Target::from_hex(hex)?;
                if target != bits_target {
                    warn!(%target, bits = format_args!("{:#010x}", params.bits), "target differs from the one encoded in bits");
                }
                target
            }
            None => bits_target,
        };

        if target == Target::from_be_bytes([0u8; 32]) {
            return Err(Error::malformed("target", "zero target can never be met"));
        }

        if params.payout.trim().is_empty() {
            return Err(Error::malformed("payout", "empty payout identity"));
        }

        Ok(BlockAssembler {
            params,
            prev_block_hash,
            target,
        })
    }

    pub fn params(&self) -> &BlockParams {
        &self.params
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Run every step up to, but excluding, the nonce search.
    pub fn prepare<V>(&self, candidates: &[TransactionRecord], verifier: &V) -> Result<PreparedBlock>
    where
        V: SignatureVerifier + ?Sized,
    {
        let transactions = select_valid(candidates, verifier);
        let fees = total_fees(&transactions)?;
        let subsidy = block_subsidy(self.params.height);
        let reward = subsidy
            .checked_add(fees)
            .ok_or_else(|| Error::malformed("fee", "reward overflows u64"))?;

        info!(
            candidates = candidates.len(),
            selected = transactions.len(),
            fees,
            subsidy,
            "selected transactions"
        );

        let mut coinbase = CoinbaseBuilder::new(self.params.height, self.params.payout.as_str()).build(reward);

        let wtxids: Vec<Hash256> = core::iter::once(COINBASE_WTXID)
            .chain(transactions.iter().map(TransactionRecord::wtxid))
            .collect();
        let witness_root = compute_merkle_root(&wtxids).ok_or(Error::EmptyMerkleInput)?;
        let coinbase_tx = embed_commitment(&mut coinbase, &witness_root);

        // The commitment output is part of the txid preimage, so the coinbase
        // txid is taken after embedding
        let txids: Vec<Hash256> = core::iter::once(coinbase.txid())
            .chain(transactions.iter().map(|tx| *tx.txid()))
            .collect();
        let merkle_root = compute_merkle_root(&txids).ok_or(Error::EmptyMerkleInput)?;

        let header = BlockHeader::new(
            self.params.version,
            self.prev_block_hash,
            merkle_root,
            self.params.time,
            self.params.bits,
        );

        Ok(PreparedBlock {
            header,
            target: self.target,
            coinbase,
            coinbase_tx,
            txids: txids.iter().map(hash_to_display_hex).collect(),
            transactions,
            fees,
            subsidy,
        })
    }

    /// Assemble and mine a block from `candidates`.
    ///
    /// The search is bounded by the parameters' [`SearchLimits`] and stops
    /// when `cancel` is set.
    pub fn assemble<V>(
        &self,
        candidates: &[TransactionRecord],
        verifier: &V,
        cancel: &AtomicBool,
    ) -> Result<BlockArtifact>
    where
        V: SignatureVerifier + ?Sized,
    {
        let prepared = self.prepare(candidates, verifier)?;
        prepared.mine(self.params.limits, cancel)
    }
}

/// A block with everything but its nonce decided.
#[derive(Debug, Clone)]
pub struct PreparedBlock {
    /// Header with a zero nonce.
    pub header: BlockHeader,
    pub target: Target,
    /// Final coinbase, commitment and witness included.
    pub coinbase: CoinbaseTransaction,
    /// Hex serialization of the final coinbase.
    pub coinbase_tx: String,
    /// Display txids, coinbase first.
    pub txids: Vec<String>,
    /// Selected candidate transactions, in input order.
    pub transactions: Vec<TransactionRecord>,
    pub fees: u64,
    pub subsidy: u64,
}

impl PreparedBlock {
    /// Total coinbase reward.
    pub fn reward(&self) -> u64 {
        self.coinbase.reward()
    }

    /// Package the block with the given winning nonce.
    pub fn finish(&self, nonce: u32) -> BlockArtifact {
        let mut header = self.header;
        header.nonce = nonce;
        BlockArtifact::new(&header, self.coinbase_tx.clone(), self.txids.clone())
    }

    /// Search the nonce and package the block.
    pub fn mine(&self, limits: SearchLimits, cancel: &AtomicBool) -> Result<BlockArtifact> {
        let MinedHeader { header, hash, attempts } = mine_header(&self.header, &self.target, limits, cancel)?;

        info!(
            nonce = header.nonce,
            attempts,
            hash = %hash_to_display_hex(&hash),
            txs = self.txids.len(),
            "block mined"
        );

        Ok(self.finish(header.nonce))
    }

    /// Like [`PreparedBlock::mine`] on the rayon thread pool.
    #[cfg(feature = "parallel")]
    pub fn mine_parallel(&self, limits: SearchLimits, cancel: &AtomicBool) -> Result<BlockArtifact> {
        let mined = crate::miner::mine_header_parallel(&self.header, &self.target, limits, cancel)?;

        info!(
            nonce = mined.header.nonce,
            hash = %hash_to_display_hex(&mined.hash),
            txs = self.txids.len(),
            "block mined"
        );

        Ok(self.finish(mined.header.nonce))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::AcceptAll;

    fn easy_params() -> BlockParams {
        BlockParams {
            height: 0,
            target: Some(format!("00ff{}", "ff".repeat(30))),
            time: 1700000000,
            ..BlockParams::new("miner")
        }
    }

    #[test]
    fn test_params_from_json_defaults() {
        let params: BlockParams = serde_json::from_str(r#"{"payout": "miner"}"#).unwrap();
        assert_eq!(params, BlockParams::new("miner"));
        assert_eq!(params.limits, SearchLimits::default());

        let assembler = BlockAssembler::new(params).unwrap();
        assert_eq!(
            assembler.target().to_string(),
            "0000ffff00000000000000000000000000000000000000000000000000000000"
        );
    }

    #[test]
    fn test_rejects_malformed_params() {
        let bad_target = BlockParams {
            target: Some("not-hex".into()),
            ..BlockParams::new("miner")
        };
        assert!(matches!(
            BlockAssembler::new(bad_target),
            Err(Error::MalformedInput { field: "target", .. })
        ));

        let zero_target = BlockParams {
            target: Some("00".into()),
            ..BlockParams::new("miner")
        };
        assert!(matches!(
            BlockAssembler::new(zero_target),
            Err(Error::MalformedInput { field: "target", .. })
        ));

        let short_prev = BlockParams {
            prev_block_hash: "00ff".into(),
            ..BlockParams::new("miner")
        };
        assert!(matches!(
            BlockAssembler::new(short_prev),
            Err(Error::MalformedInput { field: "prev_block_hash", .. })
        ));

        assert!(matches!(
            BlockAssembler::new(BlockParams::new(" ")),
            Err(Error::MalformedInput { field: "payout", .. })
        ));
    }

    #[test]
    fn test_prepare_coinbase_only() {
        let assembler = BlockAssembler::new(easy_params()).unwrap();
        let prepared = assembler.prepare(&[], &AcceptAll).unwrap();

        assert_eq!(prepared.subsidy, 5_000_000_000);
        assert_eq!(prepared.fees, 0);
        assert_eq!(prepared.reward(), 5_000_000_000);
        assert_eq!(prepared.txids, vec![prepared.coinbase.txid_display()]);
        assert_eq!(prepared.header.merkle_root, prepared.coinbase.txid());
        assert_eq!(prepared.coinbase_tx, prepared.coinbase.to_hex());
    }

    #[test]
    fn test_block_lists_post_commitment_coinbase_txid() {
        let params = easy_params();
        let assembler = BlockAssembler::new(params.clone()).unwrap();
        let prepared = assembler.prepare(&[], &AcceptAll).unwrap();

        let (_, bare_txid) = crate::coinbase::build_coinbase(
            params.height,
            prepared.reward(),
            &params.payout,
        );
        assert_ne!(prepared.txids[0], bare_txid);
        assert_eq!(prepared.txids[0], prepared.coinbase.txid_display());
    }

    #[test]
    fn test_finish_sets_nonce() {
        let assembler = BlockAssembler::new(easy_params()).unwrap();
        let prepared = assembler.prepare(&[], &AcceptAll).unwrap();

        let artifact = prepared.finish(42);
        let header = artifact.block_header().unwrap();
        assert_eq!(header.nonce, 42);
        assert_eq!(header.merkle_root, prepared.header.merkle_root);
    }
}
