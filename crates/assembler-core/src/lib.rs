//! Core SegWit block assembly.
//!
//! This crate provides pure Rust implementations of:
//! - SHA256 double-hashing and Bitcoin byte-order helpers
//! - Merkle roots over transaction and witness transaction ids
//! - Coinbase transaction building and witness commitment embedding
//! - Candidate transaction selection through an external signature verifier
//! - Difficulty target parsing, conversion and comparison
//! - A bounded, cancellable block header nonce search
//! - The assembly pipeline producing header, coinbase and txid list

pub mod assembler;
pub mod block;
pub mod coinbase;
pub mod consensus;
pub mod difficulty;
pub mod error;
pub mod filter;
pub mod hash;
pub mod merkle;
pub mod miner;
pub mod record;
pub mod witness;

pub use assembler::{BlockAssembler, BlockParams, PreparedBlock};
pub use block::{BlockArtifact, BlockHeader};
pub use coinbase::{build_coinbase, CoinbaseBuilder, CoinbaseTransaction};
pub use consensus::block_subsidy;
pub use difficulty::{bits_to_target, hash_below_target, Target};
pub use error::{Error, Result};
pub use filter::{select_valid, total_fees, AcceptAll, SignatureVerifier, VerifyError};
pub use hash::{double_sha256, Hash256};
pub use merkle::{compute_merkle_root, merkle_root_from_display};
pub use miner::{mine_header, search_batch, MinedHeader, SearchLimits};
pub use record::{RawTransactionRecord, TransactionRecord};
pub use witness::embed_commitment;
