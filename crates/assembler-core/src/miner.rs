//! Proof-of-work nonce search over a block header.
//!
//! The search is bounded: it covers at most `max_attempts` nonces starting at
//! `start_nonce` and checks a cancel flag between batches. Running out of
//! nonces is reported as [`Error::SearchExhausted`] instead of looping.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::block::BlockHeader;
use crate::consensus::{BLOCK_HEADER_SIZE, HEADER_PREFIX_SIZE};
use crate::difficulty::Target;
use crate::error::{Error, Result};
use crate::hash::{double_sha256, Hash256};

/// Size of the whole 32-bit nonce space.
pub const NONCE_SPACE: u64 = 1 << 32;

/// Nonces hashed between two checks of the cancel flag.
pub const SEARCH_BATCH_SIZE: u32 = 1 << 16;

/// Bounds of a nonce search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchLimits {
    /// First nonce tried.
    pub start_nonce: u32,
    /// Maximum number of nonces tried, capped at the end of the nonce space.
    pub max_attempts: u64,
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits {
            start_nonce: 0,
            max_attempts: NONCE_SPACE,
        }
    }
}

impl SearchLimits {
    /// Number of nonces this search will actually cover.
    pub fn effective_attempts(&self) -> u64 {
        self.max_attempts
            .min(NONCE_SPACE - u64::from(self.start_nonce))
    }
}

/// Result of scanning one nonce window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    /// The winning nonce and hash, if any.
    pub found: Option<(u32, Hash256)>,
    /// Number of hashes computed in this batch.
    pub hashes_computed: u64,
}

/// A header whose hash meets the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinedHeader {
    pub header: BlockHeader,
    /// Block hash, internal byte order.
    pub hash: Hash256,
    /// Number of nonces tried, the winning one included.
    pub attempts: u64,
}

/// Scan `nonce_count` nonces starting at `nonce_start`.
///
/// Returns the first nonce whose double hash, read as a big-endian number
/// after byte reversal, is strictly below `target`. The window is clipped at
/// the end of the nonce space.
pub fn search_batch(
    header_without_nonce: &[u8; HEADER_PREFIX_SIZE],
    target: &Target,
    nonce_start: u32,
    nonce_count: u32,
) -> BatchOutcome {
    let mut header = [0u8; BLOCK_HEADER_SIZE];
    header[..HEADER_PREFIX_SIZE].copy_from_slice(header_without_nonce);

    let nonce_end = u64::from(nonce_start) + u64::from(nonce_count);
    let nonce_end = nonce_end.min(NONCE_SPACE);

    for nonce in u64::from(nonce_start)..nonce_end {
        let nonce = nonce as u32;
        header[76..80].copy_from_slice(&nonce.to_le_bytes());

        let hash = double_sha256(&header);
        if target.is_met_by(&hash) {
            return BatchOutcome {
                found: Some((nonce, hash)),
                hashes_computed: u64::from(nonce - nonce_start) + 1,
            };
        }
    }

    BatchOutcome {
        found: None,
        hashes_computed: nonce_end - u64::from(nonce_start),
    }
}

/// Search the nonce for `header` until its hash meets `target`.
///
/// The header's current nonce is ignored; the search starts at
/// `limits.start_nonce`. Setting `cancel` stops the search at the next batch
/// boundary.
pub fn mine_header(
    header: &BlockHeader,
    target: &Target,
    limits: SearchLimits,
    cancel: &AtomicBool,
) -> Result<MinedHeader> {
    let prefix = header.serialize_without_nonce();
    let total = limits.effective_attempts();
    let mut attempts = 0u64;

    debug!(start = limits.start_nonce, max_attempts = total, %target, "starting nonce search");

    while attempts < total {
        if cancel.load(Ordering::Relaxed) {
            return Err(Error::Cancelled { attempts });
        }

        let nonce_start = limits.start_nonce + attempts as u32;
        let count = (total - attempts).min(u64::from(SEARCH_BATCH_SIZE)) as u32;
        let outcome = search_batch(&prefix, target, nonce_start, count);
        attempts += outcome.hashes_computed;

        if let Some((nonce, hash)) = outcome.found {
            let mut header = *header;
            header.nonce = nonce;
            return Ok(MinedHeader {
                header,
                hash,
                attempts,
            });
        }

        trace!(attempts, "nonce batch exhausted");
    }

    Err(Error::SearchExhausted { attempts })
}

/// Search the same nonce window as [`mine_header`] on the rayon thread pool.
///
/// Returns the lowest winning nonce, so the result matches the sequential
/// search. `attempts` reports the winning nonce's offset plus one.
#[cfg(feature = "parallel")]
pub fn mine_header_parallel(
    header: &BlockHeader,
    target: &Target,
    limits: SearchLimits,
    cancel: &AtomicBool,
) -> Result<MinedHeader> {
    use rayon::prelude::*;

    let prefix = header.serialize_without_nonce();
    let start = u64::from(limits.start_nonce);
    let total = limits.effective_attempts();

    debug!(start, max_attempts = total, %target, "starting parallel nonce search");

    let found = (start..start + total).into_par_iter().find_first(|nonce| {
        if cancel.load(Ordering::Relaxed) {
            return false;
        }
        let mut candidate = [0u8; BLOCK_HEADER_SIZE];
        candidate[..HEADER_PREFIX_SIZE].copy_from_slice(&prefix);
        candidate[76..80].copy_from_slice(&(*nonce as u32).to_le_bytes());
        target.is_met_by(&double_sha256(&candidate))
    });

    match found {
        Some(nonce) => {
            let mut header = *header;
            header.nonce = nonce as u32;
            Ok(MinedHeader {
                header,
                hash: header.hash(),
                attempts: nonce - start + 1,
            })
        }
        // Work done before the flag was seen is not tracked across threads
        None if cancel.load(Ordering::Relaxed) => Err(Error::Cancelled { attempts: 0 }),
        None => Err(Error::SearchExhausted { attempts: total }),
    }
}
