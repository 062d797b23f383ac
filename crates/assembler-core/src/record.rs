//! Candidate transaction records.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hash::{display_hex_to_hash, double_sha256, Hash256};

/// A candidate transaction as supplied by the mempool source.
///
/// Field names follow the mempool JSON files; unknown fields are ignored.
/// The fee is signed here so that negative values can be rejected with a
/// clear error instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransactionRecord {
    pub txid: String,
    pub hex: String,
    pub fee: i64,
}

/// A validated candidate transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    txid: Hash256,
    hex: String,
    raw: Vec<u8>,
    fee: u64,
}

impl TransactionRecord {
    /// Build a record from a display-order txid, raw transaction hex and fee.
    pub fn new(txid: &str, hex: &str, fee: u64) -> Result<Self> {
        let txid = display_hex_to_hash("txid", txid)?;
        let raw = hex::decode(hex).map_err(|e| Error::malformed("hex", e.to_string()))?;
        if raw.is_empty() {
            return Err(Error::malformed("hex", "empty transaction"));
        }

        Ok(TransactionRecord {
            txid,
            hex: hex.to_ascii_lowercase(),
            raw,
            fee,
        })
    }

    /// Transaction ID in internal byte order.
    pub fn txid(&self) -> &Hash256 {
        &self.txid
    }

    /// Transaction ID in display byte order.
    pub fn txid_display(&self) -> String {
        crate::hash::hash_to_display_hex(&self.txid)
    }

    /// Raw transaction as lowercase hex.
    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Raw transaction bytes.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Fee in satoshis.
    pub fn fee(&self) -> u64 {
        self.fee
    }

    /// Witness transaction ID (hash of the full serialization), internal order.
    pub fn wtxid(&self) -> Hash256 {
        double_sha256(&self.raw)
    }
}

impl TryFrom<RawTransactionRecord> for TransactionRecord {
    type Error = Error;

    fn try_from(raw: RawTransactionRecord) -> Result<Self> {
        let fee = u64::try_from(raw.fee)
            .map_err(|_| Error::malformed("fee", format!("negative fee {}", raw.fee)))?;
        TransactionRecord::new(&raw.txid, &raw.hex, fee)
    }
}
