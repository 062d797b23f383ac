//! Coinbase transaction construction.
//!
//! The coinbase transaction is the first transaction in a block. It spends
//! the null outpoint, records the block height in its scriptSig and pays the
//! block reward (subsidy plus collected fees) to the miner.

use crate::consensus::{
    opcodes, COINBASE_LOCK_TIME, COINBASE_TX_VERSION, NULL_OUTPOINT_INDEX, NULL_OUTPOINT_TXID,
    SEGWIT_FLAG, SEGWIT_MARKER, SEQUENCE_FINAL,
};
use crate::hash::{double_sha256, hash_to_display_hex, sha256, Hash256};

/// Builder for constructing coinbase transactions.
#[derive(Debug, Clone)]
pub struct CoinbaseBuilder {
    /// The block height recorded in the scriptSig.
    block_height: u32,
    /// Opaque payout identity the reward is locked to.
    payout: String,
}

impl CoinbaseBuilder {
    /// Create a new coinbase builder.
    pub fn new(block_height: u32, payout: impl Into<String>) -> Self {
        CoinbaseBuilder {
            block_height,
            payout: payout.into(),
        }
    }

    /// Build the coinbase transaction paying `total_reward` satoshis.
    ///
    /// The result carries no witness and no commitment output yet.
    pub fn build(&self, total_reward: u64) -> CoinbaseTransaction {
        let input = TxInput {
            prev_txid: NULL_OUTPOINT_TXID,
            prev_index: NULL_OUTPOINT_INDEX,
            script_sig: build_script_sig(self.block_height),
            sequence: SEQUENCE_FINAL,
            witness: Vec::new(),
        };

        let reward_output = TxOutput {
            value: total_reward,
            script_pubkey: payout_script_pubkey(&self.payout),
        };

        CoinbaseTransaction {
            version: COINBASE_TX_VERSION,
            input,
            outputs: vec![reward_output],
            lock_time: COINBASE_LOCK_TIME,
        }
    }
}

/// Build a coinbase transaction and return it with its display txid.
///
/// The txid is taken before any witness commitment is embedded, so it is not
/// the id the block commits to once [`crate::witness::embed_commitment`] runs.
pub fn build_coinbase(height: u32, reward: u64, payout: &str) -> (CoinbaseTransaction, String) {
    let coinbase = CoinbaseBuilder::new(height, payout).build(reward);
    let txid = coinbase.txid_display();
    (coinbase, txid)
}

/// A coinbase transaction input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    pub prev_txid: Hash256,
    pub prev_index: u32,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
    /// Witness stack items; empty until a commitment is embedded.
    pub witness: Vec<Vec<u8>>,
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

/// A constructed coinbase transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinbaseTransaction {
    pub version: u32,
    /// The single input spending the null outpoint.
    pub input: TxInput,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
}

impl CoinbaseTransaction {
    /// Whether witness data has been attached.
    pub fn has_witness(&self) -> bool {
        !self.input.witness.is_empty()
    }

    /// Value of the reward output.
    pub fn reward(&self) -> u64 {
        self.outputs.first().map(|o| o.value).unwrap_or(0)
    }

    /// Serialize without witness data (the txid preimage).
    pub fn serialize_without_witness(&self) -> Vec<u8> {
        let mut raw_tx = Vec::with_capacity(200);

        raw_tx.extend_from_slice(&self.version.to_le_bytes());
        self.write_input(&mut raw_tx);
        self.write_outputs(&mut raw_tx);
        raw_tx.extend_from_slice(&self.lock_time.to_le_bytes());

        raw_tx
    }

    /// Serialize the full transaction.
    ///
    /// Uses the SegWit layout (marker, flag, witness) once a witness is
    /// attached; before that this equals [`Self::serialize_without_witness`].
    pub fn serialize(&self) -> Vec<u8> {
        if !self.has_witness() {
            return self.serialize_without_witness();
        }

        let mut raw_tx = Vec::with_capacity(300);

        raw_tx.extend_from_slice(&self.version.to_le_bytes());
        raw_tx.push(SEGWIT_MARKER);
        raw_tx.push(SEGWIT_FLAG);
        self.write_input(&mut raw_tx);
        self.write_outputs(&mut raw_tx);

        encode_varint(self.input.witness.len() as u64, &mut raw_tx);
        for item in &self.input.witness {
            encode_varint(item.len() as u64, &mut raw_tx);
            raw_tx.extend_from_slice(item);
        }

        raw_tx.extend_from_slice(&self.lock_time.to_le_bytes());

        raw_tx
    }

    /// Full serialization as hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }

    /// Transaction ID in internal byte order.
    pub fn txid(&self) -> Hash256 {
        double_sha256(&self.serialize_without_witness())
    }

    /// Transaction ID in display byte order.
    pub fn txid_display(&self) -> String {
        hash_to_display_hex(&self.txid())
    }

    /// Witness transaction ID in internal byte order.
    pub fn wtxid(&self) -> Hash256 {
        double_sha256(&self.serialize())
    }

    fn write_input(&self, out: &mut Vec<u8>) {
        // Input count - always 1 for coinbase
        out.push(0x01);
        out.extend_from_slice(&self.input.prev_txid);
        out.extend_from_slice(&self.input.prev_index.to_le_bytes());
        encode_varint(self.input.script_sig.len() as u64, out);
        out.extend_from_slice(&self.input.script_sig);
        out.extend_from_slice(&self.input.sequence.to_le_bytes());
    }

    fn write_outputs(&self, out: &mut Vec<u8>) {
        encode_varint(self.outputs.len() as u64, out);
        for output in &self.outputs {
            out.extend_from_slice(&output.value.to_le_bytes());
            encode_varint(output.script_pubkey.len() as u64, out);
            out.extend_from_slice(&output.script_pubkey);
        }
    }
}

/// Build the scriptSig: a single push of the height (4 bytes, little-endian)
/// followed by one zero byte of extra nonce.
fn build_script_sig(height: u32) -> Vec<u8> {
    let mut payload = Vec::with_capacity(5);
    payload.extend_from_slice(&height.to_le_bytes());
    payload.push(0x00);

    let mut script_sig = Vec::with_capacity(6);
    script_sig.push(payload.len() as u8); // Push opcode
    script_sig.extend_from_slice(&payload);
    script_sig
}

/// Derive the 20-byte hash the reward is locked to.
///
/// This is `SHA256(payout)[..20]`, a stand-in for real address decoding.
pub fn placeholder_pubkey_hash(payout: &str) -> [u8; 20] {
    let digest = sha256(payout.as_bytes());
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&digest[..20]);
    hash
}

/// Reward scriptPubKey: OP_DUP OP_HASH160 <20-byte-hash> OP_EQUALVERIFY OP_CHECKSIG
pub fn payout_script_pubkey(payout: &str) -> Vec<u8> {
    let hash = placeholder_pubkey_hash(payout);

    let mut script = Vec::with_capacity(25);
    script.push(opcodes::OP_DUP);
    script.push(opcodes::OP_HASH160);
    script.push(0x14); // Push 20 bytes
    script.extend_from_slice(&hash);
    script.push(opcodes::OP_EQUALVERIFY);
    script.push(opcodes::OP_CHECKSIG);
    script
}

/// Encode a variable-length integer (Bitcoin varint).
pub(crate) fn encode_varint(value: u64, output: &mut Vec<u8>) {
    if value < 0xfd {
        output.push(value as u8);
    } else if value <= 0xffff {
        output.push(0xfd);
        output.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffffffff {
        output.push(0xfe);
        output.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        output.push(0xff);
        output.extend_from_slice(&value.to_le_bytes());
    }
}
