//! SegWit witness commitment (BIP141).
//!
//! The commitment is placed in a zero-value coinbase output:
//!
//! ```text
//! OP_RETURN OP_PUSHBYTES_36 [aa21a9ed] [32-byte commitment]
//! ```
//!
//! where the commitment is `SHA256d(witness_root || witness_reserved_value)`
//! and the reserved value is carried as the single witness item of the
//! coinbase input.

use crate::coinbase::{CoinbaseTransaction, TxOutput};
use crate::consensus::{opcodes, WITNESS_COMMITMENT_HEADER, WITNESS_RESERVED_VALUE};
use crate::hash::{double_sha256, Hash256};

/// Compute the witness commitment from a witness merkle root and reserved value.
pub fn compute_witness_commitment(
    witness_root: &Hash256,
    witness_reserved_value: &[u8; 32],
) -> Hash256 {
    let mut data = [0u8; 64];
    data[..32].copy_from_slice(witness_root);
    data[32..].copy_from_slice(witness_reserved_value);

    double_sha256(&data)
}

/// Generate the scriptPubKey for a witness commitment output.
pub fn witness_commitment_script(witness_commitment: &Hash256) -> Vec<u8> {
    let mut script = Vec::with_capacity(38);

    script.push(opcodes::OP_RETURN);

    // Push 36 bytes
    script.push(0x24);

    script.extend_from_slice(&WITNESS_COMMITMENT_HEADER);
    script.extend_from_slice(witness_commitment);

    script
}

/// Embed the witness commitment into a coinbase transaction.
///
/// Appends the commitment output, attaches the reserved value as the input
/// witness and returns the full serialization (witness included) as hex.
/// After this the coinbase's wtxid differs from its txid.
pub fn embed_commitment(coinbase: &mut CoinbaseTransaction, witness_root: &Hash256) -> String {
    let commitment = compute_witness_commitment(witness_root, &WITNESS_RESERVED_VALUE);

    coinbase.outputs.push(TxOutput {
        value: 0,
        script_pubkey: witness_commitment_script(&commitment),
    });
    coinbase.input.witness = vec![WITNESS_RESERVED_VALUE.to_vec()];

    tracing::debug!(commitment = %hex::encode(commitment), "embedded witness commitment");

    coinbase.to_hex()
}
