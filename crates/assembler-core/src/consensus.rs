//! Protocol-fixed constants and the block subsidy schedule.

/// Size of a block header in bytes.
pub const BLOCK_HEADER_SIZE: usize = 80;

/// Size of the header prefix that stays fixed while the nonce varies.
pub const HEADER_PREFIX_SIZE: usize = 76;

/// Initial block subsidy: 50 BTC in satoshis.
pub const INITIAL_SUBSIDY: u64 = 5_000_000_000;

/// Number of blocks between subsidy halvings.
pub const SUBSIDY_HALVING_INTERVAL: u32 = 210_000;

/// Version field of the coinbase transaction.
pub const COINBASE_TX_VERSION: u32 = 1;

/// Lock time of the coinbase transaction.
pub const COINBASE_LOCK_TIME: u32 = 0;

/// Previous txid referenced by a coinbase input (the null outpoint).
pub const NULL_OUTPOINT_TXID: [u8; 32] = [0u8; 32];

/// Previous output index referenced by a coinbase input.
pub const NULL_OUTPOINT_INDEX: u32 = 0xFFFF_FFFF;

/// Sequence number of the coinbase input.
pub const SEQUENCE_FINAL: u32 = 0xFFFF_FFFF;

/// SegWit serialization marker byte.
pub const SEGWIT_MARKER: u8 = 0x00;

/// SegWit serialization flag byte.
pub const SEGWIT_FLAG: u8 = 0x01;

/// Witness commitment header (BIP141 magic).
pub const WITNESS_COMMITMENT_HEADER: [u8; 4] = [0xaa, 0x21, 0xa9, 0xed];

/// Witness reserved value carried in the coinbase witness.
pub const WITNESS_RESERVED_VALUE: [u8; 32] = [0u8; 32];

/// wtxid used for the coinbase slot of the witness merkle tree.
pub const COINBASE_WTXID: [u8; 32] = [0u8; 32];

/// Script opcodes used by the coinbase outputs.
pub mod opcodes {
    pub const OP_DUP: u8 = 0x76;
    pub const OP_HASH160: u8 = 0xa9;
    pub const OP_EQUALVERIFY: u8 = 0x88;
    pub const OP_CHECKSIG: u8 = 0xac;
    pub const OP_RETURN: u8 = 0x6a;
}

/// Calculate block subsidy in satoshis for a given height.
///
/// The subsidy halves every 210,000 blocks, starting at 50 BTC, using
/// integer shifts so no rounding can creep in at high halving counts.
pub fn block_subsidy(height: u32) -> u64 {
    let halvings = height / SUBSIDY_HALVING_INTERVAL;
    if halvings >= 64 {
        return 0;
    }
    INITIAL_SUBSIDY >> halvings
}
