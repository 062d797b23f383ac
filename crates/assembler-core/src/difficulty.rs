//! Difficulty target conversion and comparison.

use core::fmt;

use crate::error::{Error, Result};
use crate::hash::{reverse_bytes, Hash256};

/// A 256-bit proof-of-work target, stored big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Target([u8; 32]);

impl Target {
    /// The largest possible target; every hash except all-ones meets it.
    pub const MAX: Target = Target([0xFF; 32]);

    /// Create a target from 32 big-endian bytes.
    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Target(bytes)
    }

    /// Parse a target from hex.
    ///
    /// Accepts an optional `0x` prefix and 1 to 64 hex digits; shorter
    /// values are left-padded with zeros.
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);

        if digits.is_empty() || digits.len() > 64 {
            return Err(Error::malformed(
                "target",
                format!("expected 1 to 64 hex digits, got {}", digits.len()),
            ));
        }

        let padded = format!("{:0>64}", digits);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&padded, &mut bytes)
            .map_err(|e| Error::malformed("target", e.to_string()))?;

        Ok(Target(bytes))
    }

    /// Expand a compact "bits" value into a target.
    pub fn from_bits(bits: u32) -> Self {
        Target(bits_to_target(bits))
    }

    /// Big-endian bytes of the target.
    pub fn to_be_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Compact "bits" encoding of this target.
    pub fn to_bits(&self) -> u32 {
        target_to_bits(&self.0)
    }

    /// Check whether a block hash (internal byte order) is strictly below
    /// this target once read as a big-endian number.
    #[inline]
    pub fn is_met_by(&self, hash: &Hash256) -> bool {
        hash_below_target(&reverse_bytes(hash), &self.0)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Convert compact "bits" representation to a 256-bit target.
///
/// The bits format is: [exponent (1 byte)][mantissa (3 bytes)]
/// Target = mantissa * 256^(exponent - 3)
///
/// The result is a 32-byte big-endian representation of the target.
pub fn bits_to_target(bits: u32) -> [u8; 32] {
    let exponent = ((bits >> 24) & 0xFF) as usize;
    let mantissa = bits & 0x007FFFFF;

    let mut target = [0u8; 32];

    // Negative targets and exponent 0 both mean zero
    if bits & 0x00800000 != 0 || exponent == 0 {
        return target;
    }

    if exponent <= 3 {
        let value = mantissa >> (8 * (3 - exponent));
        target[29] = (value >> 16) as u8;
        target[30] = (value >> 8) as u8;
        target[31] = value as u8;
    } else {
        // Mantissa bytes land at position (32 - exponent); bytes that would
        // fall past the most significant end are dropped
        let mantissa_bytes = mantissa.to_be_bytes();
        for (i, byte) in mantissa_bytes[1..].iter().enumerate() {
            let pos = 32 + i;
            if pos >= exponent && pos - exponent < 32 {
                target[pos - exponent] = *byte;
            }
        }
    }

    target
}

/// Convert a 256-bit target back to compact "bits" representation.
///
/// This is the inverse of `bits_to_target` for normalized targets.
pub fn target_to_bits(target: &[u8; 32]) -> u32 {
    let first_nonzero = match target.iter().position(|b| *b != 0) {
        Some(i) => i,
        None => return 0,
    };

    // Number of significant bytes
    let exponent = (32 - first_nonzero) as u32;

    let mut mantissa: u32 = 0;
    for i in 0..3 {
        mantissa <<= 8;
        if let Some(byte) = target.get(first_nonzero + i) {
            mantissa |= *byte as u32;
        }
    }

    // Keep the sign bit clear by moving one byte into the exponent
    let (exp_adj, mant_adj) = if mantissa & 0x00800000 != 0 {
        (exponent + 1, mantissa >> 8)
    } else {
        (exponent, mantissa)
    };

    (exp_adj << 24) | (mant_adj & 0x007FFFFF)
}

/// Check if a hash is below a target (valid proof of work).
///
/// Both hash and target are treated as 256-bit big-endian numbers.
/// The hash must be strictly less than the target.
#[inline]
pub fn hash_below_target(hash: &[u8; 32], target: &[u8; 32]) -> bool {
    hash < target
}

/// Calculate approximate difficulty from bits.
///
/// Difficulty = max_target / current_target
/// Where max_target is the genesis block target (bits = 0x1d00ffff)
pub fn bits_to_difficulty(bits: u32) -> f64 {
    const GENESIS_BITS: u32 = 0x1d00ffff;

    let current = target_to_f64(&bits_to_target(bits));
    let genesis = target_to_f64(&bits_to_target(GENESIS_BITS));

    if current == 0.0 {
        return f64::INFINITY;
    }

    genesis / current
}

/// Convert a 256-bit target to an approximate f64 value.
fn target_to_f64(target: &[u8; 32]) -> f64 {
    target
        .iter()
        .fold(0.0f64, |acc, byte| acc * 256.0 + f64::from(*byte))
}

/// Format difficulty for display (e.g., "1.23T" for trillion).
pub fn format_difficulty(difficulty: f64) -> String {
    if difficulty >= 1e15 {
        format!("{:.2}P", difficulty / 1e15)
    } else if difficulty >= 1e12 {
        format!("{:.2}T", difficulty / 1e12)
    } else if difficulty >= 1e9 {
        format!("{:.2}G", difficulty / 1e9)
    } else if difficulty >= 1e6 {
        format!("{:.2}M", difficulty / 1e6)
    } else if difficulty >= 1e3 {
        format!("{:.2}K", difficulty / 1e3)
    } else {
        format!("{:.2}", difficulty)
    }
}

/// Average number of hashes needed to meet `target`.
pub fn expected_hashes(target: &Target) -> f64 {
    let t = target_to_f64(&target.0);
    if t == 0.0 {
        return f64::INFINITY;
    }
    // 2^256 / (target + 1)
    2f64.powi(256) / (t + 1.0)
}
