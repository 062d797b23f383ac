//! Error types for block assembly.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors surfaced by block assembly.
///
/// Candidate transactions that fail verification are not errors; the filter
/// drops them and assembly continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// An input value is outside its accepted range or cannot be decoded.
    #[error("malformed {field}: {reason}")]
    MalformedInput { field: &'static str, reason: String },

    /// A merkle root was required over an empty identifier list.
    #[error("merkle root requested over an empty identifier list")]
    EmptyMerkleInput,

    /// The nonce window was searched without meeting the target.
    #[error("no nonce met the target after {attempts} attempts")]
    SearchExhausted { attempts: u64 },

    /// The search was cancelled through its cancel flag.
    #[error("nonce search cancelled after {attempts} attempts")]
    Cancelled { attempts: u64 },
}

impl Error {
    pub(crate) fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        Error::MalformedInput {
            field,
            reason: reason.into(),
        }
    }
}
