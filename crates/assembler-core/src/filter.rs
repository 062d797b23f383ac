//! Candidate transaction selection.
//!
//! Signature checking belongs to an external collaborator; this module only
//! asks it for a verdict per candidate and keeps the accepted ones.

use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::record::TransactionRecord;

/// The verifier could not produce a verdict for a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("verifier failed: {0}")]
pub struct VerifyError(pub String);

/// External signature verification predicate over raw transaction hex.
pub trait SignatureVerifier {
    /// Returns `Ok(true)` if every signature in the transaction is valid.
    fn verify(&self, raw_tx_hex: &str) -> core::result::Result<bool, VerifyError>;
}

impl<F> SignatureVerifier for F
where
    F: Fn(&str) -> bool,
{
    fn verify(&self, raw_tx_hex: &str) -> core::result::Result<bool, VerifyError> {
        Ok(self(raw_tx_hex))
    }
}

/// Verifier that accepts every candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl SignatureVerifier for AcceptAll {
    fn verify(&self, _raw_tx_hex: &str) -> core::result::Result<bool, VerifyError> {
        Ok(true)
    }
}

/// Keep the candidates the verifier accepts, in their original order.
///
/// A rejection or a verifier failure drops the candidate; neither aborts the
/// selection.
pub fn select_valid<V>(candidates: &[TransactionRecord], verifier: &V) -> Vec<TransactionRecord>
where
    V: SignatureVerifier + ?Sized,
{
    candidates
        .iter()
        .filter(|candidate| match verifier.verify(candidate.hex()) {
            Ok(true) => true,
            Ok(false) => {
                debug!(txid = %candidate.txid_display(), "invalid candidate: signature check failed");
                false
            }
            Err(e) => {
                warn!(txid = %candidate.txid_display(), error = %e, "invalid candidate: verifier error");
                false
            }
        })
        .cloned()
        .collect()
}

/// Sum the fees of the given transactions.
pub fn total_fees(transactions: &[TransactionRecord]) -> Result<u64> {
    transactions.iter().try_fold(0u64, |acc, tx| {
        acc.checked_add(tx.fee())
            .ok_or_else(|| Error::malformed("fee", "total fees overflow u64"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(n: u8, fee: u64) -> TransactionRecord {
        TransactionRecord::new(&hex::encode([n; 32]), &format!("02{:02x}", n), fee).unwrap()
    }

    #[test]
    fn test_select_valid_keeps_order() {
        let candidates: Vec<_> = (1..=6).map(|n| record(n, 100)).collect();
        // Accept even bytes only
        let verifier = |hex: &str| u8::from_str_radix(&hex[2..], 16).unwrap() % 2 == 0;

        let selected = select_valid(&candidates, &verifier);
        let kept: Vec<u8> = selected.iter().map(|r| r.raw()[1]).collect();
        assert_eq!(kept, vec![2, 4, 6]);
    }

    #[test]
    fn test_select_valid_is_idempotent() {
        let candidates: Vec<_> = (1..=5).map(|n| record(n, u64::from(n))).collect();
        let verifier = |hex: &str| !hex.ends_with('3');

        let first = select_valid(&candidates, &verifier);
        let second = select_valid(&candidates, &verifier);
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
    }

    struct Flaky;

    impl SignatureVerifier for Flaky {
        fn verify(&self, raw_tx_hex: &str) -> core::result::Result<bool, VerifyError> {
            if raw_tx_hex.ends_with("02") {
                Err(VerifyError("unparseable transaction".into()))
            } else {
                Ok(true)
            }
        }
    }

    #[test]
    fn test_verifier_failure_excludes_candidate() {
        let candidates: Vec<_> = (1..=3).map(|n| record(n, 10)).collect();
        let selected = select_valid(&candidates, &Flaky);

        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|r| r.raw()[1] != 2));
    }

    #[test]
    fn test_accept_all() {
        let candidates: Vec<_> = (1..=3).map(|n| record(n, 10)).collect();
        assert_eq!(select_valid(&candidates, &AcceptAll), candidates);
    }

    #[test]
    fn test_total_fees() {
        let txs = [record(1, 1000), record(2, 2000)];
        assert_eq!(total_fees(&txs).unwrap(), 3000);
        assert_eq!(total_fees(&[]).unwrap(), 0);

        let overflow = [record(1, u64::MAX), record(2, 1)];
        assert!(matches!(
            total_fees(&overflow),
            Err(Error::MalformedInput { field: "fee", .. })
        ));
    }
}
