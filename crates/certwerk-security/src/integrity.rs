// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Artifact integrity: SHA-256 hashing for tamper detection.

use certwerk_core::error::CertwerkError;
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `data`.
///
/// Fingerprints issued artifacts in the audit trail and feeds the
/// verification token checksum.
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Check `data` against a recorded digest (hex case is ignored).
pub fn verify_hash(data: &[u8], expected_hex: &str) -> Result<(), CertwerkError> {
    let actual = hash_bytes(data);
    if actual.eq_ignore_ascii_case(expected_hex) {
        Ok(())
    } else {
        Err(CertwerkError::IntegrityMismatch {
            expected: expected_hex.to_owned(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// SHA-256 of the empty byte slice (well-known constant).
    const EMPTY_SHA256: &str =
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn hash_empty_input() {
        assert_eq!(hash_bytes(b""), EMPTY_SHA256);
    }

    #[test]
    fn hash_known_value() {
        // SHA-256("hello"), checked against coreutils sha256sum.
        let expected = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        assert_eq!(hash_bytes(b"hello"), expected);
    }

    #[test]
    fn verify_accepts_uppercase_digest() {
        let data = b"BC-2024-001";
        let hex = hash_bytes(data).to_ascii_uppercase();
        assert!(verify_hash(data, &hex).is_ok());
    }

    #[test]
    fn verify_mismatched_hash() {
        match verify_hash(b"a", "0000") {
            Err(CertwerkError::IntegrityMismatch { expected, actual }) => {
                assert_eq!(expected, "0000");
                assert_eq!(actual, hash_bytes(b"a"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
