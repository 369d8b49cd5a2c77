//! SHA-256 content hashing for published file hashes
//!
//! The digest is public (it ships in the file metadata), so verification is a
//! plain string comparison. Do not reuse [`verify`] for secret-bearing checks.

use sealshare_core::{ShareError, ShareResult};
use sha2::{Digest, Sha256};

/// Hash a byte slice, returning 64 lowercase hex chars.
pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Recompute the digest of `data` and compare it to `expected_hex`.
///
/// `expected_hex` is matched case-insensitively and with surrounding
/// whitespace ignored.
pub fn verify(data: &[u8], expected_hex: &str) -> bool {
    content_hash(data) == expected_hex.trim().to_ascii_lowercase()
}

/// [`verify`] as a result: a mismatch is [`ShareError::FileIntegrityFailed`].
pub fn ensure_integrity(data: &[u8], expected_hex: &str) -> ShareResult<()> {
    if verify(data, expected_hex) {
        Ok(())
    } else {
        tracing::warn!("decrypted content does not match the published hash");
        Err(ShareError::FileIntegrityFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_digest() {
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            content_hash(b"helloworld"),
            "936a185caaa266bb9cbe981e9e05cb78cd732b0b3280eb944412bb6f8f8f07af"
        );
    }

    #[test]
    fn uppercase_expected_matches() {
        let upper = content_hash(b"abc").to_uppercase();
        assert!(verify(b"abc", &upper));
    }

    #[test]
    fn mismatch_is_integrity_failure() {
        let err = ensure_integrity(b"tampered", &content_hash(b"original")).unwrap_err();
        assert!(matches!(err, ShareError::FileIntegrityFailed));
    }

    #[test]
    fn empty_expected_never_matches() {
        assert!(!verify(b"", ""));
    }

    proptest! {
        #[test]
        fn verify_own_hash(data in proptest::collection::vec(any::<u8>(), 0..=4096)) {
            prop_assert!(verify(&data, &content_hash(&data)));
            prop_assert_eq!(content_hash(&data).len(), 64);
        }

        #[test]
        fn verify_other_hash(
            a in proptest::collection::vec(any::<u8>(), 0..=512),
            b in proptest::collection::vec(any::<u8>(), 0..=512),
        ) {
            prop_assume!(a != b);
            prop_assert!(!verify(&a, &content_hash(&b)));
        }
    }
}
