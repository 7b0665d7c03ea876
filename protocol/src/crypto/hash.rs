//! # Hashing Utilities
//!
//! Two hash functions, two jobs, no exceptions:
//!
//! - **BLAKE3** — the default. Token id derivation, node digests, and every
//!   PRISM-internal identifier. Fast on every platform and immune to length
//!   extension by construction.
//! - **SHA-256** — used only in the `double_sha256` construction for the
//!   transaction commitment, matching the convention external tooling
//!   expects for transaction identifiers.
//!
//! Anything consensus-critical hashes hand-rolled deterministic bytes,
//! never a serde encoding — field ordering in serialization formats is not
//! a contract we want to depend on.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of the input data.
///
/// Returns a 32-byte digest as a `Vec<u8>`. Exists to feed
/// [`double_sha256`]; for PRISM-internal hashing prefer [`blake3_hash`].
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Compute the double-SHA-256 hash: `SHA-256(SHA-256(data))`.
///
/// Used for the transaction commitment that authorizations sign over.
/// The double-hash closes the length-extension hole in plain SHA-256.
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = sha256(data);
    let mut hasher = Sha256::new();
    hasher.update(&first);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Compute the BLAKE3 hash of the input data.
///
/// The workhorse hash function of PRISM. For typical account-update bodies
/// (well under a kilobyte) the single-threaded path is what matters, and
/// it comfortably outruns SHA-256 there too.
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Hash multiple byte slices together without concatenation overhead.
///
/// Feeds the parts sequentially into one hasher: same result as hashing
/// the concatenation, no temporary buffer. Used for composite digests like
/// `(address ‖ token_id)`.
pub fn blake3_hash_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Compute a domain-separated hash using BLAKE3's `derive_key` mode.
///
/// Domain separation guarantees that a token id can never collide with a
/// node digest can never collide with a proof attestation, even over
/// identical input bytes. `derive_key` bakes the context string into the
/// hasher's IV — do not emulate this by prepending a tag to the data.
pub fn domain_separated_hash(context: &str, data: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(data);
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        // SHA-256 of the empty string — the canonical test vector.
        let hash = sha256(b"");
        let expected =
            hex::decode("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
                .unwrap();
        assert_eq!(hash, expected);
    }

    #[test]
    fn double_sha256_differs_from_single() {
        let single = sha256(b"prism");
        let double = double_sha256(b"prism");
        assert_ne!(single.as_slice(), double.as_slice());

        // But double must equal SHA-256 of the single hash.
        let manual = sha256(&single);
        assert_eq!(manual.as_slice(), double.as_slice());
    }

    #[test]
    fn blake3_deterministic() {
        let a = blake3_hash(b"prism");
        let b = blake3_hash(b"prism");
        assert_eq!(a, b);
    }

    #[test]
    fn blake3_case_sensitive() {
        assert_ne!(blake3_hash(b"prism"), blake3_hash(b"Prism"));
    }

    #[test]
    fn multi_matches_concatenation() {
        let multi = blake3_hash_multi(&[b"hello", b" world"]);
        let single = blake3_hash(b"hello world");
        assert_eq!(multi, single);
    }

    #[test]
    fn domain_separation_changes_output() {
        let data = b"same data";
        let a = domain_separated_hash("context-a", data);
        let b = domain_separated_hash("context-b", data);
        assert_ne!(a, b);
        assert_ne!(a, blake3_hash(data));
    }
}
