//! # Cryptographic Primitives for PRISM
//!
//! Every signature and every digest in the protocol flows through here.
//! We deliberately chose boring, well-audited cryptography:
//!
//! - **Ed25519** for signatures — fast, deterministic, and nobody has broken it.
//! - **BLAKE3** for hashing — because we live in the future.
//! - **SHA-256** for the transaction commitment — double-hashed, the way the
//!   rest of the chain world expects transaction identifiers to be built.
//!
//! ## A note on "rolling your own crypto"
//!
//! We don't. Everything here is a thin, type-safe wrapper around audited
//! implementations. If you're tempted to optimize these functions, please
//! reconsider. Then reconsider again. Then go read about timing attacks
//! and come back when you've lost the urge.

pub mod hash;
pub mod keys;

// Re-export the things people actually need so they don't have to memorize
// our module hierarchy.
pub use hash::{blake3_hash, blake3_hash_multi, domain_separated_hash, double_sha256, sha256};
pub use keys::{PrismKeypair, PrismPublicKey, PrismSignature};
