//! # PRISM Addresses
//!
//! An address is the human-facing identity of a base account, derived from
//! the owner's Ed25519 public key:
//!
//! ```text
//! public_key (32 bytes)
//!     -> BLAKE3(public_key) -> 32 bytes
//!     -> Bech32("prism", hash) -> prism1qw508d6qe...
//! ```
//!
//! Bech32 gives built-in error detection (up to 4 character errors), which
//! matters when addresses get copy-pasted between terminals. Hashing the
//! key instead of encoding it raw keeps the address format stable if the
//! signature scheme ever changes underneath it.

use bech32::{Bech32, Hrp};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::ADDRESS_HRP;
use crate::crypto::hash::blake3_hash;
use crate::crypto::keys::PrismPublicKey;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while parsing an address.
#[derive(Debug, Error)]
pub enum AddressError {
    /// The Bech32 string could not be decoded.
    #[error("bech32 decode error: {0}")]
    Bech32Decode(String),

    /// The decoded address has an unexpected human-readable prefix.
    #[error("invalid HRP: expected '{expected}', got '{got}'")]
    InvalidHrp {
        /// The expected HRP.
        expected: String,
        /// The HRP that was actually found.
        got: String,
    },

    /// The decoded data has an unexpected length.
    #[error("invalid address data length: expected {expected} bytes, got {got}")]
    InvalidDataLength {
        /// Expected number of bytes.
        expected: usize,
        /// Actual number of bytes.
        got: usize,
    },
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A PRISM base-account address.
///
/// Internally the BLAKE3 hash of the originating public key; the Bech32
/// string is computed on demand. Addresses are plain values — cheap to
/// clone, ordered, hashable — because they key every map in the system.
///
/// # Examples
///
/// ```
/// use prism_protocol::account::Address;
/// use prism_protocol::crypto::keys::PrismKeypair;
///
/// let kp = PrismKeypair::generate();
/// let addr = Address::from_public_key(&kp.public_key());
/// assert!(addr.to_string().starts_with("prism1"));
///
/// let recovered: Address = addr.to_string().parse().unwrap();
/// assert_eq!(addr, recovered);
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address {
    key_hash: [u8; 32],
}

impl Address {
    /// Derive an address from a public key.
    pub fn from_public_key(pk: &PrismPublicKey) -> Self {
        Self {
            key_hash: blake3_hash(pk.as_bytes()),
        }
    }

    /// Construct an address from a raw 32-byte hash.
    ///
    /// For deserialization and tests; normal code derives addresses from
    /// public keys.
    pub fn from_bytes(key_hash: [u8; 32]) -> Self {
        Self { key_hash }
    }

    /// The raw 32-byte key hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key_hash
    }

    /// Returns `true` if `pk` is the public key this address was derived
    /// from.
    pub fn matches_key(&self, pk: &PrismPublicKey) -> bool {
        blake3_hash(pk.as_bytes()) == self.key_hash
    }

    /// Encode as a Bech32 address string (`prism1...`).
    pub fn to_bech32(&self) -> String {
        let hrp = Hrp::parse(ADDRESS_HRP).expect("static HRP is valid");
        bech32::encode::<Bech32>(hrp, &self.key_hash)
            .expect("encoding a 32-byte payload should never fail")
    }

    /// Parse a Bech32-encoded address string.
    ///
    /// Validates the HRP, checksum, and payload length.
    pub fn from_bech32(addr: &str) -> Result<Self, AddressError> {
        let (hrp, data) =
            bech32::decode(addr).map_err(|e| AddressError::Bech32Decode(e.to_string()))?;

        let expected_hrp = Hrp::parse(ADDRESS_HRP).expect("static HRP is valid");
        if hrp != expected_hrp {
            return Err(AddressError::InvalidHrp {
                expected: ADDRESS_HRP.to_string(),
                got: hrp.to_string(),
            });
        }

        if data.len() != 32 {
            return Err(AddressError::InvalidDataLength {
                expected: 32,
                got: data.len(),
            });
        }

        let mut key_hash = [0u8; 32];
        key_hash.copy_from_slice(&data);
        Ok(Self { key_hash })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_bech32())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.to_bech32();
        write!(f, "Address({}...)", &s[..14.min(s.len())])
    }
}

impl std::str::FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bech32(s)
    }
}
