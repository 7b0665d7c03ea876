//! # Token Identifiers
//!
//! Every balance in PRISM is scoped to a token. The native token is the
//! all-zero id; custom tokens are derived deterministically from the
//! address of the contract that owns them:
//!
//! ```text
//! token_id = BLAKE3_derive_key("prism-token-id", owner_address ‖ parent_token_id)
//! ```
//!
//! Derivation rather than registration: the same owning contract always
//! gets the same token id, no registry, no coordination. It also gives the
//! account-update tree a checkable scoping rule — a child update may carry
//! exactly its parent's token id, or the one derivable from the parent's
//! own `(address, token)` pair. Anything else is a foreign token and is
//! rejected.
//!
//! Token ids display as base58, which keeps them visually distinct from
//! hex digests and Bech32 addresses in logs.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::account::address::Address;
use crate::crypto::hash::domain_separated_hash;

/// Domain tag for token id derivation.
const TOKEN_ID_CONTEXT: &str = "prism-token-id";

/// A 32-byte token scope identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenId([u8; 32]);

impl TokenId {
    /// The native PRISM token. All zeros by convention; nothing derivable
    /// collides with it because derived ids are BLAKE3 outputs.
    pub const NATIVE: TokenId = TokenId([0u8; 32]);

    /// Derive the token id owned by `owner` under `parent`.
    ///
    /// A token contract deployed at address `A` under the native token owns
    /// `TokenId::derive(A, NATIVE)`. Nested custom tokens chain the same
    /// construction.
    pub fn derive(owner: &Address, parent: &TokenId) -> Self {
        let mut preimage = Vec::with_capacity(64);
        preimage.extend_from_slice(owner.as_bytes());
        preimage.extend_from_slice(parent.as_bytes());
        Self(domain_separated_hash(TOKEN_ID_CONTEXT, &preimage))
    }

    /// Construct from raw bytes (deserialization, tests).
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw 32-byte identifier.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns `true` for the native token.
    pub fn is_native(&self) -> bool {
        *self == Self::NATIVE
    }

    /// Base58-encoded token id.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    /// Parse a base58-encoded token id.
    pub fn from_base58(s: &str) -> Result<Self, bs58::decode::Error> {
        let bytes = bs58::decode(s).into_vec()?;
        if bytes.len() != 32 {
            return Err(bs58::decode::Error::BufferTooSmall);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_native() {
            write!(f, "TokenId(native)")
        } else {
            write!(f, "TokenId({}...)", &self.to_base58()[..12])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::PrismKeypair;

    fn fresh_address() -> Address {
        Address::from_public_key(&PrismKeypair::generate().public_key())
    }

    #[test]
    fn derivation_is_deterministic() {
        let owner = fresh_address();
        let a = TokenId::derive(&owner, &TokenId::NATIVE);
        let b = TokenId::derive(&owner, &TokenId::NATIVE);
        assert_eq!(a, b);
    }

    #[test]
    fn different_owners_different_tokens() {
        let a = TokenId::derive(&fresh_address(), &TokenId::NATIVE);
        let b = TokenId::derive(&fresh_address(), &TokenId::NATIVE);
        assert_ne!(a, b);
    }

    #[test]
    fn derived_token_is_never_native() {
        let owner = fresh_address();
        let derived = TokenId::derive(&owner, &TokenId::NATIVE);
        assert!(!derived.is_native());
    }

    #[test]
    fn nested_derivation_chains() {
        let owner = fresh_address();
        let level1 = TokenId::derive(&owner, &TokenId::NATIVE);
        let level2 = TokenId::derive(&owner, &level1);
        assert_ne!(level1, level2);
    }

    #[test]
    fn base58_roundtrip() {
        let owner = fresh_address();
        let token = TokenId::derive(&owner, &TokenId::NATIVE);
        let encoded = token.to_base58();
        let decoded = TokenId::from_base58(&encoded).unwrap();
        assert_eq!(token, decoded);
    }
}
