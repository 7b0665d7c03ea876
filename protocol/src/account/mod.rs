//! # Account Model
//!
//! Accounts in PRISM are identified by an `(address, token id)` pair: one
//! base address owns an independent account per token it holds. The native
//! token is the all-zero [`TokenId`]; custom tokens are derived from their
//! owning contract's address, which is what makes token scoping in an
//! account-update tree checkable — a child update either inherits its
//! parent's token or derives a fresh one from it, never anything foreign.
//!
//! The account *records* themselves (balance, nonce, app state) live in the
//! `chain` module; this module owns the identity and permission vocabulary.

pub mod address;
pub mod permissions;
pub mod token;

pub use address::{Address, AddressError};
pub use permissions::{AuthRequirement, Permissions};
pub use token::TokenId;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one account: a base address scoped to one token.
///
/// Two `AccountId`s with the same address but different token ids are
/// entirely separate accounts with separate balances and nonces.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId {
    /// The base address (derived from the owner's public key).
    pub address: Address,
    /// The token scope. [`TokenId::NATIVE`] for plain accounts.
    pub token_id: TokenId,
}

impl AccountId {
    /// An account under the native token.
    pub fn native(address: Address) -> Self {
        Self {
            address,
            token_id: TokenId::NATIVE,
        }
    }

    /// An account under an explicit token scope.
    pub fn new(address: Address, token_id: TokenId) -> Self {
        Self { address, token_id }
    }

    /// Deterministic byte encoding: `address (32) ‖ token_id (32)`.
    ///
    /// Feeds node digests and signable bytes; both halves are fixed-width
    /// so no separator is needed.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(self.address.as_bytes());
        buf.extend_from_slice(self.token_id.as_bytes());
        buf
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.token_id.is_native() {
            write!(f, "{}", self.address)
        } else {
            write!(f, "{}/{}", self.address, self.token_id)
        }
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::PrismKeypair;

    #[test]
    fn native_account_displays_bare_address() {
        let kp = PrismKeypair::generate();
        let addr = Address::from_public_key(&kp.public_key());
        let id = AccountId::native(addr.clone());
        assert_eq!(id.to_string(), addr.to_string());
    }

    #[test]
    fn token_account_displays_both_halves() {
        let kp = PrismKeypair::generate();
        let addr = Address::from_public_key(&kp.public_key());
        let token = TokenId::derive(&addr, &TokenId::NATIVE);
        let id = AccountId::new(addr, token);
        assert!(id.to_string().contains('/'));
    }

    #[test]
    fn byte_encoding_is_64_bytes() {
        let kp = PrismKeypair::generate();
        let addr = Address::from_public_key(&kp.public_key());
        let id = AccountId::native(addr);
        assert_eq!(id.to_bytes().len(), 64);
    }
}
