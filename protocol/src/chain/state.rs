//! # Account Records & Network State
//!
//! The mutable state one transaction reads and writes. Every field here
//! is consensus-critical in a real deployment — the local simulation
//! keeps the same shape so contract code behaves identically against it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::account::{AccountId, Permissions};
use crate::config::APP_STATE_SLOTS;
use crate::crypto::keys::PrismPublicKey;
use crate::precondition::engine::StateSnapshotProvider;
use crate::precondition::set::{AccountField, NetworkField};
use crate::update::types::VerificationKeyDigest;

// ---------------------------------------------------------------------------
// NetworkState
// ---------------------------------------------------------------------------

/// Network-level fields preconditions can assert on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkState {
    /// Number of blocks produced so far.
    pub blockchain_length: u64,
    /// Network time in milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl NetworkState {
    pub fn value(&self, field: NetworkField) -> u64 {
        match field {
            NetworkField::BlockchainLength => self.blockchain_length,
            NetworkField::Timestamp => self.timestamp,
        }
    }
}

// ---------------------------------------------------------------------------
// AccountRecord
// ---------------------------------------------------------------------------

/// The stored state of one `(address, token)` account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Balance under the account's token scope.
    pub balance: u64,
    /// Monotonically increasing per-account sequence number. Bumped for
    /// the fee payer on every applied transaction.
    pub nonce: u64,
    /// Application state slots.
    pub app_state: [u64; APP_STATE_SLOTS],
    /// The account's permission policy.
    pub permissions: Permissions,
    /// Digest of the verification key, for proof-gated accounts.
    pub verification_key: Option<VerificationKeyDigest>,
    /// The owner's public key, when it has been introduced to the chain.
    /// Needed to verify signature authorizations; accounts created purely
    /// by receiving funds start without one.
    pub public_key: Option<PrismPublicKey>,
}

impl Default for AccountRecord {
    fn default() -> Self {
        Self {
            balance: 0,
            nonce: 0,
            app_state: [0; APP_STATE_SLOTS],
            permissions: Permissions::default_signature(),
            verification_key: None,
            public_key: None,
        }
    }
}

impl AccountRecord {
    /// A fresh record with the given balance.
    pub fn with_balance(balance: u64) -> Self {
        Self {
            balance,
            ..Default::default()
        }
    }

    pub fn value(&self, field: AccountField) -> u64 {
        match field {
            AccountField::Balance => self.balance,
            AccountField::Nonce => self.nonce,
        }
    }
}

// ---------------------------------------------------------------------------
// ChainState
// ---------------------------------------------------------------------------

/// The full mutable state of the chain: account records plus network
/// fields. Cloning yields the immutable snapshot a composition pass reads.
#[derive(Debug, Clone, Default)]
pub struct ChainState {
    accounts: HashMap<AccountId, AccountRecord>,
    pub network: NetworkState,
}

impl ChainState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, account: &AccountId) -> Option<&AccountRecord> {
        self.accounts.get(account)
    }

    pub fn get_mut(&mut self, account: &AccountId) -> Option<&mut AccountRecord> {
        self.accounts.get_mut(account)
    }

    /// The record for `account`, created empty if absent.
    pub fn get_or_create(&mut self, account: &AccountId) -> &mut AccountRecord {
        self.accounts.entry(account.clone()).or_default()
    }

    pub fn insert(&mut self, account: AccountId, record: AccountRecord) {
        self.accounts.insert(account, record);
    }

    pub fn contains(&self, account: &AccountId) -> bool {
        self.accounts.contains_key(account)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl StateSnapshotProvider for ChainState {
    fn network_value(&self, field: NetworkField) -> u64 {
        self.network.value(field)
    }

    fn account_value(&self, account: &AccountId, field: AccountField) -> u64 {
        // Absent accounts read as zero on every field.
        self.accounts
            .get(account)
            .map(|r| r.value(field))
            .unwrap_or(0)
    }
}
