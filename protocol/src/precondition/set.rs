//! # Precondition Sets
//!
//! The value types: which fields can be asserted on, what an assertion
//! says, and the per-node collection with its idempotence/conflict rules.
//!
//! All asserted values are `u64` — balances, nonces, block heights, and
//! timestamps all fit, and a single width keeps the wire encoding and the
//! eventual circuit layout uniform.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// Network-level fields an update may assert on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NetworkField {
    /// Number of blocks produced so far.
    BlockchainLength,
    /// Network time in milliseconds since the Unix epoch, as stamped by
    /// block production.
    Timestamp,
}

/// Account-level fields an update may assert on. Always refer to the
/// account the update itself targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AccountField {
    /// The account's balance under its token scope.
    Balance,
    /// The account's nonce.
    Nonce,
}

/// A field a precondition can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PreconditionField {
    Network(NetworkField),
    Account(AccountField),
}

impl PreconditionField {
    /// Two-byte field tag for the deterministic encoding.
    fn tag(&self) -> [u8; 2] {
        match self {
            PreconditionField::Network(NetworkField::BlockchainLength) => [0x00, 0x00],
            PreconditionField::Network(NetworkField::Timestamp) => [0x00, 0x01],
            PreconditionField::Account(AccountField::Balance) => [0x01, 0x00],
            PreconditionField::Account(AccountField::Nonce) => [0x01, 0x01],
        }
    }
}

impl fmt::Display for PreconditionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PreconditionField::Network(NetworkField::BlockchainLength) => "blockchainLength",
            PreconditionField::Network(NetworkField::Timestamp) => "timestamp",
            PreconditionField::Account(AccountField::Balance) => "balance",
            PreconditionField::Account(AccountField::Nonce) => "nonce",
        };
        write!(f, "{}", s)
    }
}

// ---------------------------------------------------------------------------
// Assertions
// ---------------------------------------------------------------------------

/// What a precondition claims about a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Assertion {
    /// The field equals exactly this value.
    Equals(u64),
    /// The field lies within `[low, high]`, both ends inclusive.
    Between { low: u64, high: u64 },
}

impl Assertion {
    /// Whether `value` satisfies this assertion.
    pub fn holds(&self, value: u64) -> bool {
        match self {
            Assertion::Equals(v) => value == *v,
            Assertion::Between { low, high } => *low <= value && value <= *high,
        }
    }
}

impl fmt::Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assertion::Equals(v) => write!(f, "== {}", v),
            Assertion::Between { low, high } => write!(f, "in [{}, {}]", low, high),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from recording or verifying preconditions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    /// The same field already carries a different assertion. Assertions
    /// are immutable facts; two contract methods disagreeing about what
    /// they observed is a composition bug, not something to paper over.
    #[error("conflicting precondition on {field}: already asserted {existing}, attempted {attempted}")]
    ConflictingPrecondition {
        field: PreconditionField,
        existing: Assertion,
        attempted: Assertion,
    },

    /// An assertion did not hold against the state it was checked on.
    /// Carries the first failing field, what was asserted, and what the
    /// state actually contained.
    #[error("precondition failed on {field}: asserted {expected}, actual {actual}")]
    PreconditionFailed {
        field: PreconditionField,
        expected: Assertion,
        actual: u64,
    },
}

// ---------------------------------------------------------------------------
// PreconditionSet
// ---------------------------------------------------------------------------

/// The assertions attached to one account update.
///
/// Keyed by field; a `BTreeMap` so iteration order — and therefore the
/// byte encoding that feeds signatures — is deterministic. May be empty:
/// an update with no preconditions is valid against any state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreconditionSet {
    entries: BTreeMap<PreconditionField, Assertion>,
}

impl PreconditionSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an equality assertion.
    ///
    /// Idempotent when the field already asserts equality on the same
    /// value; fails with [`PreconditionError::ConflictingPrecondition`]
    /// when it asserts anything else.
    pub fn assert_equals(
        &mut self,
        field: PreconditionField,
        value: u64,
    ) -> Result<(), PreconditionError> {
        self.record(field, Assertion::Equals(value))
    }

    /// Record a range assertion, both ends inclusive.
    ///
    /// Same idempotence/conflict contract as
    /// [`assert_equals`](Self::assert_equals).
    pub fn assert_between(
        &mut self,
        field: PreconditionField,
        low: u64,
        high: u64,
    ) -> Result<(), PreconditionError> {
        self.record(field, Assertion::Between { low, high })
    }

    fn record(
        &mut self,
        field: PreconditionField,
        assertion: Assertion,
    ) -> Result<(), PreconditionError> {
        match self.entries.get(&field) {
            None => {
                self.entries.insert(field, assertion);
                Ok(())
            }
            Some(existing) if *existing == assertion => Ok(()),
            Some(existing) => Err(PreconditionError::ConflictingPrecondition {
                field,
                existing: *existing,
                attempted: assertion,
            }),
        }
    }

    /// The assertion on `field`, if one was recorded.
    pub fn get(&self, field: PreconditionField) -> Option<&Assertion> {
        self.entries.get(&field)
    }

    /// Iterate over the recorded assertions in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&PreconditionField, &Assertion)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deterministic byte encoding for signing and digests.
    ///
    /// `count (u32 LE)` then per entry: `field tag (2) ‖ assertion tag (1)
    /// ‖ value(s) (u64 LE)`. Map order makes this canonical.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + self.entries.len() * 19);
        buf.extend_from_slice(&(self.entries.len() as u32).to_le_bytes());
        for (field, assertion) in &self.entries {
            buf.extend_from_slice(&field.tag());
            match assertion {
                Assertion::Equals(v) => {
                    buf.push(0x00);
                    buf.extend_from_slice(&v.to_le_bytes());
                }
                Assertion::Between { low, high } => {
                    buf.push(0x01);
                    buf.extend_from_slice(&low.to_le_bytes());
                    buf.extend_from_slice(&high.to_le_bytes());
                }
            }
        }
        buf
    }
}
