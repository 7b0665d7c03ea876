//! # Account Update Value Types
//!
//! The vocabulary every account update is written in. Small, explicit
//! types; no floating point anywhere near monetary values, and no silent
//! truncation anywhere at all — balance arithmetic is checked or it
//! doesn't ship.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Neg;

use crate::account::permissions::Permissions;
use crate::config::APP_STATE_SLOTS;
use crate::crypto::keys::PrismSignature;
use crate::zkp::prover::ProofArtifact;

// ---------------------------------------------------------------------------
// BalanceDelta
// ---------------------------------------------------------------------------

/// A signed change in token balance.
///
/// Backed by `i128` so that any `u64` amount, credited or debited, is
/// representable without truncation and per-token sums over an entire tree
/// cannot overflow (a tree large enough to overflow an `i128` accumulator
/// of `u64` terms does not fit in memory).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BalanceDelta(i128);

impl BalanceDelta {
    /// No change.
    pub const ZERO: BalanceDelta = BalanceDelta(0);

    /// A balance increase of `amount`.
    pub fn credit(amount: u64) -> Self {
        Self(amount as i128)
    }

    /// A balance decrease of `amount`.
    pub fn debit(amount: u64) -> Self {
        Self(-(amount as i128))
    }

    /// The raw signed value.
    pub fn value(&self) -> i128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checked addition. `None` on `i128` overflow, which no realistic
    /// composition can reach — but money code does not get to assume that.
    pub fn checked_add(self, other: BalanceDelta) -> Option<BalanceDelta> {
        self.0.checked_add(other.0).map(BalanceDelta)
    }

    /// Deterministic 16-byte little-endian encoding.
    pub fn to_bytes(&self) -> [u8; 16] {
        self.0.to_le_bytes()
    }
}

impl Neg for BalanceDelta {
    type Output = BalanceDelta;

    fn neg(self) -> BalanceDelta {
        // i128::MIN is unreachable: every delta is built from u64 terms.
        BalanceDelta(-self.0)
    }
}

impl fmt::Display for BalanceDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 >= 0 {
            write!(f, "+{}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

// ---------------------------------------------------------------------------
// DeltaOrigin
// ---------------------------------------------------------------------------

/// Where a balance delta's value comes from, for token accounting.
///
/// Ordinary transfers must net to zero per token across a transaction.
/// Mint and burn entries are the sanctioned exception — but only when they
/// sit under an authorized update of the token's owning contract; the
/// accounting ledger checks that, not this tag alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeltaOrigin {
    /// A transfer leg; participates in the zero-sum residual.
    #[default]
    Regular,
    /// Newly issued supply, credited by the token's minting authority.
    Mint,
    /// Supply removed from circulation by the token's minting authority.
    Burn,
}

impl DeltaOrigin {
    /// Single-byte tag for the canonical encoding. Wire-stable.
    pub fn tag(&self) -> u8 {
        match self {
            DeltaOrigin::Regular => 0x00,
            DeltaOrigin::Mint => 0x01,
            DeltaOrigin::Burn => 0x02,
        }
    }
}

impl fmt::Display for DeltaOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeltaOrigin::Regular => "regular",
            DeltaOrigin::Mint => "mint",
            DeltaOrigin::Burn => "burn",
        };
        write!(f, "{}", s)
    }
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

/// The kind of authorization an update is required to carry.
///
/// Declared by the target account's permission policy at composition time;
/// the actual signature or proof is attached later, during the session's
/// proving/authorizing phases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorizationKind {
    /// No authorization needed (e.g. a plain balance credit).
    #[default]
    None,
    /// An Ed25519 signature over the transaction commitment.
    Signature,
    /// A proof against the account's verification key.
    Proof,
}

impl AuthorizationKind {
    /// Single-byte tag for the canonical encoding.
    pub fn tag(&self) -> u8 {
        match self {
            AuthorizationKind::None => 0x00,
            AuthorizationKind::Signature => 0x01,
            AuthorizationKind::Proof => 0x02,
        }
    }
}

impl fmt::Display for AuthorizationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuthorizationKind::None => "none",
            AuthorizationKind::Signature => "signature",
            AuthorizationKind::Proof => "proof",
        };
        write!(f, "{}", s)
    }
}

/// The authorization actually attached to an update.
///
/// Not part of the update's signable bytes — a signature cannot sign
/// itself, and a proof is produced over the same bytes the signature
/// would be.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Authorization {
    /// Nothing attached yet (or nothing required).
    #[default]
    None,
    Signature(PrismSignature),
    Proof(ProofArtifact),
}

impl Authorization {
    /// The kind of attachment this is.
    pub fn kind(&self) -> AuthorizationKind {
        match self {
            Authorization::None => AuthorizationKind::None,
            Authorization::Signature(_) => AuthorizationKind::Signature,
            Authorization::Proof(_) => AuthorizationKind::Proof,
        }
    }

    /// Whether this attachment discharges a declared requirement.
    pub fn discharges(&self, kind: AuthorizationKind) -> bool {
        match kind {
            AuthorizationKind::None => true,
            AuthorizationKind::Signature => matches!(self, Authorization::Signature(_)),
            AuthorizationKind::Proof => matches!(self, Authorization::Proof(_)),
        }
    }
}

// ---------------------------------------------------------------------------
// SetOrKeep
// ---------------------------------------------------------------------------

/// A proposed field value: either "set to this" or "leave unchanged".
///
/// Every field of an [`UpdateRequest`] is independently one of these, so
/// an update can replace the verification key without touching state, or
/// one state slot without touching its neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetOrKeep<T> {
    /// Leave the current value in place.
    Keep,
    /// Replace the current value.
    Set(T),
}

// Manual impl: the derive would demand `T: Default`, and "keep" is the
// default for every `T`.
impl<T> Default for SetOrKeep<T> {
    fn default() -> Self {
        SetOrKeep::Keep
    }
}

impl<T> SetOrKeep<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, SetOrKeep::Set(_))
    }

    /// The proposed value, if any.
    pub fn as_set(&self) -> Option<&T> {
        match self {
            SetOrKeep::Set(v) => Some(v),
            SetOrKeep::Keep => None,
        }
    }
}

// ---------------------------------------------------------------------------
// VerificationKeyDigest
// ---------------------------------------------------------------------------

/// Digest of a contract's verification key.
///
/// The key itself belongs to the proving backend; the protocol layer only
/// needs a stable identifier to store on the account and to bind proofs
/// against.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerificationKeyDigest([u8; 32]);

impl VerificationKeyDigest {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl fmt::Display for VerificationKeyDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl fmt::Debug for VerificationKeyDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VerificationKeyDigest({}...)", &self.to_base58()[..12])
    }
}

// ---------------------------------------------------------------------------
// UpdateRequest
// ---------------------------------------------------------------------------

/// The proposed new values an update carries, beyond its balance delta.
///
/// Defaults to all-`Keep`: a pure balance movement proposes nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    /// Application state slots, each independently set or kept.
    pub app_state: [SetOrKeep<u64>; APP_STATE_SLOTS],
    /// Replacement permission record.
    pub permissions: SetOrKeep<Permissions>,
    /// Replacement verification key digest.
    pub verification_key: SetOrKeep<VerificationKeyDigest>,
}

impl UpdateRequest {
    /// Whether this request proposes no change at all.
    pub fn is_noop(&self) -> bool {
        self.app_state.iter().all(|s| !s.is_set())
            && !self.permissions.is_set()
            && !self.verification_key.is_set()
    }

    /// Deterministic byte encoding for signing and digests.
    ///
    /// Per field: a presence byte, then the value when present. Fixed
    /// field order; permissions encode as five requirement tag bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        fn requirement_tag(req: crate::account::permissions::AuthRequirement) -> u8 {
            use crate::account::permissions::AuthRequirement::*;
            match req {
                None => 0x00,
                Signature => 0x01,
                Proof => 0x02,
                ProofOrSignature => 0x03,
                Impossible => 0x04,
            }
        }

        let mut buf = Vec::with_capacity(APP_STATE_SLOTS * 9 + 8 + 34);
        for slot in &self.app_state {
            match slot {
                SetOrKeep::Keep => buf.push(0x00),
                SetOrKeep::Set(v) => {
                    buf.push(0x01);
                    buf.extend_from_slice(&v.to_le_bytes());
                }
            }
        }
        match &self.permissions {
            SetOrKeep::Keep => buf.push(0x00),
            SetOrKeep::Set(p) => {
                buf.push(0x01);
                buf.push(requirement_tag(p.edit_state));
                buf.push(requirement_tag(p.send));
                buf.push(requirement_tag(p.receive));
                buf.push(requirement_tag(p.set_permissions));
                buf.push(requirement_tag(p.set_verification_key));
            }
        }
        match &self.verification_key {
            SetOrKeep::Keep => buf.push(0x00),
            SetOrKeep::Set(vk) => {
                buf.push(0x01);
                buf.extend_from_slice(vk.as_bytes());
            }
        }
        buf
    }
}
