//! # Account Permissions
//!
//! Every mutable aspect of an account carries a permission: the kind of
//! authorization a transaction must present before that aspect may change.
//! Permissions are set by the account's owning contract at deployment, not
//! chosen by whoever happens to build a transaction — which is exactly why
//! an [`AccountUpdateNode`](crate::update::AccountUpdateNode)'s
//! authorization kind comes from the permission policy rather than from
//! the caller.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::update::types::AuthorizationKind;

// ---------------------------------------------------------------------------
// AuthRequirement
// ---------------------------------------------------------------------------

/// The authorization a permission demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthRequirement {
    /// Anyone may perform the operation without authorization.
    None,
    /// A signature from the account's key is required.
    Signature,
    /// A proof against the account's verification key is required.
    Proof,
    /// Either a signature or a proof satisfies the requirement.
    ProofOrSignature,
    /// The operation can never be performed. Used to freeze an aspect of
    /// an account permanently (e.g. a token whose supply rules must not
    /// change).
    Impossible,
}

impl AuthRequirement {
    /// Whether `kind` discharges this requirement.
    pub fn satisfied_by(&self, kind: AuthorizationKind) -> bool {
        match self {
            AuthRequirement::None => true,
            AuthRequirement::Signature => kind == AuthorizationKind::Signature,
            AuthRequirement::Proof => kind == AuthorizationKind::Proof,
            AuthRequirement::ProofOrSignature => {
                kind == AuthorizationKind::Signature || kind == AuthorizationKind::Proof
            }
            AuthRequirement::Impossible => false,
        }
    }

    /// The cheapest authorization kind that satisfies this requirement,
    /// or `None` when the operation is impossible.
    ///
    /// `ProofOrSignature` resolves to `Signature` — proofs are the
    /// expensive path and only taken when the policy insists.
    pub fn preferred_kind(&self) -> Option<AuthorizationKind> {
        match self {
            AuthRequirement::None => Some(AuthorizationKind::None),
            AuthRequirement::Signature | AuthRequirement::ProofOrSignature => {
                Some(AuthorizationKind::Signature)
            }
            AuthRequirement::Proof => Some(AuthorizationKind::Proof),
            AuthRequirement::Impossible => None,
        }
    }
}

impl fmt::Display for AuthRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuthRequirement::None => "none",
            AuthRequirement::Signature => "signature",
            AuthRequirement::Proof => "proof",
            AuthRequirement::ProofOrSignature => "proof-or-signature",
            AuthRequirement::Impossible => "impossible",
        };
        write!(f, "{}", s)
    }
}

// ---------------------------------------------------------------------------
// Permissions
// ---------------------------------------------------------------------------

/// The full permission record of an account.
///
/// One [`AuthRequirement`] per mutable aspect. The default profile demands
/// a signature for everything — a plain user account. Contracts tighten
/// individual fields at deployment (`send: Proof` is the canonical token
/// contract profile: nobody moves funds out without satisfying the
/// contract's circuit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    /// Changing application state slots.
    pub edit_state: AuthRequirement,
    /// Decreasing the balance.
    pub send: AuthRequirement,
    /// Increasing the balance.
    pub receive: AuthRequirement,
    /// Replacing this permission record itself.
    pub set_permissions: AuthRequirement,
    /// Replacing the verification key.
    pub set_verification_key: AuthRequirement,
}

impl Permissions {
    /// The standard user-account profile: signature for every mutation,
    /// unrestricted receive.
    pub fn default_signature() -> Self {
        Self {
            edit_state: AuthRequirement::Signature,
            send: AuthRequirement::Signature,
            receive: AuthRequirement::None,
            set_permissions: AuthRequirement::Signature,
            set_verification_key: AuthRequirement::Signature,
        }
    }

    /// The strictest useful requirement across aspects touched by an
    /// update that changes `send`-relevant state.
    ///
    /// Used when deciding the authorization kind a node must carry: a
    /// balance decrease consults `send`, everything else falls back to
    /// `edit_state`.
    pub fn requirement_for_send(&self) -> AuthRequirement {
        self.send
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::default_signature()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_requirement_accepts_only_signature() {
        let req = AuthRequirement::Signature;
        assert!(req.satisfied_by(AuthorizationKind::Signature));
        assert!(!req.satisfied_by(AuthorizationKind::Proof));
        assert!(!req.satisfied_by(AuthorizationKind::None));
    }

    #[test]
    fn proof_or_signature_accepts_both() {
        let req = AuthRequirement::ProofOrSignature;
        assert!(req.satisfied_by(AuthorizationKind::Signature));
        assert!(req.satisfied_by(AuthorizationKind::Proof));
        assert!(!req.satisfied_by(AuthorizationKind::None));
    }

    #[test]
    fn impossible_accepts_nothing() {
        let req = AuthRequirement::Impossible;
        assert!(!req.satisfied_by(AuthorizationKind::None));
        assert!(!req.satisfied_by(AuthorizationKind::Signature));
        assert!(!req.satisfied_by(AuthorizationKind::Proof));
        assert_eq!(req.preferred_kind(), None);
    }

    #[test]
    fn preferred_kind_picks_cheapest() {
        assert_eq!(
            AuthRequirement::ProofOrSignature.preferred_kind(),
            Some(AuthorizationKind::Signature)
        );
        assert_eq!(
            AuthRequirement::Proof.preferred_kind(),
            Some(AuthorizationKind::Proof)
        );
    }

    #[test]
    fn default_profile_is_signature_gated() {
        let p = Permissions::default();
        assert_eq!(p.send, AuthRequirement::Signature);
        assert_eq!(p.receive, AuthRequirement::None);
    }
}
