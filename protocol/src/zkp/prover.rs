//! # Proof Generation Interface
//!
//! The [`Prover`] trait is the seam between the transaction layer and the
//! proving backend. The workflow from the session's point of view:
//!
//! 1. Composition finishes; the tree's commitment is fixed.
//! 2. For every node requiring proof authorization, the session calls
//!    `prove(node, ctx)` — potentially concurrently, proof generation is
//!    the one heavy step allowed off the critical path.
//! 3. Each returned [`ProofArtifact`] is attached to its node; any single
//!    failure aborts the whole session's proving phase.
//!
//! The artifact is opaque bytes. The protocol layer never interprets it;
//! presence and provenance are what the session tracks, verification
//! belongs to whoever applies the transaction.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::crypto::hash::domain_separated_hash;
use crate::update::node::AccountUpdateNode;

/// Domain tag for [`LocalProver`] attestations.
const LOCAL_PROOF_CONTEXT: &str = "prism-local-proof";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors a proving backend can report.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProverError {
    /// The witness does not satisfy the constraint system — the update
    /// asks for something the circuit refuses to attest.
    #[error("constraint system unsatisfiable: {0}")]
    Unsatisfiable(String),

    /// The backend itself failed (missing keys, resource exhaustion, ...).
    #[error("proving backend error: {0}")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// ConstraintContext
// ---------------------------------------------------------------------------

/// Public inputs handed to the prover for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstraintContext {
    /// The transaction commitment the proof must bind to. Binding every
    /// proof to the full tree is what stops a proved update from being
    /// replayed inside a different transaction.
    pub commitment: [u8; 32],
    /// The digest of the node being proved.
    pub node_digest: [u8; 32],
}

// ---------------------------------------------------------------------------
// ProofArtifact
// ---------------------------------------------------------------------------

/// A serialized proof, attached to a node as its authorization.
///
/// Opaque to this crate. Sized accessors exist for transport and logging,
/// nothing here can or should interpret the contents.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofArtifact {
    bytes: Vec<u8>,
}

impl ProofArtifact {
    /// Wrap raw proof bytes from a backend.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// The raw proof bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Debug for ProofArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProofArtifact({} bytes)", self.bytes.len())
    }
}

// ---------------------------------------------------------------------------
// Prover
// ---------------------------------------------------------------------------

/// The proving backend, as the session sees it.
///
/// `Sync` because the session fans proof generation out across scoped
/// worker threads; implementations must tolerate concurrent `prove`
/// calls.
pub trait Prover: Sync {
    /// Produce a proof for `node` under `ctx`, or report why not.
    fn prove(
        &self,
        node: &AccountUpdateNode,
        ctx: &ConstraintContext,
    ) -> Result<ProofArtifact, ProverError>;
}

// ---------------------------------------------------------------------------
// LocalProver
// ---------------------------------------------------------------------------

/// Development prover: attests by hashing instead of proving.
///
/// Produces `BLAKE3_derive_key("prism-local-proof", node_digest ‖
/// commitment)` as the artifact. Deterministic, instant, and obviously
/// not sound — it exists so demos and tests can exercise the full
/// session lifecycle without a proving backend in the build.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalProver;

impl LocalProver {
    pub fn new() -> Self {
        Self
    }

    /// The attestation bytes this prover would produce for `ctx`.
    pub fn attestation(ctx: &ConstraintContext) -> [u8; 32] {
        let mut input = Vec::with_capacity(64);
        input.extend_from_slice(&ctx.node_digest);
        input.extend_from_slice(&ctx.commitment);
        domain_separated_hash(LOCAL_PROOF_CONTEXT, &input)
    }
}

impl Prover for LocalProver {
    fn prove(
        &self,
        node: &AccountUpdateNode,
        ctx: &ConstraintContext,
    ) -> Result<ProofArtifact, ProverError> {
        if node.digest() != ctx.node_digest {
            // The context was built for a different node revision; the
            // attestation would bind to bytes nobody is submitting.
            return Err(ProverError::Unsatisfiable(
                "node digest does not match constraint context".to_string(),
            ));
        }
        Ok(ProofArtifact::from_bytes(
            Self::attestation(ctx).to_vec(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{AccountId, Address};
    use crate::crypto::keys::PrismKeypair;
    use crate::update::tree::AccountUpdateTree;

    fn tree_with_one_node() -> AccountUpdateTree {
        let kp = PrismKeypair::generate();
        let mut tree = AccountUpdateTree::new();
        tree.add_root(AccountId::native(Address::from_public_key(
            &kp.public_key(),
        )));
        tree
    }

    #[test]
    fn local_prover_is_deterministic() {
        let tree = tree_with_one_node();
        let node = tree.node(tree.roots()[0]);
        let ctx = ConstraintContext {
            commitment: tree.commitment(),
            node_digest: node.digest(),
        };

        let prover = LocalProver::new();
        let a = prover.prove(node, &ctx).unwrap();
        let b = prover.prove(node, &ctx).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.size(), 32);
    }

    #[test]
    fn different_commitments_different_artifacts() {
        let tree = tree_with_one_node();
        let node = tree.node(tree.roots()[0]);
        let prover = LocalProver::new();

        let a = prover
            .prove(
                node,
                &ConstraintContext {
                    commitment: [1u8; 32],
                    node_digest: node.digest(),
                },
            )
            .unwrap();
        let b = prover
            .prove(
                node,
                &ConstraintContext {
                    commitment: [2u8; 32],
                    node_digest: node.digest(),
                },
            )
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn stale_context_rejected() {
        let tree = tree_with_one_node();
        let node = tree.node(tree.roots()[0]);
        let ctx = ConstraintContext {
            commitment: tree.commitment(),
            node_digest: [0u8; 32],
        };
        let err = LocalProver::new().prove(node, &ctx).unwrap_err();
        assert!(matches!(err, ProverError::Unsatisfiable(_)));
    }
}
