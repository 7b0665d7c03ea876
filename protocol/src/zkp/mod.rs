//! # Zero-Knowledge Proof Interface
//!
//! PRISM treats the proving system as an opaque collaborator: a node whose
//! authorization kind is `Proof` hands the prover its public inputs (the
//! node digest and the transaction commitment) and gets back an artifact,
//! or a failure. Nothing in this crate inspects artifact internals — that
//! is the verifying backend's business — which keeps the protocol layer
//! independent of any particular proof system.
//!
//! ```text
//! prover.rs — Prover trait, ConstraintContext, ProofArtifact, LocalProver
//! ```
//!
//! [`prover::LocalProver`] is the development stand-in: it "proves" by
//! producing a deterministic attestation digest. Real deployments plug a
//! real backend into the same trait.

pub mod prover;

pub use prover::{ConstraintContext, LocalProver, ProofArtifact, Prover, ProverError};
