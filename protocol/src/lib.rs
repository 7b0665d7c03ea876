// Copyright (c) 2026 Refract Systems. MIT License.
// See LICENSE for details.

//! # PRISM Protocol — Core Library
//!
//! PRISM is a transaction layer for zero-knowledge smart contracts. The
//! unit of change is not "a transfer" but an *account-update tree*: a
//! hierarchical, token-scoped set of account mutations composed by
//! independently-written contract methods, authorized by signatures or
//! proofs, and applied atomically — or rejected whole when the world no
//! longer matches what the contracts observed while composing.
//!
//! ## Architecture
//!
//! The modules mirror the actual concerns of the transaction layer:
//!
//! - **crypto** — Ed25519 keys and the two hash functions. Boring on purpose.
//! - **account** — Addresses, token ids, permissions. Identity vocabulary.
//! - **update** — The account-update node and tree: token scoping, layouts,
//!   pre-order traversal, grafting, the transaction commitment.
//! - **precondition** — Captured state assertions and their re-verification.
//!   The race-safety mechanism of the whole design.
//! - **accounting** — The per-token zero-sum invariant and the sanctioned
//!   mint/burn escape hatch.
//! - **callback** — Delegated authorization: one contract's method vetted
//!   and embedded inside another contract's transaction.
//! - **zkp** — The opaque prover seam. Proof systems come and go; this
//!   interface stays.
//! - **session** — The transaction lifecycle: Building → Proved →
//!   Authorized → Sent.
//! - **chain** — The in-memory local chain the demos and tests run against.
//! - **config** — Protocol constants and network parameters.
//!
//! ## Design Philosophy
//!
//! 1. Correctness over performance (but we're still fast).
//! 2. Consensus-critical bytes are hand-encoded, never serde output.
//! 3. Fail fast, surface immediately, never repair a half-built tree.
//! 4. If it touches money, it has tests. Plural.

pub mod account;
pub mod accounting;
pub mod callback;
pub mod chain;
pub mod config;
pub mod crypto;
pub mod precondition;
pub mod session;
pub mod update;
pub mod zkp;
