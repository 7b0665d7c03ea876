//! # Preconditions
//!
//! A precondition is a captured fact about chain state — "the blockchain
//! length was 14 when I looked", "this account's nonce was 3" — attached to
//! an account update and re-checked when the transaction is applied. If the
//! world changed in between, the whole transaction is rejected rather than
//! applied against state the contract never saw.
//!
//! This is the mechanism that makes state-dependent contract logic sound
//! against concurrent block production: "pay out only if the height reached
//! X" is expressed as an assertion captured at composition time and
//! enforced at apply time.
//!
//! Two rules keep the model honest:
//!
//! 1. Assertions are recorded from a snapshot, so they always encode a
//!    true-at-capture-time observation, never an arbitrary target value.
//! 2. Once recorded, an assertion is immutable — re-asserting the same
//!    fact is a no-op, asserting a different one is an error.

pub mod engine;
pub mod set;

pub use engine::{verify_node, verify_tree, SnapshotCapture, StateSnapshotProvider};
pub use set::{
    AccountField, Assertion, NetworkField, PreconditionError, PreconditionField, PreconditionSet,
};
