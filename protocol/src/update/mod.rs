//! # Account Updates
//!
//! The unit of state change in PRISM is not a transaction — it is an
//! *account update*: one requested mutation of one `(address, token)`
//! account, carrying its balance delta, proposed field changes,
//! preconditions, and the authorization the account's permission policy
//! demands. A transaction is an ordered forest of these, composed by
//! contract methods that never see each other's internals.
//!
//! ```text
//! types.rs — BalanceDelta, SetOrKeep, UpdateRequest, authorization kinds
//! node.rs  — AccountUpdateNode and its canonical byte encoding
//! tree.rs  — arena-backed AccountUpdateTree, token scoping, layouts,
//!            pre-order traversal, grafting, the transaction commitment
//! ```

pub mod node;
pub mod tree;
pub mod types;

pub use node::AccountUpdateNode;
pub use tree::{AccountUpdateTree, Layout, NodeId, PreOrder, TokenScope, TreeError};
pub use types::{
    Authorization, AuthorizationKind, BalanceDelta, DeltaOrigin, SetOrKeep, UpdateRequest,
    VerificationKeyDigest,
};
