//! # Callback Authorization
//!
//! The delegation pattern that lets contract A embed contract B's
//! authorization inside its own transaction without knowing B's logic:
//! A declares, up front, *which* contract, *which* method, *which* token
//! scope, *what* shape, and *what* net amount it expects; the broker runs
//! B's method against a fresh sub-tree rooted at B's own account; the
//! result is merged under A's node and every declared expectation is
//! checked against what B actually produced.
//!
//! A trusts nothing about B's implementation — only B's declared numeric
//! outcome, enforced as an equality on the negated balance delta. "The
//! callback you give me must move exactly N units out of you" is checkable
//! without reading a line of the callee.
//!
//! Methods are resolved by explicit registration in a
//! [`ContractRegistry`], never by reflection: a contract is callable
//! exactly when someone registered its entry points.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::account::{AccountId, Address, TokenId};
use crate::precondition::engine::StateSnapshotProvider;
use crate::precondition::set::PreconditionError;
use crate::update::tree::{AccountUpdateTree, Layout, NodeId, TreeError};
use crate::update::types::BalanceDelta;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from callback invocation and vetting.
#[derive(Debug, Error)]
pub enum CallbackError {
    /// No method under that name is registered for the declared contract.
    #[error("no method '{method}' registered for contract {contract}")]
    MethodNotRegistered { contract: Address, method: String },

    /// The callee's resulting root targets a different account than the
    /// caller declared before invocation.
    #[error("callback contract mismatch: declared {declared}, callee produced {produced}")]
    CallbackContractMismatch {
        declared: AccountId,
        produced: AccountId,
    },

    /// The callee's root delta does not cancel the declared amount.
    #[error("callback amount mismatch: expected delta {expected}, callee produced {produced}")]
    CallbackAmountMismatch {
        expected: BalanceDelta,
        produced: BalanceDelta,
    },

    /// The callee's method payload could not be decoded.
    #[error("malformed callback arguments for '{method}': {reason}")]
    MalformedArguments { method: String, reason: String },

    /// Scope or layout failures detected while vetting the sub-tree.
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// Precondition capture inside the callee failed.
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
}

// ---------------------------------------------------------------------------
// ContractMethod & registry
// ---------------------------------------------------------------------------

/// Execution context handed to a callee method.
pub struct CallbackContext<'a> {
    /// The composition-time state snapshot, for precondition capture.
    pub snapshot: &'a dyn StateSnapshotProvider,
    /// Method arguments, JSON-encoded by the caller's contract bindings.
    pub args: &'a [u8],
}

/// A callable contract entry point.
///
/// The method builds and returns its *own* sub-tree, rooted at its own
/// account node — exactly as if it had been invoked directly. It does not
/// see the caller's tree at all; whatever it produces is vetted and merged
/// by the broker afterwards.
pub trait ContractMethod: Send + Sync {
    /// Run the method, producing the sub-tree it wants to contribute.
    fn call(&self, ctx: &CallbackContext<'_>) -> Result<AccountUpdateTree, CallbackError>;
}

/// Explicit registry of callable contract methods, keyed by
/// `(contract address, method name)`.
#[derive(Default)]
pub struct ContractRegistry {
    methods: HashMap<(Address, String), Arc<dyn ContractMethod>>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a method. Re-registering the same name replaces the
    /// previous entry — latest deployment wins.
    pub fn register(
        &mut self,
        contract: Address,
        method: impl Into<String>,
        handler: Arc<dyn ContractMethod>,
    ) {
        self.methods.insert((contract, method.into()), handler);
    }

    /// Look up a method.
    pub fn resolve(&self, contract: &Address, method: &str) -> Option<Arc<dyn ContractMethod>> {
        self.methods
            .get(&(contract.clone(), method.to_string()))
            .cloned()
    }

    /// Number of registered methods.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Declaration & broker
// ---------------------------------------------------------------------------

/// Everything the caller commits to *before* the callee runs.
#[derive(Debug, Clone)]
pub struct CallbackDeclaration {
    /// The contract expected to authorize the sub-action.
    pub contract: Address,
    /// The token scope the callee must stay within.
    pub token_id: TokenId,
    /// The method name to invoke.
    pub method: String,
    /// The amount the caller expects the callee's root to move *out*.
    /// The produced root delta must equal exactly `-expected_amount`.
    pub expected_amount: u64,
    /// The shape the callee's sub-tree may take.
    pub layout: Layout,
}

/// Runs callee methods and merges their vetted sub-trees.
pub struct CallbackBroker<'a> {
    registry: &'a ContractRegistry,
}

impl<'a> CallbackBroker<'a> {
    pub fn new(registry: &'a ContractRegistry) -> Self {
        Self { registry }
    }

    /// Invoke `decl.method` on `decl.contract` and merge the resulting
    /// sub-tree as the last child of `caller`.
    ///
    /// Vetting order: contract identity, token scope of every produced
    /// node, declared layout — all before the merge; then, after merging,
    /// the amount cancellation check (an equality assertion on the
    /// negated delta). A post-merge failure leaves the tree known-bad;
    /// per the composition contract, callers discard the transaction
    /// rather than repair it.
    pub fn invoke_as_callback(
        &self,
        tree: &mut AccountUpdateTree,
        caller: NodeId,
        decl: &CallbackDeclaration,
        args: &[u8],
        snapshot: &dyn StateSnapshotProvider,
    ) -> Result<NodeId, CallbackError> {
        let method = self.registry.resolve(&decl.contract, &decl.method).ok_or(
            CallbackError::MethodNotRegistered {
                contract: decl.contract.clone(),
                method: decl.method.clone(),
            },
        )?;

        debug!(contract = %decl.contract, method = %decl.method,
               token = %decl.token_id, "invoking callback");

        // The callee runs against its own fresh sub-tree, same semantics
        // as a direct invocation.
        let sub = method.call(&CallbackContext { snapshot, args })?;

        // The callee must have rooted itself exactly where the caller
        // declared.
        let declared = AccountId::new(decl.contract.clone(), decl.token_id);
        let produced_root = match sub.roots() {
            [root] => *root,
            roots => {
                return Err(TreeError::LayoutViolation {
                    node: caller,
                    layout: Layout::ExactChildren(1),
                    found: format!("{} roots in callback sub-tree", roots.len()),
                }
                .into())
            }
        };
        let produced = sub.node(produced_root).account().clone();
        if produced != declared {
            return Err(CallbackError::CallbackContractMismatch { declared, produced });
        }

        // The callback may not touch accounts outside the declared token.
        for node in sub.pre_order() {
            let token = node.account().token_id;
            if token != decl.token_id {
                return Err(TreeError::InvalidTokenScope {
                    requested: token,
                    parent: decl.token_id,
                }
                .into());
            }
        }

        // Shape vetting under the caller-declared layout.
        sub.check_layout(produced_root, &decl.layout)?;

        let produced_delta = sub.node(produced_root).balance_delta;
        let grafted = tree.graft(caller, sub)?;

        // The explicit equality assertion on the negated delta: whatever
        // the callee did internally, its net movement must cancel the
        // declared amount exactly. No truncation, no rounding.
        let expected = BalanceDelta::debit(decl.expected_amount);
        if -produced_delta != BalanceDelta::credit(decl.expected_amount) {
            return Err(CallbackError::CallbackAmountMismatch {
                expected,
                produced: produced_delta,
            });
        }

        debug!(node = %grafted, delta = %produced_delta, "callback merged");
        Ok(grafted)
    }
}
