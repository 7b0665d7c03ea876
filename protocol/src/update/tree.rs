//! # The Account Update Tree
//!
//! An ordered forest of account updates with explicit parent/child and
//! token-scoping relationships. The fee payer is the first root; every
//! other root is an independently-authorized top-level update; children
//! are updates a contract makes on behalf of (and scoped under) their
//! parent.
//!
//! ## Arena representation
//!
//! Nodes live in a flat `Vec`; parent and child links are indices
//! ([`NodeId`]). Indices are only ever handed out for freshly appended
//! nodes, so back-edges — and therefore cycles — cannot be expressed at
//! all. Node ids are stable for the lifetime of the tree: nothing is
//! renumbered on insert.
//!
//! ## Token scoping
//!
//! A child is scoped either to its parent's token or to the token freshly
//! derivable from the parent's own `(address, token)` pair — the token
//! creation/minting context. Anything else is a foreign token and fails
//! with [`TreeError::InvalidTokenScope`] at append time. Derivations
//! observed while building are recorded in a token-owner registry that the
//! accounting ledger later consults to decide whether a mint is
//! sanctioned.
//!
//! ## Layouts
//!
//! A [`Layout`] is a shape constraint checked at traversal time, not at
//! append time — the final shape of a subtree is only known once
//! composition is complete, and a half-built tree legitimately passes
//! through shapes its layout forbids.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::account::{AccountId, Address, TokenId};
use crate::config::MAX_TREE_DEPTH;
use crate::crypto::hash::double_sha256;
use crate::update::node::AccountUpdateNode;

// ---------------------------------------------------------------------------
// NodeId
// ---------------------------------------------------------------------------

/// Stable identity of a node within one tree's arena.
///
/// Meaningful only for the tree that issued it; two trees hand out
/// overlapping indices.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub(crate) fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// TokenScope & Layout
// ---------------------------------------------------------------------------

/// How a new child's token scope is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenScope {
    /// Use the parent's token.
    Inherit,
    /// Use exactly this token. Must equal the parent's token or the one
    /// derivable from the parent — stating the expected token explicitly
    /// is how callers protect themselves against scoping mistakes.
    Exact(TokenId),
    /// Derive the parent's own token: `TokenId::derive(parent.address,
    /// parent.token)`. The token creation/minting context.
    DeriveNew,
}

/// A shape constraint on one subtree, declared by whoever consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layout {
    /// Any number of children, any nesting.
    AnyChildren,
    /// The node must be a leaf.
    NoChildren,
    /// Exactly this many direct children.
    ExactChildren(usize),
    /// Children are allowed, grandchildren are not.
    NoGrandchildren,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::AnyChildren => write!(f, "any children"),
            Layout::NoChildren => write!(f, "no children"),
            Layout::ExactChildren(n) => write!(f, "exactly {} children", n),
            Layout::NoGrandchildren => write!(f, "no grandchildren"),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while building or traversing a tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// A child requested a token that is neither its parent's nor
    /// derivable from the parent.
    #[error(
        "invalid token scope: requested token {requested} is neither parent token {parent} nor derivable from it"
    )]
    InvalidTokenScope { requested: TokenId, parent: TokenId },

    /// A subtree's final shape violates the layout declared for it.
    #[error("layout violation at node {node}: declared '{layout}', found {found}")]
    LayoutViolation {
        node: NodeId,
        layout: Layout,
        found: String,
    },

    /// Composition nested deeper than the protocol allows.
    #[error("tree depth limit exceeded (max {limit})")]
    DepthExceeded { limit: usize },
}

// ---------------------------------------------------------------------------
// AccountUpdateTree
// ---------------------------------------------------------------------------

/// The ordered forest of account updates composing one transaction.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdateTree {
    nodes: Vec<AccountUpdateNode>,
    roots: Vec<NodeId>,
    /// Tokens derived during composition, mapped to the account that
    /// derived them. Consulted by the accounting ledger's sanction check.
    token_owners: BTreeMap<TokenId, AccountId>,
}

impl AccountUpdateTree {
    /// An empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a top-level update (the fee payer, or an
    /// independently-authorized root).
    pub fn add_root(&mut self, account: AccountId) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(AccountUpdateNode::new(id, account, None));
        self.roots.push(id);
        id
    }

    /// Append a new node as the last child of `parent`, scoped per
    /// `scope`.
    ///
    /// Fails with [`TreeError::InvalidTokenScope`] when the requested
    /// token is neither the parent's nor a valid derivation from it, and
    /// with [`TreeError::DepthExceeded`] past the protocol depth limit.
    pub fn create_child(
        &mut self,
        parent: NodeId,
        address: Address,
        scope: TokenScope,
    ) -> Result<NodeId, TreeError> {
        if self.depth_of(parent) + 1 >= MAX_TREE_DEPTH {
            return Err(TreeError::DepthExceeded {
                limit: MAX_TREE_DEPTH,
            });
        }

        let (token_id, newly_derived) = self.resolve_child_token(parent, &scope)?;
        if newly_derived {
            let owner = self.node(parent).account().clone();
            self.token_owners.entry(token_id).or_insert(owner);
        }

        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(AccountUpdateNode::new(
            id,
            AccountId::new(address, token_id),
            Some(parent),
        ));
        self.node_mut(parent).push_child(id);
        Ok(id)
    }

    /// Resolve the token a child of `parent` may carry.
    fn resolve_child_token(
        &self,
        parent: NodeId,
        scope: &TokenScope,
    ) -> Result<(TokenId, bool), TreeError> {
        let parent_account = self.node(parent).account();
        let parent_token = parent_account.token_id;
        let derivable = TokenId::derive(&parent_account.address, &parent_token);

        match scope {
            TokenScope::Inherit => Ok((parent_token, false)),
            TokenScope::DeriveNew => Ok((derivable, true)),
            TokenScope::Exact(t) if *t == parent_token => Ok((*t, false)),
            TokenScope::Exact(t) if *t == derivable => Ok((*t, true)),
            TokenScope::Exact(t) => Err(TreeError::InvalidTokenScope {
                requested: *t,
                parent: parent_token,
            }),
        }
    }

    /// Immutable node access. Ids from this tree are always valid.
    pub fn node(&self, id: NodeId) -> &AccountUpdateNode {
        &self.nodes[id.index()]
    }

    /// Mutable node access.
    pub fn node_mut(&mut self, id: NodeId) -> &mut AccountUpdateNode {
        &mut self.nodes[id.index()]
    }

    /// The ordered roots. The fee payer, when present, is first.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Total node count.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The account that derived `token` during this composition, if any.
    pub fn token_owner(&self, token: &TokenId) -> Option<&AccountId> {
        self.token_owners.get(token)
    }

    /// Distance from `id` to its root. Roots are depth 0.
    pub fn depth_of(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.node(id).parent();
        while let Some(p) = current {
            depth += 1;
            current = self.node(p).parent();
        }
        depth
    }

    // -- traversal ----------------------------------------------------------

    /// Lazy pre-order over the whole forest: roots in order, each followed
    /// by its subtree. Restartable — call again for a fresh pass.
    pub fn pre_order(&self) -> PreOrder<'_> {
        let mut stack: Vec<NodeId> = self.roots.clone();
        stack.reverse();
        PreOrder { tree: self, stack }
    }

    /// Lazy pre-order over one subtree.
    pub fn pre_order_from(&self, root: NodeId) -> PreOrder<'_> {
        PreOrder {
            tree: self,
            stack: vec![root],
        }
    }

    /// Validate `root`'s subtree against `layout`, then return its
    /// pre-order traversal.
    ///
    /// Layout violations surface here — at traversal time — because only
    /// the finished shape is meaningful.
    pub fn traverse(&self, root: NodeId, layout: &Layout) -> Result<PreOrder<'_>, TreeError> {
        self.check_layout(root, layout)?;
        Ok(self.pre_order_from(root))
    }

    /// The layout check behind [`traverse`](Self::traverse).
    pub fn check_layout(&self, root: NodeId, layout: &Layout) -> Result<(), TreeError> {
        let children = self.node(root).children();
        match layout {
            Layout::AnyChildren => Ok(()),
            Layout::NoChildren if children.is_empty() => Ok(()),
            Layout::NoChildren => Err(TreeError::LayoutViolation {
                node: root,
                layout: *layout,
                found: format!("{} children", children.len()),
            }),
            Layout::ExactChildren(n) if children.len() == *n => Ok(()),
            Layout::ExactChildren(_) => Err(TreeError::LayoutViolation {
                node: root,
                layout: *layout,
                found: format!("{} children", children.len()),
            }),
            Layout::NoGrandchildren => {
                for &child in children {
                    let grandchildren = self.node(child).children();
                    if !grandchildren.is_empty() {
                        return Err(TreeError::LayoutViolation {
                            node: root,
                            layout: *layout,
                            found: format!(
                                "{} grandchildren under child {}",
                                grandchildren.len(),
                                child
                            ),
                        });
                    }
                }
                Ok(())
            }
        }
    }

    // -- grafting -----------------------------------------------------------

    /// Merge a single-rooted subtree built elsewhere (a callback's result)
    /// as the last child of `parent`.
    ///
    /// The grafted root's token must satisfy the same scoping rule as a
    /// directly created child; the subtree's internal relationships were
    /// already validated by its own construction. Node ids are re-issued
    /// in this tree's arena; derived-token registrations carry over.
    pub fn graft(
        &mut self,
        parent: NodeId,
        sub: AccountUpdateTree,
    ) -> Result<NodeId, TreeError> {
        if sub.roots.len() != 1 {
            return Err(TreeError::LayoutViolation {
                node: parent,
                layout: Layout::ExactChildren(1),
                found: format!("{} roots in grafted sub-tree", sub.roots.len()),
            });
        }
        let sub_root = sub.roots[0];

        let sub_root_token = sub.node(sub_root).account().token_id;
        let (_, newly_derived) =
            self.resolve_child_token(parent, &TokenScope::Exact(sub_root_token))?;
        if newly_derived {
            let owner = self.node(parent).account().clone();
            self.token_owners.entry(sub_root_token).or_insert(owner);
        }

        if self.depth_of(parent) + sub.max_depth() + 1 >= MAX_TREE_DEPTH {
            return Err(TreeError::DepthExceeded {
                limit: MAX_TREE_DEPTH,
            });
        }

        let base = self.nodes.len();
        let remap = |old: NodeId| NodeId::from_index(base + old.index());

        let new_root = remap(sub_root);
        for mut node in sub.nodes {
            let new_id = remap(node.id());
            let new_parent = match node.parent() {
                Some(p) => Some(remap(p)),
                None => Some(parent),
            };
            let new_children = node.children().iter().map(|&c| remap(c)).collect();
            node.relocate(new_id, new_parent, new_children);
            self.nodes.push(node);
        }
        self.node_mut(parent).push_child(new_root);

        for (token, owner) in sub.token_owners {
            self.token_owners.entry(token).or_insert(owner);
        }

        Ok(new_root)
    }

    /// Deepest node depth in this tree. Empty trees are depth 0.
    fn max_depth(&self) -> usize {
        (0..self.nodes.len())
            .map(|i| self.depth_of(NodeId::from_index(i)))
            .max()
            .unwrap_or(0)
    }

    // -- commitment ---------------------------------------------------------

    /// The transaction commitment every authorization binds to.
    ///
    /// Double-SHA-256 over the pre-order concatenation of each node's
    /// signable bytes plus its child count — contents, order, and nesting
    /// all pin the digest. The attached authorizations are excluded, so
    /// signing does not move the commitment.
    pub fn commitment(&self) -> [u8; 32] {
        let mut buf = Vec::with_capacity(self.nodes.len() * 160);
        for node in self.pre_order() {
            buf.extend_from_slice(&node.signable_bytes());
            buf.extend_from_slice(&(node.children().len() as u32).to_le_bytes());
        }
        double_sha256(&buf)
    }
}

// ---------------------------------------------------------------------------
// PreOrder
// ---------------------------------------------------------------------------

/// Lazy pre-order traversal. Cloning yields an independent, restartable
/// cursor over the same tree.
#[derive(Clone, Debug)]
pub struct PreOrder<'a> {
    tree: &'a AccountUpdateTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a AccountUpdateNode;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.tree.node(id);
        // Push children reversed so the first child is visited next.
        for &child in node.children().iter().rev() {
            self.stack.push(child);
        }
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::PrismKeypair;
    use crate::update::types::BalanceDelta;

    fn fresh_address() -> Address {
        Address::from_public_key(&PrismKeypair::generate().public_key())
    }

    fn native(addr: &Address) -> AccountId {
        AccountId::native(addr.clone())
    }

    #[test]
    fn children_inherit_parent_token() {
        let mut tree = AccountUpdateTree::new();
        let owner = fresh_address();
        let root = tree.add_root(native(&owner));
        let child = tree
            .create_child(root, fresh_address(), TokenScope::Inherit)
            .unwrap();
        assert_eq!(tree.node(child).account().token_id, TokenId::NATIVE);
        assert_eq!(tree.node(child).parent(), Some(root));
    }

    #[test]
    fn derive_new_registers_token_owner() {
        let mut tree = AccountUpdateTree::new();
        let owner = fresh_address();
        let root = tree.add_root(native(&owner));
        let child = tree
            .create_child(root, fresh_address(), TokenScope::DeriveNew)
            .unwrap();

        let expected = TokenId::derive(&owner, &TokenId::NATIVE);
        assert_eq!(tree.node(child).account().token_id, expected);
        assert_eq!(tree.token_owner(&expected), Some(&native(&owner)));
    }

    #[test]
    fn exact_foreign_token_rejected() {
        let mut tree = AccountUpdateTree::new();
        let root = tree.add_root(native(&fresh_address()));

        // A token derived from some unrelated address is foreign here.
        let foreign = TokenId::derive(&fresh_address(), &TokenId::NATIVE);
        let err = tree
            .create_child(root, fresh_address(), TokenScope::Exact(foreign))
            .unwrap_err();
        assert!(matches!(err, TreeError::InvalidTokenScope { .. }));
    }

    #[test]
    fn exact_derivable_token_accepted() {
        let mut tree = AccountUpdateTree::new();
        let owner = fresh_address();
        let root = tree.add_root(native(&owner));

        let derivable = TokenId::derive(&owner, &TokenId::NATIVE);
        let child = tree
            .create_child(root, fresh_address(), TokenScope::Exact(derivable))
            .unwrap();
        assert_eq!(tree.node(child).account().token_id, derivable);
        assert!(tree.token_owner(&derivable).is_some());
    }

    #[test]
    fn pre_order_visits_roots_then_subtrees() {
        let mut tree = AccountUpdateTree::new();
        let a = tree.add_root(native(&fresh_address()));
        let b = tree.add_root(native(&fresh_address()));
        let a1 = tree
            .create_child(a, fresh_address(), TokenScope::Inherit)
            .unwrap();
        let a2 = tree
            .create_child(a, fresh_address(), TokenScope::Inherit)
            .unwrap();
        let a1x = tree
            .create_child(a1, fresh_address(), TokenScope::Inherit)
            .unwrap();

        let order: Vec<NodeId> = tree.pre_order().map(|n| n.id()).collect();
        assert_eq!(order, vec![a, a1, a1x, a2, b]);
    }

    #[test]
    fn pre_order_is_restartable() {
        let mut tree = AccountUpdateTree::new();
        let root = tree.add_root(native(&fresh_address()));
        tree.create_child(root, fresh_address(), TokenScope::Inherit)
            .unwrap();

        let first: Vec<NodeId> = tree.pre_order().map(|n| n.id()).collect();
        let second: Vec<NodeId> = tree.pre_order().map(|n| n.id()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn layout_exactly_one_child_enforced_at_traversal() {
        let mut tree = AccountUpdateTree::new();
        let root = tree.add_root(native(&fresh_address()));
        tree.create_child(root, fresh_address(), TokenScope::Inherit)
            .unwrap();
        tree.create_child(root, fresh_address(), TokenScope::Inherit)
            .unwrap();

        // Appending two children was fine; the declared layout only bites
        // when the subtree is traversed.
        let err = tree.traverse(root, &Layout::ExactChildren(1)).unwrap_err();
        assert!(matches!(
            err,
            TreeError::LayoutViolation {
                layout: Layout::ExactChildren(1),
                ..
            }
        ));

        assert!(tree.traverse(root, &Layout::ExactChildren(2)).is_ok());
    }

    #[test]
    fn layout_no_grandchildren() {
        let mut tree = AccountUpdateTree::new();
        let root = tree.add_root(native(&fresh_address()));
        let child = tree
            .create_child(root, fresh_address(), TokenScope::Inherit)
            .unwrap();
        assert!(tree.check_layout(root, &Layout::NoGrandchildren).is_ok());

        tree.create_child(child, fresh_address(), TokenScope::Inherit)
            .unwrap();
        assert!(tree.check_layout(root, &Layout::NoGrandchildren).is_err());
    }

    #[test]
    fn node_ids_are_stable_across_inserts() {
        let mut tree = AccountUpdateTree::new();
        let root = tree.add_root(native(&fresh_address()));
        let first = tree
            .create_child(root, fresh_address(), TokenScope::Inherit)
            .unwrap();
        let first_account = tree.node(first).account().clone();

        for _ in 0..10 {
            tree.create_child(root, fresh_address(), TokenScope::Inherit)
                .unwrap();
        }
        assert_eq!(tree.node(first).account(), &first_account);
    }

    #[test]
    fn graft_reindexes_and_preserves_structure() {
        let owner = fresh_address();
        let mut main = AccountUpdateTree::new();
        let caller = main.add_root(native(&owner));

        // Sub-tree built elsewhere, rooted at a token-scoped callee node.
        let token = TokenId::derive(&owner, &TokenId::NATIVE);
        let callee_addr = fresh_address();
        let mut sub = AccountUpdateTree::new();
        let sub_root = sub.add_root(AccountId::new(callee_addr.clone(), token));
        sub.node_mut(sub_root).balance_delta = BalanceDelta::debit(1_000);
        sub.create_child(sub_root, fresh_address(), TokenScope::Inherit)
            .unwrap();

        let grafted = main.graft(caller, sub).unwrap();
        assert_eq!(main.node(grafted).parent(), Some(caller));
        assert_eq!(main.node(grafted).account().address, callee_addr);
        assert_eq!(
            main.node(grafted).balance_delta,
            BalanceDelta::debit(1_000)
        );
        assert_eq!(main.node(grafted).children().len(), 1);

        // Grafting a derivable token registers its owner.
        assert_eq!(main.token_owner(&token), Some(&native(&owner)));

        // Pre-order runs caller, grafted root, grafted child.
        let order: Vec<NodeId> = main.pre_order().map(|n| n.id()).collect();
        assert_eq!(order.len(), 3);
        assert_eq!(order[0], caller);
        assert_eq!(order[1], grafted);
    }

    #[test]
    fn graft_rejects_foreign_rooted_subtree() {
        let mut main = AccountUpdateTree::new();
        let caller = main.add_root(native(&fresh_address()));

        let foreign_token = TokenId::derive(&fresh_address(), &TokenId::NATIVE);
        let mut sub = AccountUpdateTree::new();
        sub.add_root(AccountId::new(fresh_address(), foreign_token));

        let err = main.graft(caller, sub).unwrap_err();
        assert!(matches!(err, TreeError::InvalidTokenScope { .. }));
    }

    #[test]
    fn commitment_is_deterministic_and_structure_sensitive() {
        let owner = fresh_address();
        let other = fresh_address();

        let build = |nest: bool| {
            let mut tree = AccountUpdateTree::new();
            let root = tree.add_root(native(&owner));
            if nest {
                let child = tree
                    .create_child(root, other.clone(), TokenScope::Inherit)
                    .unwrap();
                tree.create_child(child, other.clone(), TokenScope::Inherit)
                    .unwrap();
            } else {
                tree.create_child(root, other.clone(), TokenScope::Inherit)
                    .unwrap();
                tree.create_child(root, other.clone(), TokenScope::Inherit)
                    .unwrap();
            }
            tree
        };

        assert_eq!(build(true).commitment(), build(true).commitment());
        // Same node multiset, different nesting — different commitment.
        assert_ne!(build(true).commitment(), build(false).commitment());
    }

    #[test]
    fn depth_limit_enforced() {
        let mut tree = AccountUpdateTree::new();
        let mut current = tree.add_root(native(&fresh_address()));
        let mut result = Ok(current);
        for _ in 0..MAX_TREE_DEPTH + 1 {
            result = tree.create_child(current, fresh_address(), TokenScope::Inherit);
            match result {
                Ok(id) => current = id,
                Err(_) => break,
            }
        }
        assert!(matches!(result, Err(TreeError::DepthExceeded { .. })));
    }
}
