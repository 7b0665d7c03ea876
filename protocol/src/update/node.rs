//! # Account Update Nodes
//!
//! One [`AccountUpdateNode`] is one requested mutation of one account:
//! balance delta, proposed field changes, preconditions, and the
//! authorization requirement its permission policy imposes. Nodes live in
//! an arena owned by the [`AccountUpdateTree`](crate::update::tree) —
//! parent and children are arena indices, never owning pointers, which is
//! what rules out cycles by construction.

use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::crypto::hash::domain_separated_hash;
use crate::precondition::set::PreconditionSet;
use crate::update::tree::NodeId;
use crate::update::types::{
    Authorization, AuthorizationKind, BalanceDelta, DeltaOrigin, UpdateRequest,
};

/// Domain tag for node digests.
const NODE_DIGEST_CONTEXT: &str = "prism-update-node";

/// One account mutation request inside a transaction's update tree.
///
/// Identity (`id`, `account`) and topology (`parent`, `children`) are
/// assigned by the tree and read-only from outside it; the mutation
/// payload (`balance_delta`, `update`, `preconditions`, the authorization
/// fields) is what contract methods write during composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountUpdateNode {
    /// Stable arena index. Never renumbered for the lifetime of the tree.
    id: NodeId,

    /// The `(address, token)` account this update targets.
    account: AccountId,

    /// Enclosing node, or `None` for roots (the fee payer and other
    /// independently-authorized top-level updates).
    parent: Option<NodeId>,

    /// Ordered children, each exclusively owned by this node.
    children: Vec<NodeId>,

    /// The balance change this update requests.
    pub balance_delta: BalanceDelta,

    /// How the delta participates in token accounting.
    pub delta_origin: DeltaOrigin,

    /// Proposed non-balance changes (state, permissions, key).
    pub update: UpdateRequest,

    /// Captured assertions that must still hold at apply time.
    pub preconditions: PreconditionSet,

    /// The authorization this update must carry, per the target account's
    /// permission policy.
    pub authorization_kind: AuthorizationKind,

    /// The signature or proof actually attached. Excluded from the
    /// signable bytes.
    authorization: Authorization,
}

impl AccountUpdateNode {
    /// Construct a bare node. Tree-internal; everything else reaches nodes
    /// through the tree.
    pub(crate) fn new(id: NodeId, account: AccountId, parent: Option<NodeId>) -> Self {
        Self {
            id,
            account,
            parent,
            children: Vec::new(),
            balance_delta: BalanceDelta::ZERO,
            delta_origin: DeltaOrigin::Regular,
            update: UpdateRequest::default(),
            preconditions: PreconditionSet::new(),
            authorization_kind: AuthorizationKind::None,
            authorization: Authorization::None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// The attached authorization.
    pub fn authorization(&self) -> &Authorization {
        &self.authorization
    }

    /// Whether the declared requirement has been discharged.
    pub fn is_authorized(&self) -> bool {
        self.authorization.discharges(self.authorization_kind)
    }

    /// Attach an authorization. Crate-internal: the session drives this
    /// during its proving/authorizing phases.
    pub(crate) fn set_authorization(&mut self, authorization: Authorization) {
        self.authorization = authorization;
    }

    /// Tree-internal: record a new child at the end of the child list.
    pub(crate) fn push_child(&mut self, child: NodeId) {
        self.children.push(child);
    }

    /// Tree-internal: rewrite topology fields while grafting between
    /// arenas.
    pub(crate) fn relocate(
        &mut self,
        id: NodeId,
        parent: Option<NodeId>,
        children: Vec<NodeId>,
    ) {
        self.id = id;
        self.parent = parent;
        self.children = children;
    }

    /// Canonical byte encoding of everything an authorization commits to.
    ///
    /// `account (64) ‖ delta (16 LE) ‖ origin tag ‖ auth-kind tag ‖
    /// update request ‖ preconditions`. The attached authorization itself
    /// is excluded — attaching a signature must not change the bytes that
    /// were signed. Topology is deliberately excluded too: the tree's
    /// commitment binds node order and nesting.
    pub fn signable_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(128);
        buf.extend_from_slice(&self.account.to_bytes());
        buf.extend_from_slice(&self.balance_delta.to_bytes());
        buf.push(self.delta_origin.tag());
        buf.push(self.authorization_kind.tag());
        buf.extend_from_slice(&self.update.to_bytes());
        buf.extend_from_slice(&self.preconditions.to_bytes());
        buf
    }

    /// Domain-separated digest of the signable bytes. This is what the
    /// prover receives as the node's public input.
    pub fn digest(&self) -> [u8; 32] {
        domain_separated_hash(NODE_DIGEST_CONTEXT, &self.signable_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{Address, TokenId};
    use crate::crypto::keys::{PrismKeypair, PrismSignature};
    use crate::precondition::set::{NetworkField, PreconditionField};

    fn fresh_node() -> AccountUpdateNode {
        let kp = PrismKeypair::generate();
        let account = AccountId::native(Address::from_public_key(&kp.public_key()));
        AccountUpdateNode::new(NodeId::from_index(0), account, None)
    }

    #[test]
    fn new_node_is_inert() {
        let node = fresh_node();
        assert!(node.balance_delta.is_zero());
        assert!(node.update.is_noop());
        assert!(node.preconditions.is_empty());
        assert!(node.is_authorized(), "no requirement means authorized");
    }

    #[test]
    fn signable_bytes_exclude_authorization() {
        let mut node = fresh_node();
        node.authorization_kind = AuthorizationKind::Signature;
        let before = node.signable_bytes();

        node.set_authorization(Authorization::Signature(PrismSignature::from_bytes(
            [7u8; 64],
        )));
        let after = node.signable_bytes();

        assert_eq!(before, after, "authorization must not affect signable bytes");
    }

    #[test]
    fn digest_changes_with_delta() {
        let mut node = fresh_node();
        let before = node.digest();
        node.balance_delta = BalanceDelta::credit(1);
        assert_ne!(before, node.digest());
    }

    #[test]
    fn digest_changes_with_preconditions() {
        let mut node = fresh_node();
        let before = node.digest();
        node.preconditions
            .assert_equals(
                PreconditionField::Network(NetworkField::BlockchainLength),
                0,
            )
            .unwrap();
        assert_ne!(before, node.digest());
    }

    #[test]
    fn authorization_requirement_tracks_attachment() {
        let mut node = fresh_node();
        node.authorization_kind = AuthorizationKind::Signature;
        assert!(!node.is_authorized());

        node.set_authorization(Authorization::Signature(PrismSignature::from_bytes(
            [1u8; 64],
        )));
        assert!(node.is_authorized());
    }

    #[test]
    fn token_scope_is_part_of_identity_bytes() {
        let kp = PrismKeypair::generate();
        let addr = Address::from_public_key(&kp.public_key());
        let native = AccountUpdateNode::new(
            NodeId::from_index(0),
            AccountId::native(addr.clone()),
            None,
        );
        let custom = AccountUpdateNode::new(
            NodeId::from_index(0),
            AccountId::new(addr.clone(), TokenId::derive(&addr, &TokenId::NATIVE)),
            None,
        );
        assert_ne!(native.signable_bytes(), custom.signable_bytes());
    }
}
