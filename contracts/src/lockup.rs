//! # Lockup Contract
//!
//! The canonical precondition demo: a contract that only acts at (or
//! after) a particular block height. Both entry points read the height
//! from the composition snapshot and capture it as a precondition — so a
//! transaction built at the right moment but applied after the chain
//! moved is rejected, and one built at the wrong moment never leaves the
//! caller's hands.

use tracing::debug;

use prism_protocol::account::permissions::AuthRequirement;
use prism_protocol::account::{AccountId, Address, Permissions};
use prism_protocol::precondition::engine::{SnapshotCapture, StateSnapshotProvider};
use prism_protocol::precondition::set::{
    Assertion, NetworkField, PreconditionError, PreconditionField,
};
use prism_protocol::session::{SessionError, TransactionSession};
use prism_protocol::update::tree::NodeId;
use prism_protocol::update::types::{AuthorizationKind, BalanceDelta, SetOrKeep};

/// The blockchain-length field both methods assert on.
const HEIGHT: PreconditionField = PreconditionField::Network(NetworkField::BlockchainLength);

/// A contract holding funds behind a block-height gate.
#[derive(Debug, Clone)]
pub struct LockupContract {
    pub address: Address,
}

impl LockupContract {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    /// Deploy: fund the contract account and loosen state/send to
    /// proof-or-signature, the profile the original demo runs with.
    pub fn deploy(
        &self,
        session: &mut TransactionSession,
        initial_balance: u64,
    ) -> Result<NodeId, SessionError> {
        let node = session.fund_new_account(self.address.clone(), initial_balance)?;
        let tree = session.tree_mut()?;
        let update = tree.node_mut(node);
        update.authorization_kind = AuthorizationKind::Signature;
        update.update.permissions = SetOrKeep::Set(Permissions {
            edit_state: AuthRequirement::ProofOrSignature,
            send: AuthRequirement::ProofOrSignature,
            ..Permissions::default_signature()
        });
        debug!(contract = %self.address, "lockup deployment composed");
        Ok(node)
    }

    /// Assert that the chain is at exactly `expected` blocks.
    ///
    /// Captures the equality precondition from the snapshot, then checks
    /// the caller's expectation against what was actually observed —
    /// a wrong expectation fails here, at composition time, with the
    /// same error shape a stale transaction would produce at apply time.
    pub fn require_block_height(
        &self,
        session: &mut TransactionSession,
        snapshot: &dyn StateSnapshotProvider,
        expected: u64,
    ) -> Result<NodeId, SessionError> {
        let node = session.add_update(
            AccountId::native(self.address.clone()),
            AuthorizationKind::Signature,
        )?;
        let observed =
            SnapshotCapture::new(snapshot).capture_equals(session.tree_mut()?, node, HEIGHT)?;
        if observed != expected {
            return Err(SessionError::Precondition(
                PreconditionError::PreconditionFailed {
                    field: HEIGHT,
                    expected: Assertion::Equals(expected),
                    actual: observed,
                },
            ));
        }
        debug!(height = observed, "block height requirement captured");
        Ok(node)
    }

    /// Pay `amount` to `recipient`, valid only once the chain has reached
    /// `unlock_height`.
    ///
    /// The range capture fails immediately if the lockup period is still
    /// running; once captured, the assertion travels with the transaction
    /// and is re-verified at apply time like any other precondition.
    pub fn payout_after(
        &self,
        session: &mut TransactionSession,
        snapshot: &dyn StateSnapshotProvider,
        unlock_height: u64,
        recipient: Address,
        amount: u64,
    ) -> Result<NodeId, SessionError> {
        let node = session.add_update(
            AccountId::native(self.address.clone()),
            AuthorizationKind::Signature,
        )?;
        {
            let tree = session.tree_mut()?;
            SnapshotCapture::new(snapshot).capture_between(
                tree,
                node,
                HEIGHT,
                unlock_height,
                u64::MAX,
            )?;
            tree.node_mut(node).balance_delta = BalanceDelta::debit(amount);
        }

        let paid = session.add_update(AccountId::native(recipient), AuthorizationKind::None)?;
        session.tree_mut()?.node_mut(paid).balance_delta = BalanceDelta::credit(amount);
        debug!(unlock_height, amount, "payout composed");
        Ok(paid)
    }
}
