//! # Precondition Capture & Verification
//!
//! Two halves of one contract:
//!
//! - **Capture** ([`SnapshotCapture`]) runs at composition time against an
//!   immutable state snapshot. It reads the current value of a field and
//!   records the assertion from what it read — callers never supply the
//!   asserted value directly, so a recorded fact is always true at capture
//!   time.
//! - **Verification** ([`verify_node`] / [`verify_tree`]) runs at apply
//!   time against live state. Pre-order over the tree, fail-fast at the
//!   first violated assertion — a transaction is rejected whole, so there
//!   is nothing useful in collecting further failures.

use tracing::debug;

use crate::account::AccountId;
use crate::precondition::set::{
    AccountField, Assertion, NetworkField, PreconditionError, PreconditionField,
};
use crate::update::node::AccountUpdateNode;
use crate::update::tree::{AccountUpdateTree, NodeId};

// ---------------------------------------------------------------------------
// StateSnapshotProvider
// ---------------------------------------------------------------------------

/// Read access to chain state, as seen by precondition capture and
/// verification.
///
/// Implemented by the composition-time snapshot and by the live chain; the
/// engine does not care which it is handed. Absent accounts read as zero
/// on every field — an account that does not exist yet has no balance and
/// no nonce, which is exactly what a funding update wants to assert on.
pub trait StateSnapshotProvider {
    /// Current value of a network-level field.
    fn network_value(&self, field: NetworkField) -> u64;

    /// Current value of an account-level field; `0` for absent accounts.
    fn account_value(&self, account: &AccountId, field: AccountField) -> u64;

    /// Dispatch on a [`PreconditionField`], resolving account fields
    /// against `account`.
    fn read(&self, account: &AccountId, field: PreconditionField) -> u64 {
        match field {
            PreconditionField::Network(f) => self.network_value(f),
            PreconditionField::Account(f) => self.account_value(account, f),
        }
    }
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

/// Records preconditions onto tree nodes from a state snapshot.
///
/// Holds the snapshot for the duration of one composition pass. The
/// snapshot is assumed immutable while the transaction is being built —
/// divergence between it and the live chain is precisely what verification
/// exists to catch later, not a concern here.
pub struct SnapshotCapture<'a> {
    snapshot: &'a dyn StateSnapshotProvider,
}

impl<'a> SnapshotCapture<'a> {
    pub fn new(snapshot: &'a dyn StateSnapshotProvider) -> Self {
        Self { snapshot }
    }

    /// Read the current value of `field` for `node`'s account and record
    /// an equality assertion on it. Returns the observed value so the
    /// caller can make its own decisions against it.
    ///
    /// Calling twice for the same field is a no-op (the snapshot does not
    /// change under us); a conflict can only arise if a different
    /// assertion kind was already recorded on the field.
    pub fn capture_equals(
        &self,
        tree: &mut AccountUpdateTree,
        node: NodeId,
        field: PreconditionField,
    ) -> Result<u64, PreconditionError> {
        let account = tree.node(node).account().clone();
        let observed = self.snapshot.read(&account, field);
        tree.node_mut(node)
            .preconditions
            .assert_equals(field, observed)?;
        debug!(%account, %field, observed, "captured equality precondition");
        Ok(observed)
    }

    /// Record a range assertion after checking that the current value
    /// actually lies within `[low, high]`.
    ///
    /// A range the present state does not satisfy would be a fact that was
    /// never true; that is rejected here as a failed precondition rather
    /// than stored and left to fail at apply time.
    pub fn capture_between(
        &self,
        tree: &mut AccountUpdateTree,
        node: NodeId,
        field: PreconditionField,
        low: u64,
        high: u64,
    ) -> Result<u64, PreconditionError> {
        let account = tree.node(node).account().clone();
        let observed = self.snapshot.read(&account, field);
        let assertion = Assertion::Between { low, high };
        if !assertion.holds(observed) {
            return Err(PreconditionError::PreconditionFailed {
                field,
                expected: assertion,
                actual: observed,
            });
        }
        tree.node_mut(node)
            .preconditions
            .assert_between(field, low, high)?;
        debug!(%account, %field, observed, low, high, "captured range precondition");
        Ok(observed)
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Re-evaluate every assertion on one node against `state`.
///
/// Returns the first failing assertion as
/// [`PreconditionError::PreconditionFailed`] with the field, what was
/// asserted, and the actual value found.
pub fn verify_node(
    node: &AccountUpdateNode,
    state: &dyn StateSnapshotProvider,
) -> Result<(), PreconditionError> {
    for (field, assertion) in node.preconditions.iter() {
        let actual = state.read(node.account(), *field);
        if !assertion.holds(actual) {
            return Err(PreconditionError::PreconditionFailed {
                field: *field,
                expected: *assertion,
                actual,
            });
        }
    }
    Ok(())
}

/// Re-evaluate every assertion in the tree, pre-order, fail-fast.
pub fn verify_tree(
    tree: &AccountUpdateTree,
    state: &dyn StateSnapshotProvider,
) -> Result<(), PreconditionError> {
    for node in tree.pre_order() {
        verify_node(node, state)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{Address, TokenId};
    use crate::crypto::keys::PrismKeypair;
    use std::collections::HashMap;

    /// Minimal in-memory provider for engine tests.
    #[derive(Default)]
    struct FakeState {
        height: u64,
        balances: HashMap<AccountId, u64>,
        nonces: HashMap<AccountId, u64>,
    }

    impl StateSnapshotProvider for FakeState {
        fn network_value(&self, field: NetworkField) -> u64 {
            match field {
                NetworkField::BlockchainLength => self.height,
                NetworkField::Timestamp => 0,
            }
        }

        fn account_value(&self, account: &AccountId, field: AccountField) -> u64 {
            match field {
                AccountField::Balance => self.balances.get(account).copied().unwrap_or(0),
                AccountField::Nonce => self.nonces.get(account).copied().unwrap_or(0),
            }
        }
    }

    fn fresh_account() -> AccountId {
        let kp = PrismKeypair::generate();
        AccountId::new(
            Address::from_public_key(&kp.public_key()),
            TokenId::NATIVE,
        )
    }

    const HEIGHT: PreconditionField = PreconditionField::Network(NetworkField::BlockchainLength);

    #[test]
    fn capture_records_observed_value() {
        let state = FakeState {
            height: 14,
            ..Default::default()
        };
        let mut tree = AccountUpdateTree::new();
        let node = tree.add_root(fresh_account());

        let capture = SnapshotCapture::new(&state);
        let observed = capture.capture_equals(&mut tree, node, HEIGHT).unwrap();
        assert_eq!(observed, 14);
        assert_eq!(
            tree.node(node).preconditions.get(HEIGHT),
            Some(&Assertion::Equals(14))
        );
    }

    #[test]
    fn capture_twice_is_idempotent() {
        let state = FakeState::default();
        let mut tree = AccountUpdateTree::new();
        let node = tree.add_root(fresh_account());

        let capture = SnapshotCapture::new(&state);
        capture.capture_equals(&mut tree, node, HEIGHT).unwrap();
        capture.capture_equals(&mut tree, node, HEIGHT).unwrap();
        assert_eq!(tree.node(node).preconditions.len(), 1);
    }

    #[test]
    fn verify_succeeds_when_state_unchanged() {
        let state = FakeState {
            height: 3,
            ..Default::default()
        };
        let mut tree = AccountUpdateTree::new();
        let node = tree.add_root(fresh_account());
        SnapshotCapture::new(&state)
            .capture_equals(&mut tree, node, HEIGHT)
            .unwrap();

        assert!(verify_tree(&tree, &state).is_ok());
    }

    #[test]
    fn verify_fails_when_state_moved() {
        let mut state = FakeState {
            height: 0,
            ..Default::default()
        };
        let mut tree = AccountUpdateTree::new();
        let node = tree.add_root(fresh_account());
        SnapshotCapture::new(&state)
            .capture_equals(&mut tree, node, HEIGHT)
            .unwrap();

        // The world moves on before the transaction is applied.
        state.height = 500;

        let err = verify_tree(&tree, &state).unwrap_err();
        assert_eq!(
            err,
            PreconditionError::PreconditionFailed {
                field: HEIGHT,
                expected: Assertion::Equals(0),
                actual: 500,
            }
        );
    }

    #[test]
    fn capture_between_rejects_untrue_range() {
        let state = FakeState {
            height: 100,
            ..Default::default()
        };
        let mut tree = AccountUpdateTree::new();
        let node = tree.add_root(fresh_account());

        let err = SnapshotCapture::new(&state)
            .capture_between(&mut tree, node, HEIGHT, 200, 300)
            .unwrap_err();
        assert!(matches!(
            err,
            PreconditionError::PreconditionFailed { actual: 100, .. }
        ));
        // Nothing was recorded.
        assert!(tree.node(node).preconditions.is_empty());
    }

    #[test]
    fn verify_reports_first_failure_in_pre_order() {
        let state = FakeState {
            height: 9,
            ..Default::default()
        };
        let mut tree = AccountUpdateTree::new();
        let first = tree.add_root(fresh_account());
        let second = tree.add_root(fresh_account());

        // Both nodes assert the current height...
        let capture = SnapshotCapture::new(&state);
        capture.capture_equals(&mut tree, first, HEIGHT).unwrap();
        capture.capture_equals(&mut tree, second, HEIGHT).unwrap();

        // ...then the height moves; the failure must surface on the first
        // node in pre-order, regardless of the second also being stale.
        let moved = FakeState {
            height: 10,
            ..Default::default()
        };
        let err = verify_tree(&tree, &moved).unwrap_err();
        assert!(matches!(
            err,
            PreconditionError::PreconditionFailed {
                expected: Assertion::Equals(9),
                actual: 10,
                ..
            }
        ));
    }
}
