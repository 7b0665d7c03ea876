//! # The Local Chain
//!
//! An in-memory chain used by demos and tests: funded test accounts, a
//! block height that moves only when told to, and a
//! [`SubmissionService`] implementation that does what a real network
//! would — re-verify every precondition against live state, re-check
//! token accounting, validate authorizations against the permission
//! policies on record, and then apply the whole tree atomically or not
//! at all.
//!
//! Interior mutability via `parking_lot::RwLock` so one `LocalChain` can
//! be shared as both the live [`StateSnapshotProvider`] and the
//! submission target without ceremony.

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::account::permissions::AuthRequirement;
use crate::account::{AccountId, Address, Permissions};
use crate::accounting::TokenAccountingLedger;
use crate::config::TEST_ACCOUNT_FUNDING;
use crate::crypto::keys::{PrismKeypair, PrismPublicKey};
use crate::precondition::engine::{verify_tree, StateSnapshotProvider};
use crate::precondition::set::{AccountField, NetworkField};
use crate::session::{RejectionReason, SubmissionOutcome, SubmissionService};
use crate::update::node::AccountUpdateNode;
use crate::update::tree::AccountUpdateTree;
use crate::update::types::{Authorization, AuthorizationKind};

use super::state::{AccountRecord, ChainState};

// ---------------------------------------------------------------------------
// LocalChain
// ---------------------------------------------------------------------------

/// The simulated chain.
pub struct LocalChain {
    state: RwLock<ChainState>,
}

impl Default for LocalChain {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalChain {
    /// An empty chain at height zero.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ChainState::new()),
        }
    }

    /// A chain with `n` pre-funded test accounts, their keypairs
    /// returned for signing. Each account holds
    /// [`TEST_ACCOUNT_FUNDING`] and has its public key on record.
    pub fn with_test_accounts(n: usize) -> (Self, Vec<PrismKeypair>) {
        let chain = Self::new();
        let mut keypairs = Vec::with_capacity(n);
        {
            let mut state = chain.state.write();
            for _ in 0..n {
                let kp = PrismKeypair::generate();
                let address = Address::from_public_key(&kp.public_key());
                let mut record = AccountRecord::with_balance(TEST_ACCOUNT_FUNDING);
                record.public_key = Some(kp.public_key());
                state.insert(AccountId::native(address), record);
                keypairs.push(kp);
            }
        }
        (chain, keypairs)
    }

    /// An immutable snapshot for one composition pass.
    pub fn snapshot(&self) -> ChainState {
        self.state.read().clone()
    }

    /// Move the block height. The only way height changes on a local
    /// chain — applying transactions does not advance it.
    pub fn set_blockchain_length(&self, height: u64) {
        self.state.write().network.blockchain_length = height;
        debug!(height, "blockchain length set");
    }

    /// Set the network timestamp.
    pub fn set_timestamp(&self, timestamp: u64) {
        self.state.write().network.timestamp = timestamp;
    }

    /// Current block height.
    pub fn blockchain_length(&self) -> u64 {
        self.state.read().network.blockchain_length
    }

    /// Balance of an account; zero when absent.
    pub fn balance_of(&self, account: &AccountId) -> u64 {
        self.state
            .read()
            .get(account)
            .map(|r| r.balance)
            .unwrap_or(0)
    }

    /// Nonce of an account; zero when absent.
    pub fn nonce_of(&self, account: &AccountId) -> u64 {
        self.state
            .read()
            .get(account)
            .map(|r| r.nonce)
            .unwrap_or(0)
    }

    /// A copy of an account's record, if it exists.
    pub fn account(&self, account: &AccountId) -> Option<AccountRecord> {
        self.state.read().get(account).cloned()
    }

    /// Introduce a public key to the chain, so signature authorizations
    /// from its address can be verified. Creates an empty record when the
    /// native account does not exist yet.
    pub fn register_public_key(&self, public_key: PrismPublicKey) -> Address {
        let address = Address::from_public_key(&public_key);
        let mut state = self.state.write();
        state
            .get_or_create(&AccountId::native(address.clone()))
            .public_key = Some(public_key);
        address
    }

    // -- apply-time validation ----------------------------------------------

    /// Every permission the update's contents engage, per the account's
    /// policy on record.
    fn engaged_requirements(record: &AccountRecord, node: &AccountUpdateNode) -> Vec<AuthRequirement> {
        let p: &Permissions = &record.permissions;
        let mut reqs = Vec::new();
        if node.balance_delta.is_negative() {
            reqs.push(p.send);
        }
        if node.balance_delta.is_positive() {
            reqs.push(p.receive);
        }
        if node.update.app_state.iter().any(|s| s.is_set()) {
            reqs.push(p.edit_state);
        }
        if node.update.permissions.is_set() {
            reqs.push(p.set_permissions);
        }
        if node.update.verification_key.is_set() {
            reqs.push(p.set_verification_key);
        }
        reqs
    }

    /// Validate one node's authorization against policy and key material.
    fn validate_authorization(
        state: &ChainState,
        node: &AccountUpdateNode,
        commitment: &[u8; 32],
    ) -> Result<(), RejectionReason> {
        let account = node.account().clone();
        let record = state.get(&account).cloned().unwrap_or_default();

        // Policy: the declared kind must satisfy every engaged permission.
        for req in Self::engaged_requirements(&record, node) {
            if !req.satisfied_by(node.authorization_kind) {
                return Err(RejectionReason::Unauthorized {
                    account,
                    required: req,
                    carried: node.authorization_kind,
                });
            }
        }

        // Attachment: what the node carries must match its declared kind,
        // and signatures must verify when the key is on record.
        match node.authorization_kind {
            AuthorizationKind::None => Ok(()),
            AuthorizationKind::Proof => match node.authorization() {
                // The artifact is opaque to the chain; the proving
                // backend's verifier is the external party that would
                // check it. Presence is what the protocol layer enforces.
                Authorization::Proof(_) => Ok(()),
                other => Err(RejectionReason::Unauthorized {
                    account,
                    required: AuthRequirement::Proof,
                    carried: other.kind(),
                }),
            },
            AuthorizationKind::Signature => match node.authorization() {
                Authorization::Signature(sig) => {
                    // Signature-authorized updates sign the base address's
                    // key regardless of token scope.
                    let key_account = AccountId::native(account.address.clone());
                    let known_key = state
                        .get(&key_account)
                        .and_then(|r| r.public_key.clone());
                    match known_key {
                        Some(pk) => {
                            if pk.verify(commitment, sig) {
                                Ok(())
                            } else {
                                Err(RejectionReason::InvalidSignature { account })
                            }
                        }
                        // A key the chain was never introduced to cannot
                        // be verified; the simulation accepts it rather
                        // than inventing a key registry the real network
                        // would not have either.
                        None => {
                            debug!(%account, "signature accepted without known key");
                            Ok(())
                        }
                    }
                }
                other => Err(RejectionReason::Unauthorized {
                    account,
                    required: AuthRequirement::Signature,
                    carried: other.kind(),
                }),
            },
        }
    }

    /// Validate balances and compute the post-application values without
    /// mutating anything.
    fn compute_new_balances(
        state: &ChainState,
        ledger: &TokenAccountingLedger,
    ) -> Result<Vec<(AccountId, u64)>, RejectionReason> {
        let mut new_balances = Vec::new();
        for (account, delta) in ledger.entries() {
            if delta == 0 {
                continue;
            }
            let balance = state.get(account).map(|r| r.balance).unwrap_or(0);
            let updated = (balance as i128) + delta;
            if updated < 0 {
                return Err(RejectionReason::InsufficientBalance {
                    account: account.clone(),
                    balance,
                    delta,
                });
            }
            if updated > u64::MAX as i128 {
                return Err(RejectionReason::BalanceOverflow {
                    account: account.clone(),
                });
            }
            new_balances.push((account.clone(), updated as u64));
        }
        Ok(new_balances)
    }

    /// The validation pipeline; returns the state mutations to commit.
    fn validate(
        state: &ChainState,
        tree: &AccountUpdateTree,
    ) -> Result<Vec<(AccountId, u64)>, RejectionReason> {
        // 1. Preconditions against live state, pre-order, fail-fast.
        verify_tree(tree, state)?;

        // 2. The zero-sum invariant, recomputed here — the submitted
        //    ledger snapshot is advisory, live state is not.
        let ledger = TokenAccountingLedger::accumulate(tree);
        ledger.check_all()?;

        // 3. Authorizations against policy and key material.
        let commitment = tree.commitment();
        for node in tree.pre_order() {
            Self::validate_authorization(state, node, &commitment)?;
        }

        // 4. Balance feasibility.
        Self::compute_new_balances(state, &ledger)
    }

    /// Commit phase: infallible by construction, everything was validated.
    fn commit(state: &mut ChainState, tree: &AccountUpdateTree, new_balances: Vec<(AccountId, u64)>) {
        for (account, balance) in new_balances {
            state.get_or_create(&account).balance = balance;
        }

        // Update requests, in pre-order.
        for node in tree.pre_order() {
            if node.update.is_noop() {
                continue;
            }
            let record = state.get_or_create(node.account());
            for (slot, proposed) in record.app_state.iter_mut().zip(node.update.app_state.iter()) {
                if let Some(v) = proposed.as_set() {
                    *slot = *v;
                }
            }
            if let Some(p) = node.update.permissions.as_set() {
                record.permissions = *p;
            }
            if let Some(vk) = node.update.verification_key.as_set() {
                record.verification_key = Some(*vk);
            }
        }

        // The fee payer's nonce moves exactly once per applied
        // transaction; its captured nonce precondition is what makes
        // replays fail.
        if let Some(&fee_payer) = tree.roots().first() {
            let account = tree.node(fee_payer).account().clone();
            state.get_or_create(&account).nonce += 1;
        }
    }
}

impl StateSnapshotProvider for LocalChain {
    fn network_value(&self, field: NetworkField) -> u64 {
        self.state.read().network.value(field)
    }

    fn account_value(&self, account: &AccountId, field: AccountField) -> u64 {
        self.state.read().account_value(account, field)
    }
}

impl SubmissionService for LocalChain {
    fn apply(
        &self,
        tree: &AccountUpdateTree,
        _ledger: &TokenAccountingLedger,
    ) -> SubmissionOutcome {
        let mut state = self.state.write();

        match Self::validate(&state, tree) {
            Ok(new_balances) => {
                Self::commit(&mut state, tree, new_balances);
                let height = state.network.blockchain_length;
                info!(nodes = tree.len(), height, "transaction applied to local chain");
                SubmissionOutcome::Applied { height }
            }
            Err(reason) => {
                info!(%reason, "transaction rejected by local chain");
                SubmissionOutcome::Rejected { reason }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Keyring, SessionError, Signer, TransactionSession};
    use crate::update::types::BalanceDelta;

    #[test]
    fn test_accounts_are_funded_and_known() {
        let (chain, keys) = LocalChain::with_test_accounts(2);
        assert_eq!(keys.len(), 2);
        for kp in &keys {
            let account = AccountId::native(Address::from_public_key(&kp.public_key()));
            assert_eq!(chain.balance_of(&account), TEST_ACCOUNT_FUNDING);
            assert!(chain.account(&account).unwrap().public_key.is_some());
        }
    }

    #[test]
    fn fund_new_account_end_to_end() {
        let (chain, keys) = LocalChain::with_test_accounts(1);
        let mut keyring = Keyring::new();
        let fee_payer = keyring.insert(keys[0].clone());

        let snapshot = chain.snapshot();
        let mut session = TransactionSession::new(fee_payer.clone(), &snapshot).unwrap();
        let new_addr = Address::from_bytes([42u8; 32]);
        session
            .fund_new_account(new_addr.clone(), 10_000_000_000)
            .unwrap();
        session.authorize(&keyring).unwrap();

        let outcome = session.send(&chain).unwrap();
        assert!(outcome.is_applied());

        assert_eq!(
            chain.balance_of(&AccountId::native(new_addr)),
            10_000_000_000
        );
        assert_eq!(
            chain.balance_of(&AccountId::native(fee_payer.clone())),
            TEST_ACCOUNT_FUNDING - 10_000_000_000
        );
        // Fee payer nonce bumped exactly once.
        assert_eq!(chain.nonce_of(&AccountId::native(fee_payer)), 1);
    }

    #[test]
    fn replaying_a_session_shape_fails_on_nonce() {
        let (chain, keys) = LocalChain::with_test_accounts(1);
        let mut keyring = Keyring::new();
        let fee_payer = keyring.insert(keys[0].clone());

        let run = |chain: &LocalChain, keyring: &Keyring| -> SubmissionOutcome {
            let snapshot = chain.snapshot();
            let mut session = TransactionSession::new(fee_payer.clone(), &snapshot).unwrap();
            session
                .fund_new_account(Address::from_bytes([9u8; 32]), 1_000)
                .unwrap();
            session.authorize(keyring).unwrap();
            session.send(chain).unwrap()
        };

        assert!(run(&chain, &keyring).is_applied());

        // Second run re-captures the new nonce, so it applies too...
        assert!(run(&chain, &keyring).is_applied());

        // ...but a stale session built against the old snapshot fails.
        let stale_snapshot = {
            let mut s = chain.snapshot();
            s.get_mut(&AccountId::native(fee_payer.clone()))
                .unwrap()
                .nonce = 0;
            s
        };
        let mut stale = TransactionSession::new(fee_payer.clone(), &stale_snapshot).unwrap();
        stale
            .fund_new_account(Address::from_bytes([10u8; 32]), 1_000)
            .unwrap();
        stale.authorize(&keyring).unwrap();
        let outcome = stale.send(&chain).unwrap();
        assert!(matches!(
            outcome,
            SubmissionOutcome::Rejected {
                reason: RejectionReason::Precondition(_)
            }
        ));
    }

    #[test]
    fn overdraw_is_rejected_whole() {
        let (chain, keys) = LocalChain::with_test_accounts(2);
        let mut keyring = Keyring::new();
        let fee_payer = keyring.insert(keys[0].clone());

        let snapshot = chain.snapshot();
        let mut session = TransactionSession::new(fee_payer, &snapshot).unwrap();
        session
            .fund_new_account(Address::from_bytes([77u8; 32]), TEST_ACCOUNT_FUNDING + 1)
            .unwrap();
        session.authorize(&keyring).unwrap();

        let outcome = session.send(&chain).unwrap();
        assert!(matches!(
            outcome,
            SubmissionOutcome::Rejected {
                reason: RejectionReason::InsufficientBalance { .. }
            }
        ));
        // Nothing applied.
        assert_eq!(
            chain.balance_of(&AccountId::native(Address::from_bytes([77u8; 32]))),
            0
        );
    }

    #[test]
    fn bad_signature_is_rejected() {
        let (chain, keys) = LocalChain::with_test_accounts(2);

        // Sign with the wrong key for the fee payer's address.
        struct WrongKey(PrismKeypair);
        impl Signer for WrongKey {
            fn sign(&self, _address: &Address, message: &[u8]) -> Option<crate::crypto::keys::PrismSignature> {
                Some(self.0.sign(message))
            }
        }

        let fee_payer = Address::from_public_key(&keys[0].public_key());
        let snapshot = chain.snapshot();
        let mut session = TransactionSession::new(fee_payer, &snapshot).unwrap();
        session
            .fund_new_account(Address::from_bytes([11u8; 32]), 5)
            .unwrap();
        session.authorize(&WrongKey(keys[1].clone())).unwrap();

        let outcome = session.send(&chain).unwrap();
        assert!(matches!(
            outcome,
            SubmissionOutcome::Rejected {
                reason: RejectionReason::InvalidSignature { .. }
            }
        ));
    }

    #[test]
    fn policy_gates_unauthorized_debits() {
        let (chain, keys) = LocalChain::with_test_accounts(2);
        let mut keyring = Keyring::new();
        let fee_payer = keyring.insert(keys[0].clone());
        let victim = Address::from_public_key(&keys[1].public_key());

        // Try to debit the victim with no authorization at all.
        let snapshot = chain.snapshot();
        let mut session = TransactionSession::new(fee_payer.clone(), &snapshot).unwrap();
        let theft = session
            .add_update(AccountId::native(victim), AuthorizationKind::None)
            .unwrap();
        {
            let tree = session.tree_mut().unwrap();
            tree.node_mut(theft).balance_delta = BalanceDelta::debit(500);
            let payer = tree.roots()[0];
            tree.node_mut(payer).balance_delta = BalanceDelta::credit(500);
        }
        session.authorize(&keyring).unwrap();

        let outcome = session.send(&chain).unwrap();
        assert!(matches!(
            outcome,
            SubmissionOutcome::Rejected {
                reason: RejectionReason::Unauthorized { .. }
            }
        ));
    }

    #[test]
    fn height_only_moves_when_told() {
        let (chain, _keys) = LocalChain::with_test_accounts(1);
        assert_eq!(chain.blockchain_length(), 0);
        chain.set_blockchain_length(500);
        assert_eq!(chain.blockchain_length(), 500);
    }

    #[test]
    fn session_error_type_composes() {
        // Compile-time sanity that chain rejections and session errors
        // stay distinct: a rejected submission is an Ok(SubmissionOutcome),
        // never a SessionError.
        fn assert_send<T: Send>() {}
        assert_send::<SessionError>();
        assert_send::<RejectionReason>();
    }
}
