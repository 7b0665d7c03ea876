//! End-to-end lockup flows: block-height preconditions captured at
//! composition time and re-verified at apply time.
//!
//! The race test is the heart of it: a transaction that was perfectly
//! valid when built is rejected after the chain height moves, with the
//! failure naming the field, the asserted value, and what the chain
//! actually contained.

use prism_contracts::lockup::LockupContract;
use prism_protocol::account::{AccountId, Address};
use prism_protocol::chain::LocalChain;
use prism_protocol::config::TEST_ACCOUNT_FUNDING;
use prism_protocol::crypto::keys::PrismKeypair;
use prism_protocol::precondition::set::{
    Assertion, NetworkField, PreconditionError, PreconditionField,
};
use prism_protocol::session::{
    Keyring, RejectionReason, SubmissionOutcome, TransactionSession,
};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn setup() -> (LocalChain, Keyring, Address, LockupContract) {
    let (chain, keys) = LocalChain::with_test_accounts(1);
    let mut keyring = Keyring::new();
    let fee_payer = keyring.insert(keys[0].clone());

    let contract_kp = PrismKeypair::generate();
    chain.register_public_key(contract_kp.public_key());
    let contract_addr = keyring.insert(contract_kp);

    (chain, keyring, fee_payer, LockupContract::new(contract_addr))
}

fn deploy(
    chain: &LocalChain,
    keyring: &Keyring,
    fee_payer: &Address,
    lockup: &LockupContract,
    initial_balance: u64,
) {
    let snapshot = chain.snapshot();
    let mut session = TransactionSession::new(fee_payer.clone(), &snapshot).unwrap();
    lockup.deploy(&mut session, initial_balance).unwrap();
    session.authorize(keyring).unwrap();
    let outcome = session.send(chain).unwrap();
    assert!(outcome.is_applied(), "deploy: {outcome:?}");
}

// ---------------------------------------------------------------------------
// Flows
// ---------------------------------------------------------------------------

#[test]
fn height_assertion_verifies_against_unchanged_state() {
    let (chain, keyring, fee_payer, lockup) = setup();
    deploy(&chain, &keyring, &fee_payer, &lockup, 10_000_000_000);
    assert_eq!(
        chain.balance_of(&AccountId::native(lockup.address.clone())),
        10_000_000_000
    );

    // Block height starts at 0; assert it and apply while it still is.
    let snapshot = chain.snapshot();
    let mut session = TransactionSession::new(fee_payer, &snapshot).unwrap();
    lockup
        .require_block_height(&mut session, &snapshot, 0)
        .unwrap();
    session.authorize(&keyring).unwrap();
    let outcome = session.send(&chain).unwrap();
    assert!(outcome.is_applied(), "height 0 assertion: {outcome:?}");
}

#[test]
fn stale_height_assertion_is_rejected_with_field_and_values() {
    let (chain, keyring, fee_payer, lockup) = setup();
    deploy(&chain, &keyring, &fee_payer, &lockup, 10_000_000_000);

    // Build and authorize while the height is 0...
    let snapshot = chain.snapshot();
    let mut session = TransactionSession::new(fee_payer, &snapshot).unwrap();
    lockup
        .require_block_height(&mut session, &snapshot, 0)
        .unwrap();
    session.authorize(&keyring).unwrap();

    // ...then the chain produces 500 blocks before the send lands.
    chain.set_blockchain_length(500);

    let outcome = session.send(&chain).unwrap();
    match outcome {
        SubmissionOutcome::Rejected {
            reason: RejectionReason::Precondition(err),
        } => {
            assert_eq!(
                err,
                PreconditionError::PreconditionFailed {
                    field: PreconditionField::Network(NetworkField::BlockchainLength),
                    expected: Assertion::Equals(0),
                    actual: 500,
                }
            );
        }
        other => panic!("expected precondition rejection, got {other:?}"),
    }
}

#[test]
fn assertion_tracks_height_changes() {
    let (chain, keyring, fee_payer, lockup) = setup();
    deploy(&chain, &keyring, &fee_payer, &lockup, 10_000_000_000);

    chain.set_blockchain_length(500);

    // A fresh composition at the new height captures 500 and verifies.
    let snapshot = chain.snapshot();
    let mut session = TransactionSession::new(fee_payer, &snapshot).unwrap();
    lockup
        .require_block_height(&mut session, &snapshot, 500)
        .unwrap();
    session.authorize(&keyring).unwrap();
    assert!(session.send(&chain).unwrap().is_applied());
}

#[test]
fn payout_respects_the_lockup_window() {
    let (chain, keyring, fee_payer, lockup) = setup();
    deploy(&chain, &keyring, &fee_payer, &lockup, 10_000_000_000);

    let recipient = Address::from_bytes([42u8; 32]);

    // Before the unlock height the payout cannot even be composed.
    let snapshot = chain.snapshot();
    let mut session = TransactionSession::new(fee_payer.clone(), &snapshot).unwrap();
    assert!(lockup
        .payout_after(&mut session, &snapshot, 1_000, recipient.clone(), 5_000)
        .is_err());

    // At height 1,000 the same payout goes through end to end.
    chain.set_blockchain_length(1_000);
    let snapshot = chain.snapshot();
    let mut session = TransactionSession::new(fee_payer.clone(), &snapshot).unwrap();
    lockup
        .payout_after(&mut session, &snapshot, 1_000, recipient.clone(), 5_000)
        .unwrap();
    session.authorize(&keyring).unwrap();
    assert!(session.send(&chain).unwrap().is_applied());

    assert_eq!(chain.balance_of(&AccountId::native(recipient)), 5_000);
    assert_eq!(
        chain.balance_of(&AccountId::native(lockup.address.clone())),
        10_000_000_000 - 5_000
    );
    // Fee payer paid nothing but the funding transaction.
    assert_eq!(
        chain.balance_of(&AccountId::native(fee_payer)),
        TEST_ACCOUNT_FUNDING - 10_000_000_000
    );
}
