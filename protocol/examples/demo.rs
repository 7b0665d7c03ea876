//! Walkthrough of one PRISM transaction, from session to verdict.
//!
//! Funds a contract account, asserts the block height, proves nothing
//! (no proof-gated nodes here), authorizes with an in-memory keyring,
//! and applies against a local chain — then shows the same transaction
//! shape dying after the height moves.
//!
//! Run with:
//!   cargo run --example demo

use prism_protocol::account::{AccountId, Address};
use prism_protocol::chain::LocalChain;
use prism_protocol::crypto::keys::PrismKeypair;
use prism_protocol::precondition::engine::SnapshotCapture;
use prism_protocol::precondition::set::{NetworkField, PreconditionField};
use prism_protocol::session::{Keyring, SubmissionOutcome, TransactionSession};
use prism_protocol::update::types::AuthorizationKind;

fn main() {
    let (chain, keys) = LocalChain::with_test_accounts(1);
    let mut keyring = Keyring::new();
    let fee_payer = keyring.insert(keys[0].clone());

    let contract_kp = PrismKeypair::generate();
    chain.register_public_key(contract_kp.public_key());
    let contract = keyring.insert(contract_kp);

    println!("fee payer : {fee_payer}");
    println!("contract  : {contract}");
    println!("-------------------------------------------");

    // Fund the contract and pin the transaction to height 0.
    let snapshot = chain.snapshot();
    let mut session = TransactionSession::new(fee_payer, &snapshot).unwrap();
    session
        .fund_new_account(contract.clone(), 10_000_000_000)
        .unwrap();
    let asserting = session
        .add_update(AccountId::native(contract.clone()), AuthorizationKind::Signature)
        .unwrap();
    let observed = SnapshotCapture::new(&snapshot)
        .capture_equals(
            session.tree_mut().unwrap(),
            asserting,
            PreconditionField::Network(NetworkField::BlockchainLength),
        )
        .unwrap();
    println!("captured blockchainLength == {observed}");

    session.authorize(&keyring).unwrap();
    match session.send(&chain).unwrap() {
        SubmissionOutcome::Applied { height } => println!("applied at height {height}"),
        SubmissionOutcome::Rejected { reason } => println!("rejected: {reason}"),
    }
    println!(
        "contract balance: {}",
        chain.balance_of(&AccountId::native(contract.clone()))
    );

    // Build the same shape again, then move the chain before sending.
    let snapshot = chain.snapshot();
    let mut stale = TransactionSession::new(
        Address::from_public_key(&keys[0].public_key()),
        &snapshot,
    )
    .unwrap();
    let asserting = stale
        .add_update(AccountId::native(contract), AuthorizationKind::Signature)
        .unwrap();
    SnapshotCapture::new(&snapshot)
        .capture_equals(
            stale.tree_mut().unwrap(),
            asserting,
            PreconditionField::Network(NetworkField::BlockchainLength),
        )
        .unwrap();
    stale.authorize(&keyring).unwrap();

    chain.set_blockchain_length(500);
    println!("-------------------------------------------");
    println!("height moved to 500 before the send landed:");
    match stale.send(&chain).unwrap() {
        SubmissionOutcome::Applied { height } => println!("applied at height {height}"),
        SubmissionOutcome::Rejected { reason } => println!("rejected: {reason}"),
    }
}
