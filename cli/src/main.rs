// Copyright (c) 2026 Refract Systems. MIT License.
// See LICENSE for details.

//! # PRISM Demo Runner
//!
//! Entry point for the `prism` binary. Parses CLI arguments, initializes
//! logging, and runs one of the demo scenarios end to end against a
//! local chain:
//!
//! - `token-demo`  — custom-token deployment, minting, and two
//!   callback-authorized transfers
//! - `lockup-demo` — block-height preconditions, including the race that
//!   voids a stale transaction
//! - `version`     — print build version information

mod cli;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;

use prism_contracts::lockup::LockupContract;
use prism_contracts::token::{HolderContract, TokenContract};
use prism_protocol::account::{AccountId, Address};
use prism_protocol::callback::ContractRegistry;
use prism_protocol::chain::{ChainState, LocalChain};
use prism_protocol::crypto::keys::PrismKeypair;
use prism_protocol::session::{
    Keyring, SessionError, SubmissionOutcome, TransactionSession,
};
use prism_protocol::zkp::prover::LocalProver;

use cli::{Commands, PrismCli, TokenDemoArgs};

fn main() -> Result<()> {
    let args = PrismCli::parse();
    logging::init(
        "prism=info,prism_protocol=info,prism_contracts=info",
        args.log_format,
    );

    match args.command {
        Commands::TokenDemo(demo) => token_demo(demo),
        Commands::LockupDemo => lockup_demo(),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Runs one transaction through compose → prove → authorize → send and
/// bails on any verdict other than `Applied`.
fn transact(
    chain: &LocalChain,
    keyring: &Keyring,
    fee_payer: &Address,
    label: &str,
    build: impl FnOnce(&mut TransactionSession, &ChainState) -> Result<(), SessionError>,
) -> Result<()> {
    let snapshot = chain.snapshot();
    let mut session = TransactionSession::new(fee_payer.clone(), &snapshot)
        .with_context(|| format!("{label}: opening session"))?;
    build(&mut session, &snapshot).with_context(|| format!("{label}: composing"))?;
    if session.requires_proofs() {
        println!("{label} (proof)");
        session
            .prove(&LocalProver::new())
            .with_context(|| format!("{label}: proving"))?;
    }
    session
        .authorize(keyring)
        .with_context(|| format!("{label}: authorizing"))?;
    match session
        .send(chain)
        .with_context(|| format!("{label}: sending"))?
    {
        SubmissionOutcome::Applied { height } => {
            tracing::info!(label, height, "transaction applied");
            Ok(())
        }
        SubmissionOutcome::Rejected { reason } => {
            anyhow::bail!("{label}: rejected: {reason}")
        }
    }
}

/// The custom-token lifecycle demo.
fn token_demo(args: TokenDemoArgs) -> Result<()> {
    let (chain, keys) = LocalChain::with_test_accounts(2);
    let mut keyring = Keyring::new();
    let fee_payer = keyring.insert(keys[0].clone());
    let token_account1 = keyring.insert(keys[1].clone());

    let mut registered = |keyring: &mut Keyring| {
        let kp = PrismKeypair::generate();
        chain.register_public_key(kp.public_key());
        keyring.insert(kp)
    };
    let token_addr = registered(&mut keyring);
    let b_addr = registered(&mut keyring);
    let c_addr = registered(&mut keyring);

    let token = TokenContract::new(token_addr.clone());
    let token_id = token.token_id();

    println!("tokenContract  {token_addr}");
    println!("holderB        {b_addr}");
    println!("holderC        {c_addr}");
    println!("receiver       {token_account1}");
    println!("feePayer       {fee_payer}");
    println!("-------------------------------------------");

    let vk = |tag: &[u8]| {
        prism_protocol::update::types::VerificationKeyDigest::from_bytes(
            prism_protocol::crypto::hash::blake3_hash(tag),
        )
    };

    println!("deploy token contract");
    transact(&chain, &keyring, &fee_payer, "deploy", |session, _| {
        token.deploy(session, vk(b"token-contract-vk"), 10_000_000)?;
        Ok(())
    })?;

    println!("deploy holder B");
    transact(&chain, &keyring, &fee_payer, "deploy holder B", |session, _| {
        token.token_deploy(session, b_addr.clone(), vk(b"holder-b-vk"))?;
        Ok(())
    })?;

    println!("deploy holder C");
    transact(&chain, &keyring, &fee_payer, "deploy holder C", |session, _| {
        token.token_deploy(session, c_addr.clone(), vk(b"holder-c-vk"))?;
        Ok(())
    })?;

    println!("mint {} to holder B", args.mint_amount);
    transact(&chain, &keyring, &fee_payer, "mint", |session, _| {
        token.mint(session, b_addr.clone(), args.mint_amount)?;
        Ok(())
    })?;

    let mut registry = ContractRegistry::new();
    HolderContract::new(b_addr.clone(), token_id).register(&mut registry);
    HolderContract::new(c_addr.clone(), token_id).register(&mut registry);

    println!("authorize send from holder B");
    transact(&chain, &keyring, &fee_payer, "send B->C", |session, snapshot| {
        token.send_tokens(
            session,
            &registry,
            snapshot,
            b_addr.clone(),
            c_addr.clone(),
            args.transfer_amount,
        )?;
        Ok(())
    })?;
    println!(
        "holder C balance for token {}: {}",
        token_id.to_base58(),
        chain.balance_of(&AccountId::new(c_addr.clone(), token_id))
    );

    println!("authorize send from holder C");
    transact(&chain, &keyring, &fee_payer, "send C->receiver", |session, snapshot| {
        token.send_tokens(
            session,
            &registry,
            snapshot,
            c_addr.clone(),
            token_account1.clone(),
            args.transfer_amount,
        )?;
        Ok(())
    })?;
    println!(
        "receiver balance for token {}: {}",
        token_id.to_base58(),
        chain.balance_of(&AccountId::new(token_account1, token_id))
    );

    Ok(())
}

/// The block-height precondition demo.
fn lockup_demo() -> Result<()> {
    let (chain, keys) = LocalChain::with_test_accounts(1);
    let mut keyring = Keyring::new();
    let fee_payer = keyring.insert(keys[0].clone());

    let contract_kp = PrismKeypair::generate();
    chain.register_public_key(contract_kp.public_key());
    let lockup = LockupContract::new(keyring.insert(contract_kp));

    println!("deploy lockup contract");
    transact(&chain, &keyring, &fee_payer, "deploy", |session, _| {
        lockup.deploy(session, 10_000_000_000)?;
        Ok(())
    })?;

    println!("assert block height 0");
    transact(&chain, &keyring, &fee_payer, "assert height 0", |session, snapshot| {
        lockup.require_block_height(session, snapshot, 0)?;
        Ok(())
    })?;

    chain.set_blockchain_length(500);
    println!("assert block height 500");
    transact(&chain, &keyring, &fee_payer, "assert height 500", |session, snapshot| {
        lockup.require_block_height(session, snapshot, 500)?;
        Ok(())
    })?;

    chain.set_blockchain_length(5);
    println!("invalid block height precondition");
    let snapshot = chain.snapshot();
    let mut session = TransactionSession::new(fee_payer, &snapshot)?;
    match lockup.require_block_height(&mut session, &snapshot, 300) {
        Ok(_) => anyhow::bail!("a wrong height expectation must not compose"),
        Err(e) => println!(
            "expected to fail: block height is {}, tried to assert 300: {e}",
            chain.blockchain_length()
        ),
    }

    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("prism     {}", env!("CARGO_PKG_VERSION"));
    println!("protocol  {}", prism_protocol::config::PROTOCOL_VERSION);
}
