//! Benchmarks for the hot paths of transaction composition: building
//! wide trees, replaying the accounting ledger, re-verifying
//! preconditions, and computing the commitment.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use prism_protocol::account::{AccountId, Address, TokenId};
use prism_protocol::accounting::TokenAccountingLedger;
use prism_protocol::chain::ChainState;
use prism_protocol::precondition::engine::{verify_tree, SnapshotCapture};
use prism_protocol::precondition::set::{NetworkField, PreconditionField};
use prism_protocol::update::tree::{AccountUpdateTree, TokenScope};
use prism_protocol::update::types::BalanceDelta;

fn address(i: u64) -> Address {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&i.to_le_bytes());
    Address::from_bytes(bytes)
}

/// A root with `n` children, alternating matched debits and credits, each
/// child asserting the current block height.
fn build_tree(n: u64) -> AccountUpdateTree {
    let state = ChainState::new();
    let capture = SnapshotCapture::new(&state);

    let mut tree = AccountUpdateTree::new();
    let root = tree.add_root(AccountId::native(address(0)));
    for i in 1..=n {
        let child = tree
            .create_child(root, address(i), TokenScope::Inherit)
            .expect("flat tree stays under the depth limit");
        tree.node_mut(child).balance_delta = if i % 2 == 0 {
            BalanceDelta::credit(1_000)
        } else {
            BalanceDelta::debit(1_000)
        };
        capture
            .capture_equals(
                &mut tree,
                child,
                PreconditionField::Network(NetworkField::BlockchainLength),
            )
            .expect("capture against an empty state");
    }
    tree
}

fn bench_tree_build(c: &mut Criterion) {
    c.bench_function("tree_build_1000", |b| {
        b.iter(|| build_tree(1_000));
    });
}

fn bench_ledger_accumulate(c: &mut Criterion) {
    let tree = build_tree(1_000);
    c.bench_function("ledger_accumulate_1000", |b| {
        b.iter(|| {
            let ledger = TokenAccountingLedger::accumulate(&tree);
            ledger.check_balanced(TokenId::NATIVE).unwrap();
        });
    });
}

fn bench_precondition_verify(c: &mut Criterion) {
    let tree = build_tree(1_000);
    let state = ChainState::new();
    c.bench_function("precondition_verify_1000", |b| {
        b.iter(|| verify_tree(&tree, &state).unwrap());
    });
}

fn bench_commitment(c: &mut Criterion) {
    c.bench_function("commitment_1000", |b| {
        b.iter_batched(
            || build_tree(1_000),
            |tree| tree.commitment(),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_tree_build,
    bench_ledger_accumulate,
    bench_precondition_verify,
    bench_commitment,
);
criterion_main!(benches);
