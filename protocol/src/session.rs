//! # Transaction Sessions
//!
//! A [`TransactionSession`] owns exactly one account-update tree for its
//! lifetime and drives it through the lifecycle:
//!
//! ```text
//! Building ──(prove, optional)──> Proved ──┐
//!     │                                    ├──(authorize)──> Authorized ──(send)──> Sent
//!     └────────────────────────────────────┘
//! ```
//!
//! `Applied` / `Rejected` are *not* session states — they are the
//! submission collaborator's verdict, produced after it re-runs
//! precondition verification and token accounting against live state.
//!
//! Composition is strictly sequential: contract methods append to the
//! session one after another, and child ordering, token inheritance, and
//! pre-order verification all depend on that. The one concession to
//! parallelism is proof generation, which fans out across scoped worker
//! threads — proofs are heavy and independent per node, and all of them
//! must land before the session can advance anyway.
//!
//! A session that fails mid-`Building` holds a tree in a known-bad state.
//! Discard it and rebuild; nothing here attempts in-place repair.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::account::{AccountId, Address};
use crate::accounting::{AccountingError, TokenAccountingLedger};
use crate::callback::{CallbackBroker, CallbackDeclaration, CallbackError};
use crate::crypto::keys::{PrismKeypair, PrismSignature};
use crate::precondition::engine::{SnapshotCapture, StateSnapshotProvider};
use crate::precondition::set::{AccountField, PreconditionError, PreconditionField};
use crate::update::node::AccountUpdateNode;
use crate::update::tree::{AccountUpdateTree, NodeId, TreeError};
use crate::update::types::{Authorization, AuthorizationKind, BalanceDelta};
use crate::zkp::prover::{ConstraintContext, Prover};

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Lifecycle state of a transaction session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Open for composition: appends, preconditions, callbacks.
    Building,
    /// All required proofs attached; composition is closed.
    Proved,
    /// Every node's authorization requirement discharged.
    Authorized,
    /// Handed to the submission collaborator. Terminal for the session.
    Sent,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Building => "Building",
            SessionState::Proved => "Proved",
            SessionState::Authorized => "Authorized",
            SessionState::Sent => "Sent",
        };
        write!(f, "{}", s)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from session lifecycle operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// An operation was attempted in the wrong lifecycle state.
    #[error("invalid session state: operation requires {expected}, session is {found}")]
    InvalidState {
        expected: SessionState,
        found: SessionState,
    },

    /// A node's authorization requirement could not be discharged.
    /// Reports the first unmet node in pre-order.
    #[error("missing authorization on node {node} ({account}): requires {required}")]
    MissingAuthorization {
        node: NodeId,
        account: AccountId,
        required: AuthorizationKind,
    },

    /// The prover failed for a node; the session stays in `Building`.
    #[error("proof generation failed for node {node}: {reason}")]
    ProofGenerationFailed { node: NodeId, reason: String },

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    Callback(#[from] CallbackError),

    #[error(transparent)]
    Accounting(#[from] AccountingError),
}

// ---------------------------------------------------------------------------
// Signer
// ---------------------------------------------------------------------------

/// Signature provider, as the session sees it.
///
/// Returns `None` when no key is available for the address; the session
/// turns that into a [`SessionError::MissingAuthorization`] naming the
/// node.
pub trait Signer {
    fn sign(&self, address: &Address, message: &[u8]) -> Option<PrismSignature>;
}

/// An in-memory keyring: the simplest [`Signer`].
#[derive(Default)]
pub struct Keyring {
    keys: HashMap<Address, PrismKeypair>,
}

impl Keyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a keypair; returns the address it answers for.
    pub fn insert(&mut self, keypair: PrismKeypair) -> Address {
        let address = Address::from_public_key(&keypair.public_key());
        self.keys.insert(address.clone(), keypair);
        address
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.keys.contains_key(address)
    }
}

impl Signer for Keyring {
    fn sign(&self, address: &Address, message: &[u8]) -> Option<PrismSignature> {
        self.keys.get(address).map(|kp| kp.sign(message))
    }
}

// ---------------------------------------------------------------------------
// Submission interface
// ---------------------------------------------------------------------------

/// Why a submission was rejected.
#[derive(Debug, Error)]
pub enum RejectionReason {
    /// A captured assertion no longer holds against live state.
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    /// The zero-sum invariant failed on re-check.
    #[error(transparent)]
    Accounting(#[from] AccountingError),

    /// A signature did not verify against the account's known key.
    #[error("invalid signature on update for {account}")]
    InvalidSignature { account: AccountId },

    /// The attached authorization does not satisfy the account's
    /// permission policy for what the update does.
    #[error("unauthorized update for {account}: policy requires {required}, update carries {carried}")]
    Unauthorized {
        account: AccountId,
        required: crate::account::permissions::AuthRequirement,
        carried: AuthorizationKind,
    },

    /// Applying the deltas would drive a balance below zero.
    #[error("insufficient balance for {account}: has {balance}, delta {delta}")]
    InsufficientBalance {
        account: AccountId,
        balance: u64,
        delta: i128,
    },

    /// Applying the deltas would overflow a balance.
    #[error("balance overflow for {account}")]
    BalanceOverflow { account: AccountId },
}

/// Verdict from the submission collaborator.
#[derive(Debug)]
pub enum SubmissionOutcome {
    /// The whole tree applied atomically.
    Applied {
        /// Blockchain length at application time.
        height: u64,
    },
    /// The whole transaction was rejected; nothing applied.
    Rejected { reason: RejectionReason },
}

impl SubmissionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, SubmissionOutcome::Applied { .. })
    }
}

/// The external service that applies a finished tree to live state,
/// re-running precondition verification and token accounting first.
pub trait SubmissionService {
    fn apply(
        &self,
        tree: &AccountUpdateTree,
        ledger: &TokenAccountingLedger,
    ) -> SubmissionOutcome;
}

// ---------------------------------------------------------------------------
// TransactionSession
// ---------------------------------------------------------------------------

/// One transaction under composition: the tree, its fee payer, and the
/// lifecycle state.
pub struct TransactionSession {
    id: Uuid,
    state: SessionState,
    tree: AccountUpdateTree,
    fee_payer: NodeId,
    created_at: DateTime<Utc>,
}

impl TransactionSession {
    /// Open a session with `fee_payer` as the first root.
    ///
    /// The fee payer's update captures a nonce-equality precondition from
    /// the snapshot immediately — that is the transaction's replay
    /// protection — and requires signature authorization.
    pub fn new(
        fee_payer: Address,
        snapshot: &dyn StateSnapshotProvider,
    ) -> Result<Self, SessionError> {
        let mut tree = AccountUpdateTree::new();
        let fee_payer_node = tree.add_root(AccountId::native(fee_payer));
        tree.node_mut(fee_payer_node).authorization_kind = AuthorizationKind::Signature;

        SnapshotCapture::new(snapshot).capture_equals(
            &mut tree,
            fee_payer_node,
            PreconditionField::Account(AccountField::Nonce),
        )?;

        let session = Self {
            id: Uuid::new_v4(),
            state: SessionState::Building,
            tree,
            fee_payer: fee_payer_node,
            created_at: Utc::now(),
        };
        debug!(session = %session.id, "transaction session opened");
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn fee_payer(&self) -> NodeId {
        self.fee_payer
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Read access to the tree in any state.
    pub fn tree(&self) -> &AccountUpdateTree {
        &self.tree
    }

    /// Mutable access to the tree, only while `Building`.
    pub fn tree_mut(&mut self) -> Result<&mut AccountUpdateTree, SessionError> {
        self.ensure_state(SessionState::Building)?;
        Ok(&mut self.tree)
    }

    fn ensure_state(&self, expected: SessionState) -> Result<(), SessionError> {
        if self.state != expected {
            return Err(SessionError::InvalidState {
                expected,
                found: self.state,
            });
        }
        Ok(())
    }

    /// Append an independently-authorized top-level update.
    pub fn add_update(
        &mut self,
        account: AccountId,
        authorization_kind: AuthorizationKind,
    ) -> Result<NodeId, SessionError> {
        let tree = self.tree_mut()?;
        let node = tree.add_root(account);
        tree.node_mut(node).authorization_kind = authorization_kind;
        Ok(node)
    }

    /// Fund a new account: the fee payer pays `amount`, the new account
    /// receives it as a fresh top-level update.
    ///
    /// Returns the new account's node so the caller can attach further
    /// changes (a deployment typically sets permissions on it next).
    pub fn fund_new_account(
        &mut self,
        address: Address,
        amount: u64,
    ) -> Result<NodeId, SessionError> {
        let fee_payer = self.fee_payer;
        let tree = self.tree_mut()?;

        let payer_delta = tree.node(fee_payer).balance_delta;
        tree.node_mut(fee_payer).balance_delta = payer_delta
            .checked_add(BalanceDelta::debit(amount))
            .expect("i128 accumulator cannot overflow on u64-sized deltas");

        let funded = tree.add_root(AccountId::native(address));
        tree.node_mut(funded).balance_delta = BalanceDelta::credit(amount);
        debug!(node = %funded, amount, "funding new account");
        Ok(funded)
    }

    /// Invoke a contract method as a callback under `caller` (see
    /// [`CallbackBroker`]).
    pub fn invoke_callback(
        &mut self,
        broker: &CallbackBroker<'_>,
        caller: NodeId,
        decl: &CallbackDeclaration,
        args: &[u8],
        snapshot: &dyn StateSnapshotProvider,
    ) -> Result<NodeId, SessionError> {
        let tree = self.tree_mut()?;
        Ok(broker.invoke_as_callback(tree, caller, decl, args, snapshot)?)
    }

    /// Whether any node requires proof authorization.
    pub fn requires_proofs(&self) -> bool {
        self.tree
            .pre_order()
            .any(|n| n.authorization_kind == AuthorizationKind::Proof)
    }

    /// Generate and attach proofs for every proof-requiring node.
    ///
    /// Proofs run concurrently on scoped worker threads — one per node —
    /// and all must succeed. On any failure the session *stays in
    /// `Building`* and surfaces the first failure in pre-order; partial
    /// proof sets are never attached.
    pub fn prove(&mut self, prover: &dyn Prover) -> Result<(), SessionError> {
        self.ensure_state(SessionState::Building)?;

        let commitment = self.tree.commitment();
        let targets: Vec<NodeId> = self
            .tree
            .pre_order()
            .filter(|n| n.authorization_kind == AuthorizationKind::Proof)
            .map(AccountUpdateNode::id)
            .collect();

        if targets.is_empty() {
            debug!(session = %self.id, "no proof-requiring nodes; closing composition");
            self.state = SessionState::Proved;
            return Ok(());
        }

        info!(session = %self.id, proofs = targets.len(), "generating proofs");

        let tree = &self.tree;
        let results: Vec<(NodeId, Result<_, _>)> = std::thread::scope(|scope| {
            let handles: Vec<_> = targets
                .iter()
                .map(|&id| {
                    scope.spawn(move || {
                        let node = tree.node(id);
                        let ctx = ConstraintContext {
                            commitment,
                            node_digest: node.digest(),
                        };
                        (id, prover.prove(node, &ctx))
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("prover thread must not panic"))
                .collect()
        });

        // All-or-nothing: scan for the first failure before attaching
        // anything.
        for (id, result) in &results {
            if let Err(e) = result {
                warn!(session = %self.id, node = %id, error = %e, "proof generation failed");
                return Err(SessionError::ProofGenerationFailed {
                    node: *id,
                    reason: e.to_string(),
                });
            }
        }

        for (id, result) in results {
            let artifact = result.expect("failures returned above");
            self.tree
                .node_mut(id)
                .set_authorization(Authorization::Proof(artifact));
        }

        self.state = SessionState::Proved;
        Ok(())
    }

    /// Discharge every node's authorization requirement.
    ///
    /// Signature-requiring nodes are signed over the transaction
    /// commitment; proof-requiring nodes must already carry their
    /// artifact from [`prove`](Self::prove). Fails with
    /// [`SessionError::MissingAuthorization`] naming the first unmet node
    /// in pre-order.
    pub fn authorize(&mut self, signer: &dyn Signer) -> Result<(), SessionError> {
        match self.state {
            SessionState::Building | SessionState::Proved => {}
            found => {
                return Err(SessionError::InvalidState {
                    expected: SessionState::Proved,
                    found,
                })
            }
        }

        let commitment = self.tree.commitment();
        let ids: Vec<NodeId> = self.tree.pre_order().map(AccountUpdateNode::id).collect();

        for id in ids {
            let node = self.tree.node(id);
            let account = node.account().clone();
            match node.authorization_kind {
                AuthorizationKind::None => {}
                AuthorizationKind::Signature => {
                    if !node.is_authorized() {
                        let Some(signature) = signer.sign(&account.address, &commitment) else {
                            return Err(SessionError::MissingAuthorization {
                                node: id,
                                account,
                                required: AuthorizationKind::Signature,
                            });
                        };
                        self.tree
                            .node_mut(id)
                            .set_authorization(Authorization::Signature(signature));
                    }
                }
                AuthorizationKind::Proof => {
                    if !node.is_authorized() {
                        // prove() was skipped or failed; nothing to attach
                        // here — proofs are not produced during authorize.
                        return Err(SessionError::MissingAuthorization {
                            node: id,
                            account,
                            required: AuthorizationKind::Proof,
                        });
                    }
                }
            }
        }

        info!(session = %self.id, nodes = self.tree.len(), "session authorized");
        self.state = SessionState::Authorized;
        Ok(())
    }

    /// Hand the finished tree to the submission collaborator.
    ///
    /// Replays the token accounting ledger first and refuses to submit an
    /// unbalanced transaction; the collaborator re-runs both the ledger
    /// check and precondition verification against live state and returns
    /// its own verdict. Consumes the session — `Sent` is terminal.
    pub fn send(
        mut self,
        submission: &dyn SubmissionService,
    ) -> Result<SubmissionOutcome, SessionError> {
        self.ensure_state(SessionState::Authorized)?;

        let ledger = TokenAccountingLedger::accumulate(&self.tree);
        ledger.check_all()?;

        self.state = SessionState::Sent;
        let outcome = submission.apply(&self.tree, &ledger);
        match &outcome {
            SubmissionOutcome::Applied { height } => {
                info!(session = %self.id, height, "transaction applied")
            }
            SubmissionOutcome::Rejected { reason } => {
                warn!(session = %self.id, %reason, "transaction rejected")
            }
        }
        Ok(outcome)
    }
}
