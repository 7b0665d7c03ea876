//! # Token Contract
//!
//! A custom-token contract in the PRISM model. The contract's address owns
//! the token id (`TokenId::derive(address, NATIVE)`); every token account
//! lives at `(holder address, token id)`; and every movement of the token
//! happens inside an account-update subtree rooted at one of this
//! contract's own authorized updates — that rooting is what makes mints
//! sanctioned and transfers scopable.
//!
//! ## Transfer by callback
//!
//! `send_tokens` never debits the sender itself. It *declares* what it
//! expects — sender contract, token, exact amount — and asks the broker to
//! run the sender's own `authorize_send` method. Whatever that method does
//! internally, the merged subtree must debit exactly the declared amount
//! from exactly the declared account, or the whole composition fails. The
//! token contract trusts arithmetic, not implementations.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use prism_protocol::account::permissions::AuthRequirement;
use prism_protocol::account::{AccountId, Address, Permissions, TokenId};
use prism_protocol::callback::{
    CallbackBroker, CallbackContext, CallbackDeclaration, CallbackError, ContractMethod,
    ContractRegistry,
};
use prism_protocol::precondition::engine::StateSnapshotProvider;
use prism_protocol::session::{SessionError, TransactionSession};
use prism_protocol::update::tree::{AccountUpdateTree, Layout, NodeId, TokenScope};
use prism_protocol::update::types::{
    AuthorizationKind, BalanceDelta, DeltaOrigin, SetOrKeep, VerificationKeyDigest,
};

// ---------------------------------------------------------------------------
// TokenContract
// ---------------------------------------------------------------------------

/// The issuer side of a custom token.
#[derive(Debug, Clone)]
pub struct TokenContract {
    /// The contract's base address; the token id derives from it.
    pub address: Address,
}

impl TokenContract {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    /// The token this contract owns.
    pub fn token_id(&self) -> TokenId {
        TokenId::derive(&self.address, &TokenId::NATIVE)
    }

    /// The permission profile of the deployed contract account: sends
    /// require proof, everything else a signature.
    fn contract_permissions() -> Permissions {
        Permissions {
            send: AuthRequirement::Proof,
            ..Permissions::default_signature()
        }
    }

    /// Deploy the contract: fund its account from the fee payer and set
    /// its permissions and verification key on the same update.
    ///
    /// Signed by the contract key (the account's own `set_permissions`
    /// policy is consulted at apply time).
    pub fn deploy(
        &self,
        session: &mut TransactionSession,
        verification_key: VerificationKeyDigest,
        initial_balance: u64,
    ) -> Result<NodeId, SessionError> {
        let node = session.fund_new_account(self.address.clone(), initial_balance)?;
        let tree = session.tree_mut()?;
        let update = tree.node_mut(node);
        update.authorization_kind = AuthorizationKind::Signature;
        update.update.permissions = SetOrKeep::Set(Self::contract_permissions());
        update.update.verification_key = SetOrKeep::Set(verification_key);
        debug!(contract = %self.address, "token contract deployment composed");
        Ok(node)
    }

    /// Open the contract's own update in this session: the node every
    /// token-scoped child hangs off.
    fn self_update(&self, session: &mut TransactionSession) -> Result<NodeId, SessionError> {
        session.add_update(
            AccountId::native(self.address.clone()),
            AuthorizationKind::Proof,
        )
    }

    /// Deploy a holder's token account: a child update under the custom
    /// token carrying the holder contract's permissions and verification
    /// key, signed by the deployer.
    pub fn token_deploy(
        &self,
        session: &mut TransactionSession,
        deployer: Address,
        verification_key: VerificationKeyDigest,
    ) -> Result<NodeId, SessionError> {
        let token = self.token_id();
        let parent = self.self_update(session)?;
        let tree = session.tree_mut()?;
        let child = tree.create_child(parent, deployer, TokenScope::Exact(token))?;
        let update = tree.node_mut(child);
        update.authorization_kind = AuthorizationKind::Signature;
        update.update.permissions = SetOrKeep::Set(Self::contract_permissions());
        update.update.verification_key = SetOrKeep::Set(verification_key);
        debug!(token = %token, node = %child, "token account deployment composed");
        Ok(child)
    }

    /// Mint `amount` units to `receiver`.
    ///
    /// The credit is tagged as a mint and sits under the contract's own
    /// proof-authorized update — both halves of what makes it sanctioned.
    pub fn mint(
        &self,
        session: &mut TransactionSession,
        receiver: Address,
        amount: u64,
    ) -> Result<NodeId, SessionError> {
        let token = self.token_id();
        let parent = self.self_update(session)?;
        let tree = session.tree_mut()?;
        let child = tree.create_child(parent, receiver, TokenScope::Exact(token))?;
        let update = tree.node_mut(child);
        update.balance_delta = BalanceDelta::credit(amount);
        update.delta_origin = DeltaOrigin::Mint;
        debug!(token = %token, amount, "mint composed");
        Ok(child)
    }

    /// Burn `amount` units held by `holder`.
    ///
    /// The debit is tagged as a burn and carries proof authorization —
    /// holder token accounts gate sends behind proofs, and removing
    /// someone's tokens is not a unilateral issuer power.
    pub fn burn(
        &self,
        session: &mut TransactionSession,
        holder: Address,
        amount: u64,
    ) -> Result<NodeId, SessionError> {
        let token = self.token_id();
        let parent = self.self_update(session)?;
        let tree = session.tree_mut()?;
        let child = tree.create_child(parent, holder, TokenScope::Exact(token))?;
        let update = tree.node_mut(child);
        update.balance_delta = BalanceDelta::debit(amount);
        update.delta_origin = DeltaOrigin::Burn;
        update.authorization_kind = AuthorizationKind::Proof;
        debug!(token = %token, amount, "burn composed");
        Ok(child)
    }

    /// Move `amount` units from `sender` to `receiver`, with the debit
    /// authorized by the sender's own registered `authorize_send` method.
    pub fn send_tokens(
        &self,
        session: &mut TransactionSession,
        registry: &ContractRegistry,
        snapshot: &dyn StateSnapshotProvider,
        sender: Address,
        receiver: Address,
        amount: u64,
    ) -> Result<NodeId, SessionError> {
        let token = self.token_id();
        let parent = self.self_update(session)?;

        // The declaration is the whole trust boundary: contract, token,
        // shape, and the exact amount the callback must move out.
        let declaration = CallbackDeclaration {
            contract: sender,
            token_id: token,
            method: HolderContract::AUTHORIZE_SEND.to_string(),
            expected_amount: amount,
            layout: Layout::AnyChildren,
        };
        let args = serde_json::to_vec(&AuthorizeSendArgs { amount })
            .expect("authorize_send args are trivially serializable");

        let broker = CallbackBroker::new(registry);
        let sender_update =
            session.invoke_callback(&broker, parent, &declaration, &args, snapshot)?;
        debug!(node = %sender_update, amount, "sender callback merged");

        let tree = session.tree_mut()?;
        let receiver_update = tree.create_child(parent, receiver, TokenScope::Exact(token))?;
        tree.node_mut(receiver_update).balance_delta = BalanceDelta::credit(amount);
        Ok(receiver_update)
    }
}

// ---------------------------------------------------------------------------
// HolderContract
// ---------------------------------------------------------------------------

/// Arguments for [`HolderContract::AUTHORIZE_SEND`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizeSendArgs {
    /// Units the holder agrees to send.
    pub amount: u64,
}

/// A token holder's own contract: the callee side of a transfer.
///
/// Its single entry point debits the holder's token account under proof
/// authorization — equivalent to the sender-side "I agree to pay"
/// circuit. Registered explicitly; nothing is callable by accident.
#[derive(Debug, Clone)]
pub struct HolderContract {
    pub address: Address,
    pub token_id: TokenId,
}

impl HolderContract {
    /// The method name `send_tokens` invokes through the broker.
    pub const AUTHORIZE_SEND: &'static str = "authorize_send";

    pub fn new(address: Address, token_id: TokenId) -> Self {
        Self { address, token_id }
    }

    /// Register this holder's entry points.
    pub fn register(&self, registry: &mut ContractRegistry) {
        registry.register(
            self.address.clone(),
            Self::AUTHORIZE_SEND,
            Arc::new(AuthorizeSend {
                contract: self.address.clone(),
                token_id: self.token_id,
            }),
        );
    }
}

/// The `authorize_send` method body.
struct AuthorizeSend {
    contract: Address,
    token_id: TokenId,
}

impl ContractMethod for AuthorizeSend {
    fn call(&self, ctx: &CallbackContext<'_>) -> Result<AccountUpdateTree, CallbackError> {
        let args: AuthorizeSendArgs =
            serde_json::from_slice(ctx.args).map_err(|e| CallbackError::MalformedArguments {
                method: HolderContract::AUTHORIZE_SEND.to_string(),
                reason: e.to_string(),
            })?;

        let mut sub = AccountUpdateTree::new();
        let root = sub.add_root(AccountId::new(self.contract.clone(), self.token_id));
        let update = sub.node_mut(root);
        update.balance_delta = BalanceDelta::debit(args.amount);
        update.authorization_kind = AuthorizationKind::Proof;
        Ok(sub)
    }
}
