//! # Token Accounting
//!
//! The economic safety invariant of the protocol: per token, the balance
//! deltas of one transaction must net to exactly zero — value moves, it is
//! never created or destroyed — except through the token's own sanctioned
//! mint/burn path.
//!
//! The ledger is ephemeral: rebuilt by a full traversal of one tree,
//! checked, handed to the submission collaborator alongside the tree, and
//! thrown away. Nothing here persists.
//!
//! ## Sanctioned mint and burn
//!
//! A delta tagged [`DeltaOrigin::Mint`] or [`DeltaOrigin::Burn`] is
//! *sanctioned* when all of the following hold:
//!
//! 1. the tree registered an owner for the token (the token was derived
//!    from that owner's `(address, token)` pair during composition),
//! 2. the tagged node sits under an update of that owner account carrying
//!    a real authorization requirement (not `None`), and
//! 3. the sign matches the tag — mints credit, burns debit.
//!
//! Sanctioned entries are excluded from the zero-sum residual; that is
//! the entire privilege the tag confers. An *unsanctioned* tag gets no
//! exclusion and is accumulated like a regular transfer leg, so a forged
//! mint either shows up as a nonzero residual (and the transaction fails
//! with [`AccountingError::UnbalancedToken`]) or nets out against other
//! legs — in which case it moved value but created none, which is exactly
//! a transfer.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::trace;

use crate::account::{AccountId, TokenId};
use crate::update::node::AccountUpdateNode;
use crate::update::tree::AccountUpdateTree;
use crate::update::types::DeltaOrigin;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from the token accounting check.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountingError {
    /// A token's deltas do not net to zero outside the sanctioned
    /// mint/burn path.
    #[error("unbalanced token {token_id}: residual {residual}")]
    UnbalancedToken { token_id: TokenId, residual: i128 },
}

// ---------------------------------------------------------------------------
// TokenAccountingLedger
// ---------------------------------------------------------------------------

/// Per-transaction accounting state, built by replaying one tree.
///
/// Holds the per-`(address, token)` accumulated deltas (the snapshot the
/// submission collaborator receives) and the per-token residuals the
/// zero-sum check runs against.
#[derive(Debug, Clone, Default)]
pub struct TokenAccountingLedger {
    /// Accumulated delta per account, over every node touching it.
    totals: BTreeMap<AccountId, i128>,
    /// Per-token sum of deltas *not* recognized as sanctioned mint/burn.
    residuals: BTreeMap<TokenId, i128>,
    /// Every token that appears anywhere in the tree.
    tokens: BTreeSet<TokenId>,
}

impl TokenAccountingLedger {
    /// Walk every node of `tree` and accumulate deltas grouped by
    /// `(address, token)`.
    pub fn accumulate(tree: &AccountUpdateTree) -> Self {
        let mut ledger = Self::default();
        for node in tree.pre_order() {
            let account = node.account().clone();
            let token = account.token_id;
            let delta = node.balance_delta.value();

            ledger.tokens.insert(token);
            let total = ledger.totals.entry(account).or_insert(0);
            *total = total
                .checked_add(delta)
                .expect("i128 accumulator cannot overflow on u64-sized deltas");

            if !Self::is_sanctioned(tree, node) {
                let residual = ledger.residuals.entry(token).or_insert(0);
                *residual = residual
                    .checked_add(delta)
                    .expect("i128 accumulator cannot overflow on u64-sized deltas");
            } else {
                trace!(node = %node.id(), %token, delta, origin = %node.delta_origin,
                       "sanctioned supply change excluded from residual");
            }
        }
        ledger
    }

    /// Whether `node`'s delta is a sanctioned supply change.
    fn is_sanctioned(tree: &AccountUpdateTree, node: &AccountUpdateNode) -> bool {
        let sign_matches = match node.delta_origin {
            DeltaOrigin::Regular => return false,
            DeltaOrigin::Mint => !node.balance_delta.is_negative(),
            DeltaOrigin::Burn => !node.balance_delta.is_positive(),
        };
        if !sign_matches {
            return false;
        }

        let Some(owner) = tree.token_owner(&node.account().token_id) else {
            // Token never derived in this tree — nobody here is its
            // minting authority.
            return false;
        };

        // The tagged node must sit under an authorized update of the
        // owning account.
        let mut current = node.parent();
        while let Some(id) = current {
            let ancestor = tree.node(id);
            if ancestor.account() == owner
                && ancestor.authorization_kind != crate::update::types::AuthorizationKind::None
            {
                return true;
            }
            current = ancestor.parent();
        }
        false
    }

    /// The accumulated delta for one account. Zero for accounts the tree
    /// never touched.
    pub fn delta_of(&self, account: &AccountId) -> i128 {
        self.totals.get(account).copied().unwrap_or(0)
    }

    /// Iterate the accumulated `(account, delta)` entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&AccountId, i128)> {
        self.totals.iter().map(|(k, v)| (k, *v))
    }

    /// Every token appearing in the tree.
    pub fn tokens(&self) -> impl Iterator<Item = &TokenId> {
        self.tokens.iter()
    }

    /// Enforce the zero-sum invariant for one token.
    ///
    /// The residual — all deltas for the token except sanctioned
    /// mint/burn entries — must be exactly zero.
    pub fn check_balanced(&self, token_id: TokenId) -> Result<(), AccountingError> {
        let residual = self.residuals.get(&token_id).copied().unwrap_or(0);
        if residual != 0 {
            return Err(AccountingError::UnbalancedToken { token_id, residual });
        }
        Ok(())
    }

    /// Enforce the zero-sum invariant for every token in the tree.
    /// Fail-fast on the first unbalanced token in id order.
    pub fn check_all(&self) -> Result<(), AccountingError> {
        for token in &self.tokens {
            self.check_balanced(*token)?;
        }
        Ok(())
    }
}
