//! # PRISM Protocol Demo Contracts
//!
//! Contract-side consumers of the PRISM transaction layer. These are the
//! working references for how a contract composes account updates:
//!
//! - **Token** — a custom-token contract: deployment, issuer-gated
//!   minting and burning, and callback-mediated transfers where the
//!   sender's own contract authorizes the debit without the token
//!   contract seeing its logic.
//! - **Lockup** — a contract gated on a blockchain-length precondition:
//!   the canonical "pay out only after height X" pattern, made sound
//!   against concurrent block production by precondition capture.
//!
//! ## Design Principles
//!
//! 1. Contracts never mutate chain state directly — they append account
//!    updates to a session and let the submission pipeline do the rest.
//! 2. Authorization kinds come from permission policies, not from
//!    whichever caller happens to build the transaction.
//! 3. Every monetary path is exercised by an integration test against the
//!    local chain.

pub mod lockup;
pub mod token;

pub use lockup::LockupContract;
pub use token::{HolderContract, TokenContract};
