//! # Chain State & Local Simulation
//!
//! The protocol core never talks to a live network; it reads state through
//! [`StateSnapshotProvider`](crate::precondition::StateSnapshotProvider)
//! and submits through
//! [`SubmissionService`](crate::session::SubmissionService). This module
//! provides the in-memory implementation of both: the account records and
//! network state ([`state`]) and a simulated chain ([`local`]) that demos
//! and tests run against.
//!
//! The simulation is deliberately minimal. Applying a transaction does not
//! advance the block height — height moves only when a test or demo calls
//! [`LocalChain::set_blockchain_length`], which is precisely what makes
//! precondition races reproducible on demand.

pub mod local;
pub mod state;

pub use local::LocalChain;
pub use state::{AccountRecord, ChainState, NetworkState};
