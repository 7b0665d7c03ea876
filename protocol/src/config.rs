//! # Protocol Configuration & Constants
//!
//! Every magic number in PRISM lives here. If you're hardcoding a constant
//! somewhere else, you're doing it wrong and you owe the team coffee.
//!
//! These values define the shape of every transaction the protocol will
//! ever produce. Changing them after launch invalidates existing
//! verification keys and signatures, so choose wisely during devnet.

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Semantic protocol version. Embedded in nothing yet, printed everywhere.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Major protocol version for compatibility checks.
pub const PROTOCOL_VERSION_MAJOR: u32 = 0;

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

/// Human-readable prefix for Bech32-encoded PRISM addresses.
/// Short enough to type, long enough to be unambiguous.
pub const ADDRESS_HRP: &str = "prism";

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// Number of application state slots every account carries.
///
/// Fixed-width on purpose: the constraint system that eventually proves
/// state updates needs a static layout, so the account model exposes a
/// fixed register file rather than a growable map.
pub const APP_STATE_SLOTS: usize = 8;

/// Balance given to each pre-funded test account on a fresh local chain.
///
/// 1,000 PRISM at 10^9 motes per PRISM. Generous enough that demo flows
/// never trip over funding, small enough that balance overflow bugs would
/// still surface in tests.
pub const TEST_ACCOUNT_FUNDING: u64 = 1_000_000_000_000;

// ---------------------------------------------------------------------------
// Trees
// ---------------------------------------------------------------------------

/// Hard ceiling on account-update tree depth.
///
/// Composition is append-only so cycles are impossible, but a runaway
/// recursive contract could still build an absurdly deep tree. Anything
/// deeper than this is rejected at append time.
pub const MAX_TREE_DEPTH: usize = 32;
