//! Fundamental types for the vegauge protocol.
//!
//! Shared by every other crate in the workspace: addresses, the two logical
//! clocks (seconds for locks, blocks for emission), lock identifiers and the
//! fixed-point arithmetic used by voting power and reward accumulators.

pub mod address;
pub mod amount;
pub mod error;
pub mod time;

pub use address::Address;
pub use amount::{apply_bps, mul_div, narrow, to_wad, BPS_DENOMINATOR, PRECISION, U256, WAD};
pub use error::TypesError;
pub use time::{BlockHeight, Timestamp};

/// Identifier of a lock in the registry. Assigned from 1 upward, never reused.
pub type LockId = u64;
