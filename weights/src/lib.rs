//! Weight Controller: turns lock voting power into pool boost weights.
//!
//! Lock owners spread up to 100% of a lock's power across registered pools.
//! Tallies accumulate here and are pushed to the emission controller at most
//! once per `duration` blocks.

pub mod controller;
pub mod error;

pub use controller::{LockVotes, VoteSlice, WeightController};
pub use error::WeightError;
