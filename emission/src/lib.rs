//! Emission Controller: how much reward each pool earns, block by block.
//!
//! Emission is split into two streams per block:
//!
//! - the *base* stream (`base_share_bps` of the rate, 30% by default) is
//!   shared between pools by allocation weight;
//! - the *boost* stream (the rest) is shared by boost weight, which the
//!   weight controller derives from lock votes.
//!
//! Every parameter change opens a new [`EmissionSegment`] at the current
//! block, so settling a gauge late yields exactly the same reward as
//! settling it eagerly before the change.

pub mod controller;
pub mod error;
pub mod schedule;

pub use controller::{EmissionController, EmissionParams, PoolEntry};
pub use error::EmissionError;
pub use schedule::{Allocation, EmissionSchedule, EmissionSegment};
