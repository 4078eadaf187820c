//! Pool Gauge: stake accounting and reward distribution for one pool.
//!
//! A gauge holds users' staking tokens and a reward-per-share accumulator
//! scaled by [`PRECISION`](vegauge_types::PRECISION). How much reward a pool
//! earns over a block range is decided elsewhere and read through the
//! [`RewardSource`] trait; the gauge only splits it pro rata between stakers.

pub mod error;
pub mod gauge;
pub mod source;

pub use error::GaugeError;
pub use gauge::{Gauge, UserStake};
pub use source::{FlatRate, RewardSource};
