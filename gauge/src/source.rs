use crate::error::GaugeError;
use vegauge_types::{Address, BlockHeight};

/// Where a gauge learns how much reward its pool earned.
///
/// Implemented by the emission schedule. `from..to` is a half-open block
/// range; blocks outside emission produce nothing.
pub trait RewardSource {
    fn reward_between(
        &self,
        pool: &Address,
        from: BlockHeight,
        to: BlockHeight,
    ) -> Result<u128, GaugeError>;
}

/// A fixed reward per block for every pool. Used by tests and benches.
#[derive(Clone, Copy, Debug)]
pub struct FlatRate(pub u128);

impl RewardSource for FlatRate {
    fn reward_between(
        &self,
        _pool: &Address,
        from: BlockHeight,
        to: BlockHeight,
    ) -> Result<u128, GaugeError> {
        self.0
            .checked_mul(from.blocks_until(to) as u128)
            .ok_or(GaugeError::Overflow)
    }
}
