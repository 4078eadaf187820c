//! A single vote-escrow position.

use serde::{Deserialize, Serialize};
use vegauge_types::{mul_div, Address, LockId, Timestamp};

/// A time-boxed custody of governance tokens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    pub id: LockId,
    pub owner: Address,
    /// Locked amount, wei-scale.
    pub amount: u128,
    pub start: Timestamp,
    /// Always strictly after `start`.
    pub end: Timestamp,
    pub withdrawn: bool,
}

impl Lock {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.end
    }

    /// Voting power at `at`, decaying linearly against `max_lock_secs`.
    ///
    /// Queries before `start` are clamped to `start`. Returns `None` only on
    /// arithmetic overflow or a zero `max_lock_secs`.
    pub fn voting_power_checked(&self, at: Timestamp, max_lock_secs: u64) -> Option<u128> {
        if self.withdrawn || at >= self.end {
            return Some(0);
        }
        let from = at.max(self.start);
        let remaining = from.secs_until(self.end);
        mul_div(self.amount, remaining as u128, max_lock_secs as u128)
    }

    /// Voting power, returning 0 on overflow.
    pub fn voting_power(&self, at: Timestamp, max_lock_secs: u64) -> u128 {
        self.voting_power_checked(at, max_lock_secs).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vegauge_types::WAD;

    const MAX: u64 = 4 * 365 * 86_400;

    fn lock(amount: u128, start: u64, end: u64) -> Lock {
        Lock {
            id: 1,
            owner: Address::from_low_u64(1),
            amount,
            start: Timestamp::new(start),
            end: Timestamp::new(end),
            withdrawn: false,
        }
    }

    #[test]
    fn full_duration_lock_starts_at_full_amount() {
        let l = lock(1_000 * WAD, 0, MAX);
        assert_eq!(l.voting_power(Timestamp::new(0), MAX), 1_000 * WAD);
    }

    #[test]
    fn power_halves_at_midpoint() {
        let l = lock(1_000 * WAD, 0, MAX);
        assert_eq!(l.voting_power(Timestamp::new(MAX / 2), MAX), 500 * WAD);
    }

    #[test]
    fn shorter_lock_scales_by_duration() {
        let l = lock(1_000 * WAD, 0, MAX / 4);
        assert_eq!(l.voting_power(Timestamp::new(0), MAX), 250 * WAD);
    }

    #[test]
    fn power_is_zero_at_and_after_end() {
        let l = lock(1_000 * WAD, 100, 200);
        assert_eq!(l.voting_power(Timestamp::new(200), MAX), 0);
        assert_eq!(l.voting_power(Timestamp::new(10_000), MAX), 0);
    }

    #[test]
    fn query_before_start_is_clamped() {
        let l = lock(MAX as u128, 100, 200);
        assert_eq!(
            l.voting_power(Timestamp::new(0), MAX),
            l.voting_power(Timestamp::new(100), MAX)
        );
    }

    #[test]
    fn withdrawn_lock_has_no_power() {
        let mut l = lock(1_000 * WAD, 0, MAX);
        l.withdrawn = true;
        assert_eq!(l.voting_power(Timestamp::new(0), MAX), 0);
    }

    #[test]
    fn zero_max_lock_is_checked() {
        let l = lock(1, 0, 10);
        assert_eq!(l.voting_power_checked(Timestamp::new(0), 0), None);
        assert_eq!(l.voting_power(Timestamp::new(0), 0), 0);
    }
}
