//! Block-indexed emission schedule.

use crate::error::EmissionError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vegauge_gauge::{GaugeError, RewardSource};
use vegauge_types::{apply_bps, mul_div, Address, BlockHeight, BPS_DENOMINATOR};

/// A pool's share of the two emission streams.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub weight: u128,
    pub boost: u128,
}

impl Allocation {
    fn is_empty(&self) -> bool {
        self.weight == 0 && self.boost == 0
    }
}

/// Parameters in force over the half-open block range `[start, end)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionSegment {
    pub start: BlockHeight,
    /// `None` for the open segment.
    pub end: Option<BlockHeight>,
    pub rate: u128,
    pub base_share_bps: u32,
    allocations: BTreeMap<Address, Allocation>,
    total_weight: u128,
    total_boost: u128,
}

impl EmissionSegment {
    pub fn allocation(&self, pool: &Address) -> Allocation {
        self.allocations.get(pool).copied().unwrap_or_default()
    }

    pub fn total_weight(&self) -> u128 {
        self.total_weight
    }

    pub fn total_boost(&self) -> u128 {
        self.total_boost
    }

    /// Reward `pool` earns over `blocks` blocks of this segment.
    pub fn pool_reward(&self, pool: &Address, blocks: u64) -> Option<u128> {
        let alloc = match self.allocations.get(pool) {
            Some(a) if blocks > 0 => *a,
            _ => return Some(0),
        };
        let emitted = self.rate.checked_mul(blocks as u128)?;
        let base_total = apply_bps(emitted, self.base_share_bps)?;
        let boost_total = emitted - base_total;

        let base = if self.total_weight > 0 {
            mul_div(base_total, alloc.weight, self.total_weight)?
        } else {
            0
        };
        let boost = if self.total_boost > 0 {
            mul_div(boost_total, alloc.boost, self.total_boost)?
        } else {
            0
        };
        base.checked_add(boost)
    }

    fn set_allocation(&mut self, pool: Address, alloc: Allocation) -> Result<(), EmissionError> {
        let old = self.allocation(&pool);
        self.total_weight = (self.total_weight - old.weight)
            .checked_add(alloc.weight)
            .ok_or(EmissionError::Overflow)?;
        self.total_boost = (self.total_boost - old.boost)
            .checked_add(alloc.boost)
            .ok_or(EmissionError::Overflow)?;
        if alloc.is_empty() {
            self.allocations.remove(&pool);
        } else {
            self.allocations.insert(pool, alloc);
        }
        Ok(())
    }
}

/// Ordered emission segments. Closed segments are kept until every gauge
/// has settled past them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmissionSchedule {
    /// No block before this one emits anything.
    start_block: BlockHeight,
    closed: Vec<EmissionSegment>,
    current: EmissionSegment,
}

impl EmissionSchedule {
    pub fn new(
        start_block: BlockHeight,
        rate: u128,
        base_share_bps: u32,
        at: BlockHeight,
    ) -> Result<Self, EmissionError> {
        if base_share_bps > BPS_DENOMINATOR {
            return Err(EmissionError::InvalidShare(base_share_bps));
        }
        Ok(Self {
            start_block,
            closed: Vec::new(),
            current: EmissionSegment {
                start: at,
                end: None,
                rate,
                base_share_bps,
                allocations: BTreeMap::new(),
                total_weight: 0,
                total_boost: 0,
            },
        })
    }

    pub fn start_block(&self) -> BlockHeight {
        self.start_block
    }

    /// The segment in force now.
    pub fn current(&self) -> &EmissionSegment {
        &self.current
    }

    pub fn segments(&self) -> impl Iterator<Item = &EmissionSegment> {
        self.closed.iter().chain(std::iter::once(&self.current))
    }

    pub fn segment_count(&self) -> usize {
        self.closed.len() + 1
    }

    pub fn set_rate(&mut self, rate: u128, at: BlockHeight) -> Result<(), EmissionError> {
        self.apply(at, |seg| {
            seg.rate = rate;
            Ok(())
        })
    }

    pub fn set_base_share(&mut self, bps: u32, at: BlockHeight) -> Result<(), EmissionError> {
        if bps > BPS_DENOMINATOR {
            return Err(EmissionError::InvalidShare(bps));
        }
        self.apply(at, |seg| {
            seg.base_share_bps = bps;
            Ok(())
        })
    }

    pub fn set_weight(&mut self, pool: Address, weight: u128, at: BlockHeight) -> Result<(), EmissionError> {
        self.apply(at, |seg| {
            let alloc = Allocation {
                weight,
                ..seg.allocation(&pool)
            };
            seg.set_allocation(pool, alloc)
        })
    }

    /// Replace the boost weight of every pool named in `boosts`.
    pub fn set_boosts(
        &mut self,
        boosts: &BTreeMap<Address, u128>,
        at: BlockHeight,
    ) -> Result<(), EmissionError> {
        self.apply(at, |seg| {
            for (pool, boost) in boosts {
                let alloc = Allocation {
                    boost: *boost,
                    ..seg.allocation(pool)
                };
                seg.set_allocation(*pool, alloc)?;
            }
            Ok(())
        })
    }

    /// Zero both weights of `pool` from `at` on.
    pub fn remove_pool(&mut self, pool: &Address, at: BlockHeight) -> Result<(), EmissionError> {
        self.apply(at, |seg| seg.set_allocation(*pool, Allocation::default()))
    }

    /// Reward `pool` earns over `[from, to)`.
    pub fn reward_between(&self, pool: &Address, from: BlockHeight, to: BlockHeight) -> Option<u128> {
        let from = from.max(self.start_block);
        if from >= to {
            return Some(0);
        }
        // Closed segments ending at or before `from` cannot overlap.
        let first = self
            .closed
            .partition_point(|s| s.end.map_or(false, |end| end <= from));

        let mut total: u128 = 0;
        for seg in self.closed[first..]
            .iter()
            .chain(std::iter::once(&self.current))
        {
            if seg.start >= to {
                break;
            }
            let lo = seg.start.max(from);
            let hi = seg.end.map_or(to, |end| end.min(to));
            if lo >= hi {
                continue;
            }
            let reward = seg.pool_reward(pool, lo.blocks_until(hi))?;
            total = total.checked_add(reward)?;
        }
        Some(total)
    }

    /// Drop closed segments that end at or before `settled`.
    ///
    /// Callers pass the lowest `last_settled` of every gauge.
    pub fn prune(&mut self, settled: BlockHeight) -> usize {
        let cut = self
            .closed
            .partition_point(|s| s.end.map_or(false, |end| end <= settled));
        self.closed.drain(..cut);
        cut
    }

    /// Apply `change` to a copy of the current parameters, then open a new
    /// segment at `at` (or rewrite the current one if it starts at `at`).
    fn apply<F>(&mut self, at: BlockHeight, change: F) -> Result<(), EmissionError>
    where
        F: FnOnce(&mut EmissionSegment) -> Result<(), EmissionError>,
    {
        let mut next = self.current.clone();
        change(&mut next)?;
        if at > self.current.start {
            next.start = at;
            let mut prev = std::mem::replace(&mut self.current, next);
            prev.end = Some(at);
            self.closed.push(prev);
        } else {
            self.current = next;
        }
        Ok(())
    }
}

impl RewardSource for EmissionSchedule {
    fn reward_between(
        &self,
        pool: &Address,
        from: BlockHeight,
        to: BlockHeight,
    ) -> Result<u128, GaugeError> {
        EmissionSchedule::reward_between(self, pool, from, to).ok_or(GaugeError::Overflow)
    }
}
