//! Pool list, vote book and checkpoint cadence.

use crate::error::WeightError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vegauge_access::Operator;
use vegauge_emission::EmissionController;
use vegauge_locker::{LockError, LockRegistry};
use vegauge_types::{mul_div, Address, BlockHeight, LockId, Timestamp, BPS_DENOMINATOR};

/// One lock's vote for one pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteSlice {
    pub bps: u32,
    /// `power × bps / 10000` at the last snapshot.
    pub weight: u128,
    pub voted_at: BlockHeight,
}

/// Every vote cast by one lock.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockVotes {
    pub slices: BTreeMap<Address, VoteSlice>,
    pub used_bps: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WeightController {
    address: Address,
    operator: Operator,
    /// Minimum blocks between two checkpoints.
    duration: u64,
    pools: Vec<Address>,
    index: BTreeMap<Address, usize>,
    votes: BTreeMap<LockId, LockVotes>,
    tallies: BTreeMap<Address, u128>,
    last_checkpoint: Option<BlockHeight>,
}

impl WeightController {
    pub fn new(address: Address, operator: Operator, duration: u64) -> Result<Self, WeightError> {
        if duration == 0 {
            return Err(WeightError::InvalidDuration);
        }
        Ok(Self {
            address,
            operator,
            duration,
            pools: Vec::new(),
            index: BTreeMap::new(),
            votes: BTreeMap::new(),
            tallies: BTreeMap::new(),
            last_checkpoint: None,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn set_operator(&mut self, operator: Operator) {
        self.operator = operator;
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn set_duration(&mut self, caller: &Address, blocks: u64) -> Result<(), WeightError> {
        self.operator.ensure(caller)?;
        if blocks == 0 {
            return Err(WeightError::InvalidDuration);
        }
        tracing::info!(previous = self.duration, blocks, "checkpoint duration changed");
        self.duration = blocks;
        Ok(())
    }

    /// Append a pool. Returns its index.
    pub fn add_pool(&mut self, caller: &Address, token: Address) -> Result<usize, WeightError> {
        self.operator.ensure(caller)?;
        if self.index.contains_key(&token) {
            return Err(WeightError::PoolAlreadyExists(token));
        }
        let idx = self.pools.len();
        self.pools.push(token);
        self.index.insert(token, idx);
        tracing::info!(%token, idx, "weight pool added");
        Ok(idx)
    }

    pub fn get_pool(&self, index: usize) -> Result<Address, WeightError> {
        self.pools
            .get(index)
            .copied()
            .ok_or(WeightError::IndexOutOfRange {
                index,
                len: self.pools.len(),
            })
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    pub fn tally(&self, pool: &Address) -> u128 {
        self.tallies.get(pool).copied().unwrap_or(0)
    }

    pub fn tallies(&self) -> &BTreeMap<Address, u128> {
        &self.tallies
    }

    pub fn votes_of(&self, lock_id: LockId) -> Option<&LockVotes> {
        self.votes.get(&lock_id)
    }

    pub fn last_checkpoint(&self) -> Option<BlockHeight> {
        self.last_checkpoint
    }

    /// First block at which `checkpoint` will apply.
    pub fn next_checkpoint(&self) -> BlockHeight {
        match self.last_checkpoint {
            Some(last) => last.checked_add(self.duration).unwrap_or(BlockHeight::new(u64::MAX)),
            None => BlockHeight::GENESIS,
        }
    }

    /// Direct `bps` of lock `lock_id`'s power to `pool`, replacing any
    /// earlier vote of the same lock for that pool. Returns the vote weight.
    #[allow(clippy::too_many_arguments)]
    pub fn vote(
        &mut self,
        caller: &Address,
        lock_id: LockId,
        pool: &Address,
        bps: u32,
        now_block: BlockHeight,
        now_time: Timestamp,
        locker: &LockRegistry,
    ) -> Result<u128, WeightError> {
        if !self.index.contains_key(pool) {
            return Err(WeightError::PoolNotFound(*pool));
        }
        if bps == 0 || bps > BPS_DENOMINATOR {
            return Err(WeightError::InvalidBps(bps));
        }
        self.ensure_owner(caller, lock_id, locker)?;
        let power = locker.boost_power(&self.address, lock_id, now_time)?;
        if power == 0 {
            return Err(WeightError::NoVotingPower(lock_id));
        }

        let mut book = self.votes.get(&lock_id).cloned().unwrap_or_default();
        let old = book.slices.get(pool).copied();
        let released = old.map_or(0, |s| s.bps);
        let requested = book.used_bps.saturating_sub(released) + bps;
        if requested > BPS_DENOMINATOR {
            return Err(WeightError::WeightCapExceeded { requested });
        }
        let weight = mul_div(power, bps as u128, BPS_DENOMINATOR as u128).ok_or(WeightError::Overflow)?;
        let tally = self
            .tally(pool)
            .checked_sub(old.map_or(0, |s| s.weight))
            .and_then(|t| t.checked_add(weight))
            .ok_or(WeightError::Overflow)?;

        book.used_bps = requested;
        book.slices.insert(
            *pool,
            VoteSlice {
                bps,
                weight,
                voted_at: now_block,
            },
        );
        self.votes.insert(lock_id, book);
        self.set_tally(*pool, tally);
        tracing::info!(lock_id, %pool, bps, weight, "vote cast");
        Ok(weight)
    }

    /// Withdraw every vote of `lock_id`. Returns how many were dropped.
    pub fn reset(&mut self, caller: &Address, lock_id: LockId, locker: &LockRegistry) -> Result<usize, WeightError> {
        self.ensure_owner(caller, lock_id, locker)?;
        let dropped = self.release(lock_id);
        tracing::info!(lock_id, dropped, "votes reset");
        Ok(dropped)
    }

    /// Drop `lock_id`'s votes without an ownership check.
    ///
    /// The host calls this in the same transaction that withdraws the lock.
    pub fn release(&mut self, lock_id: LockId) -> usize {
        let Some(book) = self.votes.remove(&lock_id) else {
            return 0;
        };
        for (pool, slice) in &book.slices {
            let tally = self.tally(pool).saturating_sub(slice.weight);
            self.set_tally(*pool, tally);
        }
        tracing::debug!(lock_id, dropped = book.slices.len(), "votes released");
        book.slices.len()
    }

    /// Release the votes of every lock that is gone, withdrawn or expired
    /// at `now_time`. Returns how many locks were released.
    pub fn release_expired(&mut self, now_time: Timestamp, locker: &LockRegistry) -> usize {
        let stale: Vec<LockId> = self
            .votes
            .keys()
            .copied()
            .filter(|id| {
                locker
                    .lock(*id)
                    .map_or(true, |l| l.withdrawn || l.is_expired(now_time))
            })
            .collect();
        for id in &stale {
            self.release(*id);
        }
        stale.len()
    }

    /// Re-snapshot `lock_id`'s votes with its current decayed power.
    ///
    /// Anyone may call this. Returns the lock's new total vote weight.
    pub fn poke(&mut self, lock_id: LockId, now_time: Timestamp, locker: &LockRegistry) -> Result<u128, WeightError> {
        let Some(mut updated) = self.votes.get(&lock_id).cloned() else {
            return Ok(0);
        };
        let power = locker.boost_power(&self.address, lock_id, now_time)?;

        let mut tallies = self.tallies.clone();
        let mut total: u128 = 0;
        for (pool, slice) in updated.slices.iter_mut() {
            let weight = mul_div(power, slice.bps as u128, BPS_DENOMINATOR as u128).ok_or(WeightError::Overflow)?;
            let t = tallies.entry(*pool).or_insert(0);
            *t = t
                .checked_sub(slice.weight)
                .and_then(|v| v.checked_add(weight))
                .ok_or(WeightError::Overflow)?;
            slice.weight = weight;
            total = total.checked_add(weight).ok_or(WeightError::Overflow)?;
        }
        tallies.retain(|_, t| *t > 0);
        self.tallies = tallies;
        self.votes.insert(lock_id, updated);
        tracing::debug!(lock_id, power, total, "votes poked");
        Ok(total)
    }

    /// Push tallies to `emission` as boost weights if `duration` blocks have
    /// passed since the last checkpoint. Returns whether it applied.
    ///
    /// Votes of locks that expired by `now_time` are released first, so
    /// only live locks reach the boost weights.
    pub fn checkpoint(
        &mut self,
        now: BlockHeight,
        now_time: Timestamp,
        locker: &LockRegistry,
        emission: &mut EmissionController,
    ) -> Result<bool, WeightError> {
        if now < self.next_checkpoint() {
            return Ok(false);
        }
        let released = self.release_expired(now_time, locker);
        let boosted = emission.set_boost_weights(&self.address, &self.tallies, now)?;
        self.last_checkpoint = Some(now);
        tracing::info!(at = %now, boosted, released, "weights checkpointed");
        Ok(true)
    }

    fn ensure_owner(&self, caller: &Address, lock_id: LockId, locker: &LockRegistry) -> Result<(), WeightError> {
        let lock = locker.lock(lock_id).ok_or(LockError::LockNotFound(lock_id))?;
        if lock.owner != *caller {
            return Err(WeightError::NotOwner {
                id: lock_id,
                caller: *caller,
            });
        }
        Ok(())
    }

    fn set_tally(&mut self, pool: Address, value: u128) {
        if value == 0 {
            self.tallies.remove(&pool);
        } else {
            self.tallies.insert(pool, value);
        }
    }
}
