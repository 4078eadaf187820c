//! The emission controller: pool registry, gauges and emission parameters.

use crate::error::EmissionError;
use crate::schedule::{Allocation, EmissionSchedule};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vegauge_access::{AccessGate, Operator};
use vegauge_gauge::Gauge;
use vegauge_token::{RewardMinter, TokenLedger};
use vegauge_types::{Address, BlockHeight};

/// Closed segments allowed to pile up before a parameter change forces
/// every gauge to settle.
pub const MAX_UNSETTLED_SEGMENTS: usize = 64;

/// Construction parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmissionParams {
    /// Raw units emitted per block.
    pub token_per_block: u128,
    pub start_block: BlockHeight,
    /// Length of one emission period in blocks.
    pub mint_duration: u64,
    /// Share of each block's emission split by allocation weight.
    pub base_share_bps: u32,
}

/// A registered pool and its gauge.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoolEntry {
    pub gauge: Gauge,
    /// Cleared by `remove_pool`. Inactive pools accept no deposits.
    pub active: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmissionController {
    address: Address,
    operator: Operator,
    controllers: AccessGate,
    mint_duration: u64,
    schedule: EmissionSchedule,
    /// Staking tokens in creation order.
    order: Vec<Address>,
    pools: BTreeMap<Address, PoolEntry>,
}

impl EmissionController {
    pub fn new(
        address: Address,
        operator: Operator,
        params: &EmissionParams,
        now: BlockHeight,
    ) -> Result<Self, EmissionError> {
        let schedule = EmissionSchedule::new(
            params.start_block,
            params.token_per_block,
            params.base_share_bps,
            now,
        )?;
        Ok(Self {
            address,
            operator,
            controllers: AccessGate::new(),
            mint_duration: params.mint_duration,
            schedule,
            order: Vec::new(),
            pools: BTreeMap::new(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn set_operator(&mut self, operator: Operator) {
        self.operator = operator;
    }

    pub fn schedule(&self) -> &EmissionSchedule {
        &self.schedule
    }

    pub fn token_per_block(&self) -> u128 {
        self.schedule.current().rate
    }

    pub fn base_share_bps(&self) -> u32 {
        self.schedule.current().base_share_bps
    }

    pub fn mint_duration(&self) -> u64 {
        self.mint_duration
    }

    pub fn start_block(&self) -> BlockHeight {
        self.schedule.start_block()
    }

    pub fn pool_length(&self) -> usize {
        self.order.len()
    }

    /// Staking tokens in creation order.
    pub fn pools(&self) -> &[Address] {
        &self.order
    }

    pub fn gauge_of(&self, token: &Address) -> Option<Address> {
        self.pools.get(token).map(|p| p.gauge.address())
    }

    pub fn gauge(&self, token: &Address) -> Option<&Gauge> {
        self.pools.get(token).map(|p| &p.gauge)
    }

    pub fn is_active(&self, token: &Address) -> bool {
        self.pools.get(token).map_or(false, |p| p.active)
    }

    /// Current weight and boost of `token`'s pool.
    pub fn allocation(&self, token: &Address) -> Allocation {
        self.schedule.current().allocation(token)
    }

    pub fn total_weight(&self) -> u128 {
        self.schedule.current().total_weight()
    }

    pub fn total_boost(&self) -> u128 {
        self.schedule.current().total_boost()
    }

    pub fn is_controller(&self, addr: &Address) -> bool {
        self.controllers.is_authorized(addr)
    }

    pub fn add_controller(&mut self, caller: &Address, addr: Address) -> Result<(), EmissionError> {
        self.operator.ensure(caller)?;
        self.controllers.grant(addr)?;
        tracing::info!(%addr, "emission controller added");
        Ok(())
    }

    pub fn remove_controller(&mut self, caller: &Address, addr: &Address) -> Result<(), EmissionError> {
        self.operator.ensure(caller)?;
        self.controllers.revoke(addr)?;
        tracing::info!(%addr, "emission controller removed");
        Ok(())
    }

    /// Change the emission rate from `now` on. Returns the previous rate.
    pub fn set_token_per_block(
        &mut self,
        caller: &Address,
        rate: u128,
        with_settle_all: bool,
        now: BlockHeight,
    ) -> Result<u128, EmissionError> {
        self.operator.ensure(caller)?;
        if with_settle_all {
            self.settle_all(now)?;
        }
        let previous = self.token_per_block();
        self.schedule.set_rate(rate, now)?;
        self.bound_schedule(now)?;
        tracing::info!(previous, rate, at = %now, "emission rate changed");
        Ok(previous)
    }

    /// Change the share of emission split by allocation weight.
    pub fn set_base_share(
        &mut self,
        caller: &Address,
        bps: u32,
        with_settle_all: bool,
        now: BlockHeight,
    ) -> Result<(), EmissionError> {
        self.operator.ensure(caller)?;
        if with_settle_all {
            self.settle_all(now)?;
        }
        self.schedule.set_base_share(bps, now)?;
        self.bound_schedule(now)?;
        tracing::info!(bps, at = %now, "base share changed");
        Ok(())
    }

    /// Register a pool for `token` and deploy its gauge. Returns the gauge address.
    pub fn create_gauge(
        &mut self,
        caller: &Address,
        token: Address,
        weight: u128,
        with_settle_all: bool,
        now: BlockHeight,
    ) -> Result<Address, EmissionError> {
        self.ensure_privileged(caller)?;
        if self.pools.contains_key(&token) {
            return Err(EmissionError::PoolAlreadyExists(token));
        }
        if with_settle_all {
            self.settle_all(now)?;
        }
        self.schedule.set_weight(token, weight, now)?;
        let address = Address::derive(b"vegauge/gauge", &[&self.address.as_bytes()[..], &token.as_bytes()[..]]);
        self.pools.insert(
            token,
            PoolEntry {
                gauge: Gauge::new(address, token, now),
                active: true,
            },
        );
        self.order.push(token);
        self.bound_schedule(now)?;
        tracing::info!(%token, gauge = %address, weight, "gauge created");
        Ok(address)
    }

    /// Change a pool's allocation weight. Returns the previous weight.
    pub fn set_pool_weight(
        &mut self,
        caller: &Address,
        token: &Address,
        weight: u128,
        with_settle_all: bool,
        now: BlockHeight,
    ) -> Result<u128, EmissionError> {
        self.ensure_privileged(caller)?;
        self.active_entry(token)?;
        if with_settle_all {
            self.settle_all(now)?;
        }
        let previous = self.allocation(token).weight;
        self.schedule.set_weight(*token, weight, now)?;
        self.bound_schedule(now)?;
        tracing::info!(%token, previous, weight, "pool weight changed");
        Ok(previous)
    }

    /// Replace every active pool's boost weight with its vote tally.
    ///
    /// Pools missing from `tallies` drop to zero boost. Returns the number of
    /// pools that received a non-zero boost.
    pub fn set_boost_weights(
        &mut self,
        caller: &Address,
        tallies: &BTreeMap<Address, u128>,
        now: BlockHeight,
    ) -> Result<usize, EmissionError> {
        self.controllers.ensure(caller)?;
        for token in tallies.keys() {
            if !self.is_active(token) {
                tracing::debug!(%token, "ignoring tally for unknown or inactive pool");
            }
        }
        self.settle_all(now)?;

        let boosts: BTreeMap<Address, u128> = self
            .order
            .iter()
            .filter(|t| self.is_active(t))
            .map(|t| (*t, tallies.get(t).copied().unwrap_or(0)))
            .collect();
        let boosted = boosts.values().filter(|b| **b > 0).count();
        self.schedule.set_boosts(&boosts, now)?;
        tracing::info!(pools = boosts.len(), boosted, at = %now, "boost weights applied");
        Ok(boosted)
    }

    /// Stop emission to a pool for good. Stakers can still withdraw and claim.
    pub fn remove_pool(&mut self, caller: &Address, token: &Address, now: BlockHeight) -> Result<(), EmissionError> {
        self.operator.ensure(caller)?;
        self.active_entry(token)?;
        self.settle_all(now)?;
        self.schedule.remove_pool(token, now)?;
        if let Some(entry) = self.pools.get_mut(token) {
            entry.active = false;
        }
        tracing::info!(%token, at = %now, "pool removed");
        Ok(())
    }

    /// Settle every gauge at `now`, then prune schedule segments no gauge needs.
    ///
    /// A gauge that fails to settle is left where it was and keeps the
    /// segments it still needs; the others settle regardless. Returns the
    /// number of gauges that failed.
    pub fn settle_all(&mut self, now: BlockHeight) -> Result<usize, EmissionError> {
        let mut failed = 0;
        for (token, entry) in self.pools.iter_mut() {
            if let Err(error) = entry.gauge.update_pool(now, &self.schedule) {
                failed += 1;
                tracing::warn!(%token, %error, at = %now, "gauge left unsettled");
            }
        }
        let pruned = self.prune_settled();
        tracing::debug!(pools = self.pools.len(), failed, at = %now, pruned, "all pools settled");
        Ok(failed)
    }

    pub fn update_pool(&mut self, token: &Address, now: BlockHeight) -> Result<(), EmissionError> {
        let entry = self.pools.get_mut(token).ok_or(EmissionError::PoolNotFound(*token))?;
        entry.gauge.update_pool(now, &self.schedule)?;
        self.prune_settled();
        Ok(())
    }

    pub fn pending_reward(&self, token: &Address, user: &Address, now: BlockHeight) -> Result<u128, EmissionError> {
        let entry = self.pools.get(token).ok_or(EmissionError::PoolNotFound(*token))?;
        Ok(entry.gauge.pending_reward(user, now, &self.schedule)?)
    }

    /// Stake into `token`'s gauge. Returns the reward paid on the way in.
    pub fn deposit(
        &mut self,
        token: &Address,
        user: &Address,
        amount: u128,
        now: BlockHeight,
        stake_token: &mut dyn TokenLedger,
        minter: &mut dyn RewardMinter,
    ) -> Result<u128, EmissionError> {
        self.active_entry(token)?;
        let entry = self.pools.get_mut(token).ok_or(EmissionError::PoolNotFound(*token))?;
        let paid = entry
            .gauge
            .deposit(user, amount, now, &self.schedule, stake_token, minter)?;
        self.prune_settled();
        Ok(paid)
    }

    pub fn withdraw(
        &mut self,
        token: &Address,
        user: &Address,
        amount: u128,
        now: BlockHeight,
        stake_token: &mut dyn TokenLedger,
        minter: &mut dyn RewardMinter,
    ) -> Result<u128, EmissionError> {
        let entry = self.pools.get_mut(token).ok_or(EmissionError::PoolNotFound(*token))?;
        let paid = entry
            .gauge
            .withdraw(user, amount, now, &self.schedule, stake_token, minter)?;
        self.prune_settled();
        Ok(paid)
    }

    pub fn get_reward(
        &mut self,
        token: &Address,
        user: &Address,
        to: &Address,
        now: BlockHeight,
        minter: &mut dyn RewardMinter,
    ) -> Result<u128, EmissionError> {
        let entry = self.pools.get_mut(token).ok_or(EmissionError::PoolNotFound(*token))?;
        let paid = entry.gauge.get_reward(user, to, now, &self.schedule, minter)?;
        self.prune_settled();
        Ok(paid)
    }

    pub fn emergency_withdraw(
        &mut self,
        token: &Address,
        user: &Address,
        stake_token: &mut dyn TokenLedger,
    ) -> Result<u128, EmissionError> {
        let entry = self.pools.get_mut(token).ok_or(EmissionError::PoolNotFound(*token))?;
        Ok(entry.gauge.emergency_withdraw(user, stake_token)?)
    }

    /// Drop schedule segments every gauge has settled past.
    fn prune_settled(&mut self) -> usize {
        match self.pools.values().map(|p| p.gauge.last_settled()).min() {
            Some(oldest) => self.schedule.prune(oldest),
            None => self.schedule.prune(BlockHeight::new(u64::MAX)),
        }
    }

    /// Settle everything once too many closed segments are waiting.
    fn bound_schedule(&mut self, now: BlockHeight) -> Result<(), EmissionError> {
        if self.schedule.segment_count() > MAX_UNSETTLED_SEGMENTS {
            self.settle_all(now)?;
        }
        Ok(())
    }

    fn ensure_privileged(&self, caller: &Address) -> Result<(), EmissionError> {
        if self.operator.is_operator(caller) {
            return Ok(());
        }
        self.controllers.ensure(caller)?;
        Ok(())
    }

    fn active_entry(&self, token: &Address) -> Result<&PoolEntry, EmissionError> {
        let entry = self.pools.get(token).ok_or(EmissionError::PoolNotFound(*token))?;
        if !entry.active {
            return Err(EmissionError::PoolInactive(*token));
        }
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vegauge_access::AccessError;
    use vegauge_gauge::GaugeError;
    use vegauge_token::{Balances, RewardToken};
    use vegauge_types::WAD;

    const OPERATOR: u64 = 1;
    const CONTROLLER: u64 = 2;
    const ALICE: u64 = 10;
    const TOKEN_A: u64 = 100;
    const TOKEN_B: u64 = 200;

    fn addr(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    fn h(n: u64) -> BlockHeight {
        BlockHeight::new(n)
    }

    fn controller(rate: u128) -> EmissionController {
        let params = EmissionParams {
            token_per_block: rate,
            start_block: h(0),
            mint_duration: 100,
            base_share_bps: 3_000,
        };
        EmissionController::new(addr(900), Operator::new(addr(OPERATOR)), &params, h(0)).unwrap()
    }

    struct World {
        emission: EmissionController,
        stake: Balances,
        reward: RewardToken,
    }

    fn world(rate: u128) -> World {
        let mut emission = controller(rate);
        let mut reward = RewardToken::new("Reward", "RWD", Operator::new(addr(OPERATOR)));
        let gauge = emission
            .create_gauge(&addr(OPERATOR), addr(TOKEN_A), 100, true, h(0))
            .unwrap();
        reward.add_pool(&addr(OPERATOR), gauge).unwrap();
        let mut stake = Balances::new();
        stake.credit(&addr(ALICE), 10_000 * WAD).unwrap();
        World {
            emission,
            stake,
            reward,
        }
    }

    #[test]
    fn create_gauge_is_privileged_and_unique() {
        let mut e = controller(WAD);
        assert_eq!(
            e.create_gauge(&addr(ALICE), addr(TOKEN_A), 1, true, h(0)),
            Err(EmissionError::Access(AccessError::Unauthorized(addr(ALICE))))
        );
        let g = e.create_gauge(&addr(OPERATOR), addr(TOKEN_A), 1, true, h(0)).unwrap();
        assert_eq!(e.gauge_of(&addr(TOKEN_A)), Some(g));
        assert_eq!(
            e.create_gauge(&addr(OPERATOR), addr(TOKEN_A), 1, true, h(1)),
            Err(EmissionError::PoolAlreadyExists(addr(TOKEN_A)))
        );

        e.add_controller(&addr(OPERATOR), addr(CONTROLLER)).unwrap();
        e.create_gauge(&addr(CONTROLLER), addr(TOKEN_B), 1, false, h(2)).unwrap();
        assert_eq!(e.pool_length(), 2);
        assert_eq!(e.pools(), &[addr(TOKEN_A), addr(TOKEN_B)]);
        assert_ne!(e.gauge_of(&addr(TOKEN_A)), e.gauge_of(&addr(TOKEN_B)));
    }

    #[test]
    fn thirty_percent_of_rate_reaches_a_lone_pool() {
        let mut w = world(WAD);
        w.emission
            .set_token_per_block(&addr(OPERATOR), 1_000 * WAD, true, h(1))
            .unwrap();
        w.emission.update_pool(&addr(TOKEN_A), h(1)).unwrap();
        w.emission
            .deposit(&addr(TOKEN_A), &addr(ALICE), 1_000 * WAD, h(2), &mut w.stake, &mut w.reward)
            .unwrap();
        w.emission.settle_all(h(12)).unwrap();
        let paid = w
            .emission
            .get_reward(&addr(TOKEN_A), &addr(ALICE), &addr(ALICE), h(12), &mut w.reward)
            .unwrap();
        assert_eq!(paid, 10 * 300 * WAD);
        assert_eq!(w.reward.balance_of(&addr(ALICE)), 3_000 * WAD);
    }

    #[test]
    fn rate_change_is_not_retroactive_without_settle() {
        let mut eager = world(100 * WAD);
        let mut lazy = world(100 * WAD);
        for w in [&mut eager, &mut lazy] {
            w.emission
                .deposit(&addr(TOKEN_A), &addr(ALICE), WAD, h(0), &mut w.stake, &mut w.reward)
                .unwrap();
        }
        eager
            .emission
            .set_token_per_block(&addr(OPERATOR), 500 * WAD, true, h(10))
            .unwrap();
        lazy.emission
            .set_token_per_block(&addr(OPERATOR), 500 * WAD, false, h(10))
            .unwrap();
        let a = eager.emission.pending_reward(&addr(TOKEN_A), &addr(ALICE), h(20)).unwrap();
        let b = lazy.emission.pending_reward(&addr(TOKEN_A), &addr(ALICE), h(20)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, (10 * 100 + 10 * 500) * 3 * WAD / 10);
    }

    #[test]
    fn set_boost_weights_is_controller_only() {
        let mut w = world(1_000 * WAD);
        let tallies = BTreeMap::from([(addr(TOKEN_A), 5u128), (addr(999), 7u128)]);
        assert!(w
            .emission
            .set_boost_weights(&addr(OPERATOR), &tallies, h(0))
            .is_err());
        w.emission.add_controller(&addr(OPERATOR), addr(CONTROLLER)).unwrap();
        assert_eq!(
            w.emission.set_boost_weights(&addr(CONTROLLER), &tallies, h(0)),
            Ok(1)
        );
        assert_eq!(w.emission.allocation(&addr(TOKEN_A)).boost, 5);
        assert_eq!(w.emission.total_boost(), 5);

        w.emission
            .deposit(&addr(TOKEN_A), &addr(ALICE), WAD, h(0), &mut w.stake, &mut w.reward)
            .unwrap();
        // With a boost the lone pool takes the whole block.
        assert_eq!(
            w.emission.pending_reward(&addr(TOKEN_A), &addr(ALICE), h(1)),
            Ok(1_000 * WAD)
        );
    }

    #[test]
    fn removed_pool_rejects_deposits_but_allows_exit() {
        let mut w = world(10 * WAD);
        w.emission
            .deposit(&addr(TOKEN_A), &addr(ALICE), WAD, h(0), &mut w.stake, &mut w.reward)
            .unwrap();
        assert!(w.emission.remove_pool(&addr(ALICE), &addr(TOKEN_A), h(5)).is_err());
        w.emission.remove_pool(&addr(OPERATOR), &addr(TOKEN_A), h(5)).unwrap();
        assert_eq!(w.emission.total_weight(), 0);
        assert_eq!(
            w.emission
                .deposit(&addr(TOKEN_A), &addr(ALICE), WAD, h(6), &mut w.stake, &mut w.reward),
            Err(EmissionError::PoolInactive(addr(TOKEN_A)))
        );
        assert_eq!(
            w.emission.remove_pool(&addr(OPERATOR), &addr(TOKEN_A), h(6)),
            Err(EmissionError::PoolInactive(addr(TOKEN_A)))
        );
        let paid = w
            .emission
            .withdraw(&addr(TOKEN_A), &addr(ALICE), WAD, h(50), &mut w.stake, &mut w.reward)
            .unwrap();
        assert_eq!(paid, 5 * 3 * WAD);
        assert_eq!(w.stake.balance_of(&addr(ALICE)), 10_000 * WAD);
        assert_eq!(
            w.emission.create_gauge(&addr(OPERATOR), addr(TOKEN_A), 1, true, h(60)),
            Err(EmissionError::PoolAlreadyExists(addr(TOKEN_A)))
        );
    }

    #[test]
    fn settle_all_prunes_history() {
        let mut w = world(WAD);
        for i in 1..=5u64 {
            w.emission
                .set_token_per_block(&addr(OPERATOR), WAD * i as u128, false, h(i))
                .unwrap();
        }
        assert_eq!(w.emission.schedule().segment_count(), 6);
        w.emission.settle_all(h(10)).unwrap();
        assert_eq!(w.emission.schedule().segment_count(), 1);
        // Idempotent within a block.
        let acc = w.emission.gauge(&addr(TOKEN_A)).unwrap().acc_reward_per_share();
        w.emission.settle_all(h(10)).unwrap();
        assert_eq!(w.emission.gauge(&addr(TOKEN_A)).unwrap().acc_reward_per_share(), acc);
    }

    #[test]
    fn lazy_parameter_changes_stay_bounded() {
        let mut w = world(WAD);
        for i in 1..=1_000u64 {
            w.emission
                .set_token_per_block(&addr(OPERATOR), WAD + i as u128, false, h(i))
                .unwrap();
            assert!(w.emission.schedule().segment_count() <= MAX_UNSETTLED_SEGMENTS + 1);
        }
        for i in 1_001..=1_200u64 {
            w.emission
                .set_pool_weight(&addr(OPERATOR), &addr(TOKEN_A), i as u128, false, h(i))
                .unwrap();
        }
        assert!(w.emission.schedule().segment_count() <= MAX_UNSETTLED_SEGMENTS + 1);
    }

    #[test]
    fn gauge_activity_prunes_settled_segments() {
        let mut w = world(WAD);
        for i in 1..=3u64 {
            w.emission
                .set_token_per_block(&addr(OPERATOR), WAD * i as u128, false, h(i))
                .unwrap();
        }
        assert_eq!(w.emission.schedule().segment_count(), 4);
        w.emission
            .deposit(&addr(TOKEN_A), &addr(ALICE), WAD, h(5), &mut w.stake, &mut w.reward)
            .unwrap();
        assert_eq!(w.emission.schedule().segment_count(), 1);
    }

    #[test]
    fn failing_gauge_does_not_block_the_others() {
        let mut e = controller(u128::MAX / 2);
        e.create_gauge(&addr(OPERATOR), addr(TOKEN_A), 1, true, h(0)).unwrap();
        // No allocation, so this pool never multiplies the rate.
        e.create_gauge(&addr(OPERATOR), addr(TOKEN_B), 0, true, h(0)).unwrap();
        e.set_token_per_block(&addr(OPERATOR), WAD, false, h(4)).unwrap();

        assert_eq!(e.settle_all(h(10)), Ok(1));
        assert_eq!(e.gauge(&addr(TOKEN_B)).unwrap().last_settled(), h(10));
        assert_eq!(e.gauge(&addr(TOKEN_A)).unwrap().last_settled(), h(0));
        // The stuck gauge still needs the old segment.
        assert_eq!(e.schedule().segment_count(), 2);
        assert_eq!(
            e.update_pool(&addr(TOKEN_A), h(10)),
            Err(EmissionError::Gauge(GaugeError::Overflow))
        );
        e.set_token_per_block(&addr(OPERATOR), 2 * WAD, true, h(11)).unwrap();
    }

    #[test]
    fn set_pool_weight_requires_known_active_pool() {
        let mut w = world(WAD);
        assert_eq!(
            w.emission
                .set_pool_weight(&addr(OPERATOR), &addr(TOKEN_B), 1, true, h(1)),
            Err(EmissionError::PoolNotFound(addr(TOKEN_B)))
        );
        assert_eq!(
            w.emission
                .set_pool_weight(&addr(OPERATOR), &addr(TOKEN_A), 300, true, h(1)),
            Ok(100)
        );
        assert_eq!(w.emission.allocation(&addr(TOKEN_A)).weight, 300);
    }
}
