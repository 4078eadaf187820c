//! Stake balances and the reward-per-share accumulator of a single pool.

use crate::error::GaugeError;
use crate::source::RewardSource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vegauge_token::{RewardMinter, TokenLedger};
use vegauge_types::{narrow, Address, BlockHeight, PRECISION, U256};

/// One user's position in a gauge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStake {
    pub amount: u128,
    /// `amount × acc / PRECISION` as of the user's last interaction.
    pub reward_debt: U256,
}

impl UserStake {
    /// Reward owed to this stake under accumulator value `acc`.
    pub fn pending(&self, acc: U256) -> Result<u128, GaugeError> {
        let gross = accrued(self.amount, acc)?;
        gross
            .checked_sub(self.reward_debt)
            .and_then(narrow)
            .ok_or(GaugeError::Overflow)
    }
}

/// `amount × acc / PRECISION`, kept at full width.
fn accrued(amount: u128, acc: U256) -> Result<U256, GaugeError> {
    U256::from(amount)
        .checked_mul(acc)
        .map(|v| v / U256::from(PRECISION))
        .ok_or(GaugeError::Overflow)
}

/// Accumulator growth for `reward` spread over `total_staked`.
fn per_share(reward: u128, total_staked: u128) -> U256 {
    U256::from(reward) * U256::from(PRECISION) / U256::from(total_staked)
}

/// A staking pool with its own accumulator.
///
/// Staked tokens are held at the gauge's `address` on the staking token's
/// ledger. Rewards are never held: they are minted straight to the claimant.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Gauge {
    address: Address,
    token: Address,
    acc_reward_per_share: U256,
    last_settled: BlockHeight,
    total_staked: u128,
    stakes: BTreeMap<Address, UserStake>,
    /// Reward assigned to this pool over every settled span.
    total_accrued: u128,
    total_paid: u128,
    /// Reward never paid: spans with no stake and emergency exits.
    forfeited: u128,
}

impl Gauge {
    pub fn new(address: Address, token: Address, created_at: BlockHeight) -> Self {
        Self {
            address,
            token,
            acc_reward_per_share: U256::zero(),
            last_settled: created_at,
            total_staked: 0,
            stakes: BTreeMap::new(),
            total_accrued: 0,
            total_paid: 0,
            forfeited: 0,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// The staking token this gauge takes deposits in.
    pub fn token(&self) -> Address {
        self.token
    }

    pub fn acc_reward_per_share(&self) -> U256 {
        self.acc_reward_per_share
    }

    pub fn last_settled(&self) -> BlockHeight {
        self.last_settled
    }

    pub fn total_staked(&self) -> u128 {
        self.total_staked
    }

    pub fn total_accrued(&self) -> u128 {
        self.total_accrued
    }

    pub fn total_paid(&self) -> u128 {
        self.total_paid
    }

    pub fn forfeited(&self) -> u128 {
        self.forfeited
    }

    pub fn stake_of(&self, user: &Address) -> UserStake {
        self.stakes.get(user).copied().unwrap_or_default()
    }

    pub fn staker_count(&self) -> usize {
        self.stakes.len()
    }

    /// Bring the accumulator up to `now`. No-op if already settled there.
    pub fn update_pool(&mut self, now: BlockHeight, source: &dyn RewardSource) -> Result<(), GaugeError> {
        if now <= self.last_settled {
            return Ok(());
        }
        let reward = source.reward_between(&self.token, self.last_settled, now)?;
        let total_accrued = self
            .total_accrued
            .checked_add(reward)
            .ok_or(GaugeError::Overflow)?;

        if self.total_staked == 0 {
            self.forfeited = self.forfeited.checked_add(reward).ok_or(GaugeError::Overflow)?;
        } else {
            self.acc_reward_per_share = self
                .acc_reward_per_share
                .checked_add(per_share(reward, self.total_staked))
                .ok_or(GaugeError::Overflow)?;
        }
        self.total_accrued = total_accrued;
        tracing::debug!(
            gauge = %self.address,
            from = %self.last_settled,
            to = %now,
            reward,
            acc = %self.acc_reward_per_share,
            "pool settled"
        );
        self.last_settled = now;
        Ok(())
    }

    /// Settle, pay out pending reward, then pull `amount` from `user`.
    ///
    /// Returns the reward paid.
    pub fn deposit(
        &mut self,
        user: &Address,
        amount: u128,
        now: BlockHeight,
        source: &dyn RewardSource,
        stake_token: &mut dyn TokenLedger,
        minter: &mut dyn RewardMinter,
    ) -> Result<u128, GaugeError> {
        if amount == 0 {
            return Err(GaugeError::InvalidAmount);
        }
        self.update_pool(now, source)?;
        let mut stake = self.stake_of(user);
        let paid = self.pay(user, user, &stake, minter)?;

        stake.amount = stake.amount.checked_add(amount).ok_or(GaugeError::Overflow)?;
        let total_staked = self
            .total_staked
            .checked_add(amount)
            .ok_or(GaugeError::Overflow)?;
        stake.reward_debt = self.debt_for(stake.amount)?;

        stake_token.transfer(user, &self.address, amount)?;

        self.stakes.insert(*user, stake);
        self.total_staked = total_staked;
        tracing::info!(gauge = %self.address, %user, amount, paid, "deposit");
        Ok(paid)
    }

    /// Settle, pay out pending reward, then return `amount` to `user`.
    ///
    /// Returns the reward paid.
    pub fn withdraw(
        &mut self,
        user: &Address,
        amount: u128,
        now: BlockHeight,
        source: &dyn RewardSource,
        stake_token: &mut dyn TokenLedger,
        minter: &mut dyn RewardMinter,
    ) -> Result<u128, GaugeError> {
        if amount == 0 {
            return Err(GaugeError::InvalidAmount);
        }
        let mut stake = self.stake_of(user);
        if amount > stake.amount {
            return Err(GaugeError::InsufficientBalance {
                requested: amount,
                staked: stake.amount,
            });
        }
        self.update_pool(now, source)?;
        let paid = self.pay(user, user, &stake, minter)?;

        stake.amount -= amount;
        stake.reward_debt = self.debt_for(stake.amount)?;

        stake_token.transfer(&self.address, user, amount)?;

        self.total_staked -= amount;
        self.store(user, stake);
        tracing::info!(gauge = %self.address, %user, amount, paid, "withdraw");
        Ok(paid)
    }

    /// Settle and mint `user`'s pending reward to `to`. Returns the amount.
    pub fn get_reward(
        &mut self,
        user: &Address,
        to: &Address,
        now: BlockHeight,
        source: &dyn RewardSource,
        minter: &mut dyn RewardMinter,
    ) -> Result<u128, GaugeError> {
        self.update_pool(now, source)?;
        let mut stake = self.stake_of(user);
        let paid = self.pay(user, to, &stake, minter)?;
        if stake.amount > 0 {
            stake.reward_debt = self.debt_for(stake.amount)?;
            self.stakes.insert(*user, stake);
        }
        Ok(paid)
    }

    /// Return the whole stake without settling. Pending reward is forfeited.
    pub fn emergency_withdraw(
        &mut self,
        user: &Address,
        stake_token: &mut dyn TokenLedger,
    ) -> Result<u128, GaugeError> {
        let stake = self.stake_of(user);
        if stake.amount == 0 {
            return Err(GaugeError::NothingStaked(*user));
        }
        let lost = stake.pending(self.acc_reward_per_share)?;
        let forfeited = self.forfeited.checked_add(lost).ok_or(GaugeError::Overflow)?;

        stake_token.transfer(&self.address, user, stake.amount)?;

        self.forfeited = forfeited;
        self.total_staked -= stake.amount;
        self.stakes.remove(user);
        tracing::warn!(gauge = %self.address, %user, amount = stake.amount, forfeited = lost, "emergency withdraw");
        Ok(stake.amount)
    }

    /// What `user` could claim if the pool were settled at `now`.
    pub fn pending_reward(
        &self,
        user: &Address,
        now: BlockHeight,
        source: &dyn RewardSource,
    ) -> Result<u128, GaugeError> {
        let stake = self.stake_of(user);
        if stake.amount == 0 {
            return Ok(0);
        }
        let mut acc = self.acc_reward_per_share;
        if now > self.last_settled && self.total_staked > 0 {
            let reward = source.reward_between(&self.token, self.last_settled, now)?;
            acc = acc
                .checked_add(per_share(reward, self.total_staked))
                .ok_or(GaugeError::Overflow)?;
        }
        stake.pending(acc)
    }

    fn debt_for(&self, amount: u128) -> Result<U256, GaugeError> {
        accrued(amount, self.acc_reward_per_share)
    }

    /// Mint `stake`'s pending reward to `to`, minted by this gauge.
    fn pay(
        &mut self,
        user: &Address,
        to: &Address,
        stake: &UserStake,
        minter: &mut dyn RewardMinter,
    ) -> Result<u128, GaugeError> {
        let pending = stake.pending(self.acc_reward_per_share)?;
        if pending == 0 {
            return Ok(0);
        }
        let total_paid = self
            .total_paid
            .checked_add(pending)
            .ok_or(GaugeError::Overflow)?;
        minter.mint(&self.address, to, pending)?;
        self.total_paid = total_paid;
        tracing::debug!(gauge = %self.address, %user, %to, pending, "reward paid");
        Ok(pending)
    }

    fn store(&mut self, user: &Address, stake: UserStake) {
        if stake.amount == 0 {
            self.stakes.remove(user);
        } else {
            self.stakes.insert(*user, stake);
        }
    }
}
