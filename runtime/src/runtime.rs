//! The host: transactional entry points over [`RuntimeState`].

use std::collections::BTreeMap;

use vegauge_emission::Allocation;
use vegauge_token::{RewardMinter, RewardToken, TokenError, TokenLedger};
use vegauge_types::{Address, BlockHeight, LockId, Timestamp};

use crate::config::RuntimeConfig;
use crate::event::{EventBus, RuntimeEvent};
use crate::state::RuntimeState;
use crate::RuntimeError;

/// A single-threaded simulated ledger running the vegauge protocol.
///
/// Every state-changing entry point is a transaction: it runs against a
/// copy of the state, which replaces the live state only on success.
/// Events raised along the way reach subscribers only after commit.
pub struct Runtime {
    state: RuntimeState,
    events: EventBus,
}

impl Runtime {
    pub fn new(config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        Ok(Self::from_state(RuntimeState::genesis(config)?))
    }

    pub fn from_state(state: RuntimeState) -> Self {
        Self {
            state,
            events: EventBus::new(),
        }
    }

    /// Read-only view of the whole protocol state.
    pub fn state(&self) -> &RuntimeState {
        &self.state
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&RuntimeEvent) + Send + Sync>) {
        self.events.subscribe(listener);
    }

    // ── Clock ──────────────────────────────────────────────────────────

    pub fn block(&self) -> BlockHeight {
        self.state.clock.block()
    }

    pub fn now(&self) -> Timestamp {
        self.state.clock.now()
    }

    pub fn mine(&mut self, blocks: u64) -> BlockHeight {
        self.state.clock.mine(blocks)
    }

    pub fn advance_time(&mut self, secs: u64) -> Timestamp {
        self.state.clock.advance_time(secs)
    }

    // ── Snapshots ──────────────────────────────────────────────────────

    /// Encode the full state. Subscriptions are not included.
    pub fn snapshot(&self) -> Result<Vec<u8>, RuntimeError> {
        bincode::serialize(&self.state).map_err(|e| RuntimeError::Snapshot(e.to_string()))
    }

    pub fn restore(bytes: &[u8]) -> Result<Self, RuntimeError> {
        let state: RuntimeState =
            bincode::deserialize(bytes).map_err(|e| RuntimeError::Snapshot(e.to_string()))?;
        tracing::info!(block = %state.clock.block(), "runtime restored from snapshot");
        Ok(Self::from_state(state))
    }

    // ── Governance ─────────────────────────────────────────────────────

    pub fn transfer_operator(&mut self, caller: &Address, new_operator: Address) -> Result<(), RuntimeError> {
        self.transact("transfer_operator", |s, _| s.transfer_operator(caller, new_operator))
    }

    // ── Reward token ───────────────────────────────────────────────────

    pub fn add_minter_pool(&mut self, caller: &Address, pool: Address) -> Result<(), RuntimeError> {
        self.apply_token("add_minter_pool", |t| t.add_pool(caller, pool))
    }

    pub fn remove_minter_pool(&mut self, caller: &Address, pool: &Address) -> Result<(), RuntimeError> {
        self.apply_token("remove_minter_pool", |t| t.remove_pool(caller, pool))
    }

    pub fn pool_address_count(&self) -> usize {
        self.state.reward.pool_address_count()
    }

    pub fn is_minter_pool(&self, addr: &Address) -> bool {
        self.state.reward.is_pool(addr)
    }

    /// Mint as `minter`. Only addresses on the pool list succeed.
    pub fn mint(&mut self, minter: &Address, to: &Address, amount: u128) -> Result<(), RuntimeError> {
        self.apply_token("mint", |t| t.mint(minter, to, amount))
    }

    pub fn transfer(&mut self, caller: &Address, to: &Address, amount: u128) -> Result<(), RuntimeError> {
        self.apply_token("transfer", |t| t.transfer(caller, to, amount))
    }

    pub fn balance_of(&self, owner: &Address) -> u128 {
        self.state.reward.balance_of(owner)
    }

    pub fn total_supply(&self) -> u128 {
        self.state.reward.total_supply()
    }

    /// Issue external staking tokens. Operator only; stands in for the
    /// token's own issuance.
    pub fn credit_stake_token(
        &mut self,
        caller: &Address,
        token: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), RuntimeError> {
        self.transact("credit_stake_token", |s, _| {
            s.operator.ensure(caller)?;
            Ok(s.stake_tokens.credit(token, to, amount)?)
        })
    }

    pub fn stake_balance(&self, token: &Address, owner: &Address) -> u128 {
        self.state.stake_tokens.balance_of(token, owner)
    }

    // ── Lock registry ──────────────────────────────────────────────────

    pub fn create_lock(&mut self, caller: &Address, amount: u128, duration_secs: u64) -> Result<LockId, RuntimeError> {
        self.transact("create_lock", |s, ev| {
            let now = s.clock.now();
            let id = s.locker.create_lock(caller, amount, duration_secs, now, &mut s.reward)?;
            let end = s.locker.lock(id).map_or(now, |l| l.end);
            ev.push(RuntimeEvent::LockCreated {
                id,
                owner: *caller,
                amount,
                end,
            });
            Ok(id)
        })
    }

    pub fn increase_lock_amount(&mut self, caller: &Address, id: LockId, extra: u128) -> Result<u128, RuntimeError> {
        self.transact("increase_lock_amount", |s, ev| {
            let now = s.clock.now();
            let amount = s.locker.increase_amount(caller, id, extra, now, &mut s.reward)?;
            ev.push(RuntimeEvent::LockIncreased { id, amount });
            Ok(amount)
        })
    }

    pub fn extend_lock(&mut self, caller: &Address, id: LockId, new_end: Timestamp) -> Result<(), RuntimeError> {
        self.transact("extend_lock", |s, ev| {
            let now = s.clock.now();
            s.locker.extend_lock(caller, id, new_end, now)?;
            ev.push(RuntimeEvent::LockExtended { id, end: new_end });
            Ok(())
        })
    }

    /// Return an expired lock's tokens. Its votes are released with it.
    pub fn withdraw_lock(&mut self, caller: &Address, id: LockId) -> Result<u128, RuntimeError> {
        self.transact("withdraw_lock", |s, ev| {
            let now = s.clock.now();
            let amount = s.locker.withdraw(caller, id, now, &mut s.reward)?;
            s.weights.release(id);
            ev.push(RuntimeEvent::LockWithdrawn {
                id,
                owner: *caller,
                amount,
            });
            Ok(amount)
        })
    }

    /// Voting power of lock `id` now.
    pub fn voting_power(&self, id: LockId) -> u128 {
        self.state.locker.voting_power(id, self.now())
    }

    pub fn voting_power_at(&self, id: LockId, at: Timestamp) -> u128 {
        self.state.locker.voting_power(id, at)
    }

    pub fn total_voting_power(&self) -> u128 {
        self.state.locker.total_voting_power(self.now())
    }

    pub fn token_id(&self) -> LockId {
        self.state.locker.token_id()
    }

    pub fn locks_of(&self, owner: &Address) -> Vec<LockId> {
        self.state.locker.locks_of(owner)
    }

    pub fn add_lock_reader(&mut self, caller: &Address, addr: Address) -> Result<(), RuntimeError> {
        self.transact("add_lock_reader", |s, _| Ok(s.locker.add_authorized(caller, addr)?))
    }

    pub fn remove_lock_reader(&mut self, caller: &Address, addr: &Address) -> Result<(), RuntimeError> {
        self.transact("remove_lock_reader", |s, _| Ok(s.locker.remove_authorized(caller, addr)?))
    }

    // ── Emission controller ────────────────────────────────────────────

    pub fn set_token_per_block(&mut self, caller: &Address, rate: u128, with_settle_all: bool) -> Result<(), RuntimeError> {
        self.transact("set_token_per_block", |s, ev| {
            let at = s.clock.block();
            let previous = s.emission.set_token_per_block(caller, rate, with_settle_all, at)?;
            ev.push(RuntimeEvent::RateChanged { previous, rate, at });
            Ok(())
        })
    }

    pub fn set_base_share(&mut self, caller: &Address, bps: u32, with_settle_all: bool) -> Result<(), RuntimeError> {
        self.transact("set_base_share", |s, _| {
            let at = s.clock.block();
            Ok(s.emission.set_base_share(caller, bps, with_settle_all, at)?)
        })
    }

    /// Register a staking pool and return its gauge address.
    pub fn create_gauge(
        &mut self,
        caller: &Address,
        token: Address,
        weight: u128,
        with_settle_all: bool,
    ) -> Result<Address, RuntimeError> {
        self.transact("create_gauge", |s, ev| {
            let at = s.clock.block();
            let gauge = s.emission.create_gauge(caller, token, weight, with_settle_all, at)?;
            ev.push(RuntimeEvent::GaugeCreated { token, gauge, weight });
            Ok(gauge)
        })
    }

    pub fn set_pool_weight(
        &mut self,
        caller: &Address,
        token: &Address,
        weight: u128,
        with_settle_all: bool,
    ) -> Result<(), RuntimeError> {
        self.transact("set_pool_weight", |s, ev| {
            let at = s.clock.block();
            s.emission.set_pool_weight(caller, token, weight, with_settle_all, at)?;
            ev.push(RuntimeEvent::PoolWeightChanged { token: *token, weight });
            Ok(())
        })
    }

    pub fn remove_pool(&mut self, caller: &Address, token: &Address) -> Result<(), RuntimeError> {
        self.transact("remove_pool", |s, ev| {
            let at = s.clock.block();
            s.emission.remove_pool(caller, token, at)?;
            ev.push(RuntimeEvent::PoolRemoved { token: *token });
            Ok(())
        })
    }

    /// Settle every gauge at the current block.
    pub fn mass_update_pools(&mut self) -> Result<(), RuntimeError> {
        self.transact("mass_update_pools", |s, _| {
            let at = s.clock.block();
            s.emission.settle_all(at)?;
            Ok(())
        })
    }

    pub fn gauge_of(&self, token: &Address) -> Option<Address> {
        self.state.emission.gauge_of(token)
    }

    pub fn pool_length(&self) -> usize {
        self.state.emission.pool_length()
    }

    pub fn mint_duration(&self) -> u64 {
        self.state.emission.mint_duration()
    }

    pub fn token_per_block(&self) -> u128 {
        self.state.emission.token_per_block()
    }

    pub fn allocation(&self, token: &Address) -> Allocation {
        self.state.emission.allocation(token)
    }

    pub fn add_controller(&mut self, caller: &Address, addr: Address) -> Result<(), RuntimeError> {
        self.transact("add_controller", |s, _| Ok(s.emission.add_controller(caller, addr)?))
    }

    pub fn remove_controller(&mut self, caller: &Address, addr: &Address) -> Result<(), RuntimeError> {
        self.transact("remove_controller", |s, _| Ok(s.emission.remove_controller(caller, addr)?))
    }

    pub fn pending_reward(&self, token: &Address, user: &Address) -> Result<u128, RuntimeError> {
        Ok(self.state.emission.pending_reward(token, user, self.block())?)
    }

    // ── Weight controller ──────────────────────────────────────────────

    pub fn set_duration(&mut self, caller: &Address, blocks: u64) -> Result<(), RuntimeError> {
        self.transact("set_duration", |s, _| Ok(s.weights.set_duration(caller, blocks)?))
    }

    pub fn add_weight_pool(&mut self, caller: &Address, token: Address) -> Result<usize, RuntimeError> {
        self.transact("add_weight_pool", |s, _| Ok(s.weights.add_pool(caller, token)?))
    }

    pub fn get_pool(&self, index: usize) -> Result<Address, RuntimeError> {
        Ok(self.state.weights.get_pool(index)?)
    }

    pub fn weight_pool_count(&self) -> usize {
        self.state.weights.pool_count()
    }

    pub fn vote_tallies(&self) -> &BTreeMap<Address, u128> {
        self.state.weights.tallies()
    }

    pub fn vote(&mut self, caller: &Address, lock_id: LockId, pool: &Address, bps: u32) -> Result<u128, RuntimeError> {
        self.transact("vote", |s, ev| {
            let (block, now) = (s.clock.block(), s.clock.now());
            let weight = s.weights.vote(caller, lock_id, pool, bps, block, now, &s.locker)?;
            ev.push(RuntimeEvent::VoteCast {
                lock_id,
                pool: *pool,
                bps,
                weight,
            });
            Ok(weight)
        })
    }

    pub fn reset_votes(&mut self, caller: &Address, lock_id: LockId) -> Result<usize, RuntimeError> {
        self.transact("reset_votes", |s, _| Ok(s.weights.reset(caller, lock_id, &s.locker)?))
    }

    pub fn poke(&mut self, lock_id: LockId) -> Result<u128, RuntimeError> {
        self.transact("poke", |s, _| {
            let now = s.clock.now();
            Ok(s.weights.poke(lock_id, now, &s.locker)?)
        })
    }

    /// Push vote tallies into the emission controller if the cadence allows.
    pub fn checkpoint_weights(&mut self) -> Result<bool, RuntimeError> {
        self.transact("checkpoint_weights", |s, ev| {
            let at = s.clock.block();
            let now = s.clock.now();
            let applied = s.weights.checkpoint(at, now, &s.locker, &mut s.emission)?;
            if applied {
                ev.push(RuntimeEvent::WeightsCheckpointed { at });
            }
            Ok(applied)
        })
    }

    // ── Pool gauges ────────────────────────────────────────────────────

    pub fn deposit(&mut self, caller: &Address, token: &Address, amount: u128) -> Result<u128, RuntimeError> {
        self.transact("deposit", |s, ev| {
            let at = s.clock.block();
            let ledger = s.stake_tokens.ledger_mut(token);
            let paid = s.emission.deposit(token, caller, amount, at, ledger, &mut s.reward)?;
            push_reward(ev, token, caller, caller, paid);
            ev.push(RuntimeEvent::Deposit {
                token: *token,
                user: *caller,
                amount,
            });
            Ok(paid)
        })
    }

    pub fn withdraw(&mut self, caller: &Address, token: &Address, amount: u128) -> Result<u128, RuntimeError> {
        self.transact("withdraw", |s, ev| {
            let at = s.clock.block();
            let ledger = s.stake_tokens.ledger_mut(token);
            let paid = s.emission.withdraw(token, caller, amount, at, ledger, &mut s.reward)?;
            push_reward(ev, token, caller, caller, paid);
            ev.push(RuntimeEvent::Withdraw {
                token: *token,
                user: *caller,
                amount,
            });
            Ok(paid)
        })
    }

    /// Claim `caller`'s pending reward in `token`'s gauge, minted to `to`.
    pub fn get_reward(&mut self, caller: &Address, token: &Address, to: &Address) -> Result<u128, RuntimeError> {
        self.transact("get_reward", |s, ev| {
            let at = s.clock.block();
            let paid = s.emission.get_reward(token, caller, to, at, &mut s.reward)?;
            push_reward(ev, token, caller, to, paid);
            Ok(paid)
        })
    }

    pub fn update_pool(&mut self, token: &Address) -> Result<(), RuntimeError> {
        self.transact("update_pool", |s, _| {
            let at = s.clock.block();
            Ok(s.emission.update_pool(token, at)?)
        })
    }

    pub fn emergency_withdraw(&mut self, caller: &Address, token: &Address) -> Result<u128, RuntimeError> {
        self.transact("emergency_withdraw", |s, ev| {
            let ledger = s.stake_tokens.ledger_mut(token);
            let amount = s.emission.emergency_withdraw(token, caller, ledger)?;
            ev.push(RuntimeEvent::Withdraw {
                token: *token,
                user: *caller,
                amount,
            });
            Ok(amount)
        })
    }

    pub fn stake_of(&self, token: &Address, user: &Address) -> u128 {
        self.state
            .emission
            .gauge(token)
            .map_or(0, |g| g.stake_of(user).amount)
    }

    /// Run a reward-token call directly on the live token.
    ///
    /// Every `RewardToken` operation validates before it mutates and raises
    /// its event last, so a failure leaves nothing to undo and no copy of
    /// the state is needed.
    fn apply_token<T, F>(&mut self, name: &'static str, op: F) -> Result<T, RuntimeError>
    where
        F: FnOnce(&mut RewardToken) -> Result<T, TokenError>,
    {
        match op(&mut self.state.reward) {
            Ok(value) => {
                let pending: Vec<RuntimeEvent> = self
                    .state
                    .reward
                    .take_events()
                    .into_iter()
                    .map(RuntimeEvent::from)
                    .collect();
                tracing::debug!(op = name, events = pending.len(), "token call applied");
                for event in &pending {
                    self.events.emit(event);
                }
                Ok(value)
            }
            Err(e) => {
                let e = RuntimeError::from(e);
                tracing::warn!(op = name, error = %e, kind = ?e.kind(), "token call rejected");
                Err(e)
            }
        }
    }

    /// Run `op` against a copy of the state; commit and publish on success.
    ///
    /// The copy makes every call O(state). Calls that touch only the reward
    /// token go through [`Runtime::apply_token`] instead.
    fn transact<T, F>(&mut self, name: &'static str, op: F) -> Result<T, RuntimeError>
    where
        F: FnOnce(&mut RuntimeState, &mut Vec<RuntimeEvent>) -> Result<T, RuntimeError>,
    {
        let mut draft = self.state.clone();
        let mut pending = Vec::new();
        match op(&mut draft, &mut pending) {
            Ok(value) => {
                pending.extend(draft.reward.take_events().into_iter().map(RuntimeEvent::from));
                self.state = draft;
                tracing::debug!(op = name, events = pending.len(), "transaction committed");
                for event in &pending {
                    self.events.emit(event);
                }
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(op = name, error = %e, kind = ?e.kind(), "transaction rolled back");
                Err(e)
            }
        }
    }
}

fn push_reward(ev: &mut Vec<RuntimeEvent>, token: &Address, user: &Address, to: &Address, amount: u128) {
    if amount > 0 {
        ev.push(RuntimeEvent::RewardPaid {
            token: *token,
            user: *user,
            to: *to,
            amount,
        });
    }
}
