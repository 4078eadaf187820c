//! The lock registry: issues ids, holds custody, answers power queries.

use crate::error::LockError;
use crate::lock::Lock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use vegauge_access::{AccessGate, Operator};
use vegauge_token::TokenLedger;
use vegauge_types::{Address, LockId, Timestamp};

/// Lock duration policy, in seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockerConfig {
    #[serde(default = "default_min_lock_secs")]
    pub min_lock_secs: u64,
    #[serde(default = "default_max_lock_secs")]
    pub max_lock_secs: u64,
}

fn default_min_lock_secs() -> u64 {
    86_400 // 1 day
}

fn default_max_lock_secs() -> u64 {
    4 * 365 * 86_400 // 4 years
}

impl Default for LockerConfig {
    fn default() -> Self {
        Self {
            min_lock_secs: default_min_lock_secs(),
            max_lock_secs: default_max_lock_secs(),
        }
    }
}

/// Registry of vote-escrow locks.
///
/// Locked tokens are moved into the registry's own `address` on the
/// governance token ledger and returned on withdrawal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LockRegistry {
    address: Address,
    operator: Operator,
    config: LockerConfig,
    next_id: LockId,
    locks: BTreeMap<LockId, Lock>,
    by_owner: BTreeMap<Address, BTreeSet<LockId>>,
    /// Addresses allowed to read power for boosting.
    readers: AccessGate,
    total_locked: u128,
}

impl LockRegistry {
    pub fn new(address: Address, operator: Operator, config: LockerConfig) -> Self {
        Self {
            address,
            operator,
            config,
            next_id: 1,
            locks: BTreeMap::new(),
            by_owner: BTreeMap::new(),
            readers: AccessGate::new(),
            total_locked: 0,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn config(&self) -> &LockerConfig {
        &self.config
    }

    pub fn set_operator(&mut self, operator: Operator) {
        self.operator = operator;
    }

    /// Lock `amount` for `duration_secs` starting at `now`.
    pub fn create_lock(
        &mut self,
        caller: &Address,
        amount: u128,
        duration_secs: u64,
        now: Timestamp,
        token: &mut dyn TokenLedger,
    ) -> Result<LockId, LockError> {
        if amount == 0 {
            return Err(LockError::InvalidAmount);
        }
        if duration_secs < self.config.min_lock_secs || duration_secs > self.config.max_lock_secs {
            return Err(LockError::InvalidDuration {
                secs: duration_secs,
                min: self.config.min_lock_secs,
                max: self.config.max_lock_secs,
            });
        }
        let end = now
            .checked_add_secs(duration_secs)
            .ok_or(LockError::Overflow)?;
        let total_locked = self
            .total_locked
            .checked_add(amount)
            .ok_or(LockError::Overflow)?;
        let id = self.next_id;
        let next_id = id.checked_add(1).ok_or(LockError::Overflow)?;

        token.transfer(caller, &self.address, amount)?;

        self.locks.insert(
            id,
            Lock {
                id,
                owner: *caller,
                amount,
                start: now,
                end,
                withdrawn: false,
            },
        );
        self.by_owner.entry(*caller).or_default().insert(id);
        self.total_locked = total_locked;
        self.next_id = next_id;
        tracing::info!(lock_id = id, owner = %caller, amount, %end, "lock created");
        Ok(id)
    }

    /// Add `extra` to an active lock without moving its end.
    pub fn increase_amount(
        &mut self,
        caller: &Address,
        id: LockId,
        extra: u128,
        now: Timestamp,
        token: &mut dyn TokenLedger,
    ) -> Result<u128, LockError> {
        if extra == 0 {
            return Err(LockError::InvalidAmount);
        }
        let lock = self.owned_active(caller, id, now)?;
        let amount = lock.amount.checked_add(extra).ok_or(LockError::Overflow)?;
        let total_locked = self
            .total_locked
            .checked_add(extra)
            .ok_or(LockError::Overflow)?;

        token.transfer(caller, &self.address, extra)?;

        if let Some(lock) = self.locks.get_mut(&id) {
            lock.amount = amount;
        }
        self.total_locked = total_locked;
        tracing::info!(lock_id = id, extra, amount, "lock amount increased");
        Ok(amount)
    }

    /// Move an active lock's end forward to `new_end`.
    ///
    /// `new_end` must be after the current end and at most `max_lock` from now.
    pub fn extend_lock(
        &mut self,
        caller: &Address,
        id: LockId,
        new_end: Timestamp,
        now: Timestamp,
    ) -> Result<(), LockError> {
        let lock = self.owned_active(caller, id, now)?;
        let limit = now
            .checked_add_secs(self.config.max_lock_secs)
            .ok_or(LockError::Overflow)?;
        if new_end <= lock.end || new_end > limit {
            return Err(LockError::InvalidEnd {
                requested: new_end,
                current: lock.end,
                limit,
            });
        }
        if let Some(lock) = self.locks.get_mut(&id) {
            lock.end = new_end;
        }
        tracing::info!(lock_id = id, %new_end, "lock extended");
        Ok(())
    }

    /// Return an expired lock's tokens to its owner. Succeeds exactly once.
    pub fn withdraw(
        &mut self,
        caller: &Address,
        id: LockId,
        now: Timestamp,
        token: &mut dyn TokenLedger,
    ) -> Result<u128, LockError> {
        let lock = self.owned(caller, id)?;
        if lock.withdrawn {
            return Err(LockError::AlreadyWithdrawn(id));
        }
        if !lock.is_expired(now) {
            return Err(LockError::NotExpired { id, end: lock.end });
        }
        let amount = lock.amount;

        token.transfer(&self.address, caller, amount)?;

        if let Some(lock) = self.locks.get_mut(&id) {
            lock.withdrawn = true;
        }
        self.total_locked -= amount;
        tracing::info!(lock_id = id, owner = %caller, amount, "lock withdrawn");
        Ok(amount)
    }

    /// Decayed voting power of lock `id` at `at`. Unknown ids have no power.
    pub fn voting_power(&self, id: LockId, at: Timestamp) -> u128 {
        self.locks
            .get(&id)
            .map(|l| l.voting_power(at, self.config.max_lock_secs))
            .unwrap_or(0)
    }

    /// Power read on behalf of a boosting component on the access gate.
    pub fn boost_power(&self, caller: &Address, id: LockId, at: Timestamp) -> Result<u128, LockError> {
        self.readers.ensure(caller)?;
        let lock = self.locks.get(&id).ok_or(LockError::LockNotFound(id))?;
        lock.voting_power_checked(at, self.config.max_lock_secs)
            .ok_or(LockError::Overflow)
    }

    /// Sum of every lock's voting power at `at`.
    pub fn total_voting_power(&self, at: Timestamp) -> u128 {
        self.locks
            .values()
            .map(|l| l.voting_power(at, self.config.max_lock_secs))
            .fold(0u128, |acc, p| acc.saturating_add(p))
    }

    /// Grant a component the right to read power for boosting. Operator only.
    pub fn add_authorized(&mut self, caller: &Address, addr: Address) -> Result<(), LockError> {
        self.operator.ensure(caller)?;
        self.readers.grant(addr)?;
        tracing::info!(%addr, "lock power reader added");
        Ok(())
    }

    pub fn remove_authorized(&mut self, caller: &Address, addr: &Address) -> Result<(), LockError> {
        self.operator.ensure(caller)?;
        self.readers.revoke(addr)?;
        tracing::info!(%addr, "lock power reader removed");
        Ok(())
    }

    pub fn is_authorized(&self, addr: &Address) -> bool {
        self.readers.is_authorized(addr)
    }

    /// Last assigned id (1-based); 0 before the first lock.
    pub fn token_id(&self) -> LockId {
        self.next_id - 1
    }

    pub fn lock(&self, id: LockId) -> Option<&Lock> {
        self.locks.get(&id)
    }

    pub fn locks_of(&self, owner: &Address) -> Vec<LockId> {
        self.by_owner
            .get(owner)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Tokens currently held in custody.
    pub fn total_locked(&self) -> u128 {
        self.total_locked
    }

    fn owned(&self, caller: &Address, id: LockId) -> Result<&Lock, LockError> {
        let lock = self.locks.get(&id).ok_or(LockError::LockNotFound(id))?;
        if lock.owner != *caller {
            return Err(LockError::NotOwner { id, caller: *caller });
        }
        Ok(lock)
    }

    fn owned_active(&self, caller: &Address, id: LockId, now: Timestamp) -> Result<&Lock, LockError> {
        let lock = self.owned(caller, id)?;
        if lock.withdrawn {
            return Err(LockError::AlreadyWithdrawn(id));
        }
        if lock.is_expired(now) {
            return Err(LockError::LockExpired(id));
        }
        Ok(lock)
    }
}
