//! Balance books and the traits the engine uses to move tokens.

use crate::error::TokenError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vegauge_types::Address;

/// Minimal token surface: read a balance, move funds between accounts.
///
/// Lock custody and gauge stake custody go through this trait, so the engine
/// never depends on a concrete token implementation.
pub trait TokenLedger {
    fn balance_of(&self, owner: &Address) -> u128;

    fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), TokenError>;
}

/// Mint path used by gauges to pay rewards.
///
/// `minter` is the address requesting the mint; implementations must reject
/// minters that are not authorized.
pub trait RewardMinter {
    fn mint(&mut self, minter: &Address, to: &Address, amount: u128) -> Result<(), TokenError>;
}

/// Account balances and total supply of a single token.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Balances {
    accounts: BTreeMap<Address, u128>,
    total_supply: u128,
}

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Create `amount` new units in `to`'s account.
    pub fn credit(&mut self, to: &Address, amount: u128) -> Result<(), TokenError> {
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        let balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        self.set_balance(to, balance);
        self.total_supply = supply;
        Ok(())
    }

    /// Destroy `amount` units from `from`'s account.
    pub fn debit(&mut self, from: &Address, amount: u128) -> Result<(), TokenError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        self.set_balance(from, available - amount);
        self.total_supply -= amount;
        Ok(())
    }

    fn set_balance(&mut self, owner: &Address, value: u128) {
        if value == 0 {
            self.accounts.remove(owner);
        } else {
            self.accounts.insert(*owner, value);
        }
    }
}

impl TokenLedger for Balances {
    fn balance_of(&self, owner: &Address) -> u128 {
        self.accounts.get(owner).copied().unwrap_or(0)
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), TokenError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        if from == to || amount == 0 {
            return Ok(());
        }
        let receiver = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        self.set_balance(from, available - amount);
        self.set_balance(to, receiver);
        Ok(())
    }
}

/// Balance books for every external staking token, keyed by token address.
///
/// Stands in for the ERC-20 contracts that gauges take deposits in.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokenBank {
    tokens: BTreeMap<Address, Balances>,
}

impl TokenBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutable ledger for `token`, created empty on first use.
    pub fn ledger_mut(&mut self, token: &Address) -> &mut Balances {
        self.tokens.entry(*token).or_default()
    }

    pub fn balance_of(&self, token: &Address, owner: &Address) -> u128 {
        self.tokens
            .get(token)
            .map(|b| b.balance_of(owner))
            .unwrap_or(0)
    }

    /// Faucet used by fixtures and genesis allocation.
    pub fn credit(&mut self, token: &Address, to: &Address, amount: u128) -> Result<(), TokenError> {
        self.ledger_mut(token).credit(to, amount)
    }
}
