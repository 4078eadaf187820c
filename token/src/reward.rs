//! The reward/governance token and its Pool Authorization List.

use crate::error::TokenError;
use crate::ledger::{Balances, RewardMinter, TokenLedger};
use serde::{Deserialize, Serialize};
use vegauge_access::{AccessGate, Operator};
use vegauge_types::Address;

/// Notifications raised by the reward token, consumed by monitoring.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenEvent {
    PoolAdded(Address),
    PoolRemoved(Address),
    Minted {
        minter: Address,
        to: Address,
        amount: u128,
    },
}

/// The reward token. Doubles as the governance token locked in the registry.
///
/// Supply only grows through [`RewardMinter::mint`], and only for minters on
/// the Pool Authorization List.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RewardToken {
    name: String,
    symbol: String,
    operator: Operator,
    balances: Balances,
    pools: AccessGate,
    #[serde(skip)]
    events: Vec<TokenEvent>,
}

impl RewardToken {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, operator: Operator) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            operator,
            balances: Balances::new(),
            pools: AccessGate::new(),
            events: Vec::new(),
        }
    }

    /// Allocate the genesis supply to `treasury`. Bypasses the minter list.
    pub fn with_genesis_supply(mut self, treasury: &Address, amount: u128) -> Result<Self, TokenError> {
        self.balances.credit(treasury, amount)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn total_supply(&self) -> u128 {
        self.balances.total_supply()
    }

    pub fn set_operator(&mut self, operator: Operator) {
        self.operator = operator;
    }

    /// Authorize `pool` to mint. Operator only.
    pub fn add_pool(&mut self, caller: &Address, pool: Address) -> Result<(), TokenError> {
        self.operator.ensure(caller)?;
        self.pools.grant(pool)?;
        tracing::info!(%pool, "minter pool added");
        self.events.push(TokenEvent::PoolAdded(pool));
        Ok(())
    }

    /// Revoke `pool`'s mint capability. Operator only.
    pub fn remove_pool(&mut self, caller: &Address, pool: &Address) -> Result<(), TokenError> {
        self.operator.ensure(caller)?;
        self.pools.revoke(pool)?;
        tracing::info!(%pool, "minter pool removed");
        self.events.push(TokenEvent::PoolRemoved(*pool));
        Ok(())
    }

    pub fn is_pool(&self, addr: &Address) -> bool {
        self.pools.is_authorized(addr)
    }

    pub fn pool_address_count(&self) -> usize {
        self.pools.len()
    }

    pub fn pools(&self) -> impl Iterator<Item = &Address> {
        self.pools.iter()
    }

    /// Drain notifications raised since the last call.
    pub fn take_events(&mut self) -> Vec<TokenEvent> {
        std::mem::take(&mut self.events)
    }
}

impl TokenLedger for RewardToken {
    fn balance_of(&self, owner: &Address) -> u128 {
        self.balances.balance_of(owner)
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), TokenError> {
        self.balances.transfer(from, to, amount)
    }
}

impl RewardMinter for RewardToken {
    fn mint(&mut self, minter: &Address, to: &Address, amount: u128) -> Result<(), TokenError> {
        if !self.pools.is_authorized(minter) {
            tracing::warn!(%minter, "mint rejected: minter not on pool authorization list");
            return Err(TokenError::MintUnauthorized(*minter));
        }
        self.balances.credit(to, amount)?;
        tracing::debug!(%minter, %to, amount, "reward minted");
        self.events.push(TokenEvent::Minted {
            minter: *minter,
            to: *to,
            amount,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vegauge_access::AccessError;

    fn addr(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    fn token() -> RewardToken {
        RewardToken::new("stock", "STK", Operator::new(addr(1)))
    }

    #[test]
    fn genesis_supply_goes_to_treasury() {
        let t = token().with_genesis_supply(&addr(1), 1_000).unwrap();
        assert_eq!(t.balance_of(&addr(1)), 1_000);
        assert_eq!(t.total_supply(), 1_000);
    }

    #[test]
    fn mint_requires_authorized_pool() {
        let mut t = token();
        let err = t.mint(&addr(5), &addr(2), 10).unwrap_err();
        assert_eq!(err, TokenError::MintUnauthorized(addr(5)));
        assert_eq!(t.total_supply(), 0);

        t.add_pool(&addr(1), addr(5)).unwrap();
        t.mint(&addr(5), &addr(2), 10).unwrap();
        assert_eq!(t.balance_of(&addr(2)), 10);
        assert_eq!(t.total_supply(), 10);
    }

    #[test]
    fn add_pool_is_operator_only() {
        let mut t = token();
        let err = t.add_pool(&addr(2), addr(5)).unwrap_err();
        assert_eq!(err, TokenError::Access(AccessError::Unauthorized(addr(2))));
        assert_eq!(t.pool_address_count(), 0);
    }

    #[test]
    fn duplicate_add_and_readd_cycle() {
        let mut t = token();
        t.add_pool(&addr(1), addr(5)).unwrap();
        assert_eq!(t.pool_address_count(), 1);

        let err = t.add_pool(&addr(1), addr(5)).unwrap_err();
        assert_eq!(
            err,
            TokenError::Access(AccessError::AddressAlreadyExists(addr(5)))
        );

        t.remove_pool(&addr(1), &addr(5)).unwrap();
        t.add_pool(&addr(1), addr(5)).unwrap();
        assert_eq!(
            t.take_events(),
            vec![
                TokenEvent::PoolAdded(addr(5)),
                TokenEvent::PoolRemoved(addr(5)),
                TokenEvent::PoolAdded(addr(5)),
            ]
        );
        assert!(t.take_events().is_empty());
    }

    #[test]
    fn removed_pool_can_no_longer_mint() {
        let mut t = token();
        t.add_pool(&addr(1), addr(5)).unwrap();
        t.remove_pool(&addr(1), &addr(5)).unwrap();
        assert!(matches!(
            t.mint(&addr(5), &addr(2), 1),
            Err(TokenError::MintUnauthorized(_))
        ));
        assert!(matches!(
            t.remove_pool(&addr(1), &addr(5)),
            Err(TokenError::Access(AccessError::AlreadyRevoked(_)))
        ));
    }
}
