//! Everything a transaction may touch.

use serde::{Deserialize, Serialize};
use vegauge_access::Operator;
use vegauge_emission::EmissionController;
use vegauge_locker::LockRegistry;
use vegauge_token::{RewardToken, TokenBank};
use vegauge_types::{Address, BlockHeight, Timestamp};
use vegauge_weights::WeightController;

use crate::clock::ChainClock;
use crate::config::RuntimeConfig;
use crate::RuntimeError;

/// Fixed addresses of the singleton components.
pub fn locker_address() -> Address {
    Address::derive(b"vegauge/locker", &[])
}

pub fn emission_address() -> Address {
    Address::derive(b"vegauge/emission", &[])
}

pub fn weights_address() -> Address {
    Address::derive(b"vegauge/weights", &[])
}

/// Complete protocol state. Cloned per transaction and committed on success.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuntimeState {
    pub clock: ChainClock,
    pub operator: Operator,
    pub reward: RewardToken,
    pub locker: LockRegistry,
    pub emission: EmissionController,
    pub weights: WeightController,
    /// Ledgers of the external tokens staked in gauges.
    pub stake_tokens: TokenBank,
}

impl RuntimeState {
    /// Build the genesis state described by `config`.
    ///
    /// The weight controller is wired in: it may read lock power and push
    /// boost weights. Gauges still need to be added to the reward token's
    /// pool list before they can pay out.
    pub fn genesis(config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        config.validate()?;
        let op_addr = config.operator()?;
        let operator = Operator::new(op_addr);
        let clock = ChainClock::new(
            BlockHeight::new(config.chain.genesis_block),
            Timestamp::new(config.chain.genesis_time),
            config.chain.block_time_secs,
        );

        let reward = RewardToken::new(config.token.name.clone(), config.token.symbol.clone(), operator)
            .with_genesis_supply(&config.treasury()?, config.initial_supply()?)?;
        let mut locker = LockRegistry::new(locker_address(), operator, config.locker.clone());
        let mut emission = EmissionController::new(
            emission_address(),
            operator,
            &config.emission_params()?,
            clock.block(),
        )?;
        let weights = WeightController::new(weights_address(), operator, config.weights_duration())?;

        locker.add_authorized(&op_addr, weights.address())?;
        emission.add_controller(&op_addr, weights.address())?;

        tracing::info!(
            block = %clock.block(),
            operator = %op_addr,
            rate = emission.token_per_block(),
            base_share_bps = emission.base_share_bps(),
            "genesis state built"
        );
        Ok(Self {
            clock,
            operator,
            reward,
            locker,
            emission,
            weights,
            stake_tokens: TokenBank::new(),
        })
    }

    /// Hand governance of every component to `new_operator`.
    pub fn transfer_operator(&mut self, caller: &Address, new_operator: Address) -> Result<(), RuntimeError> {
        self.operator.transfer(caller, new_operator)?;
        self.reward.set_operator(self.operator);
        self.locker.set_operator(self.operator);
        self.emission.set_operator(self.operator);
        self.weights.set_operator(self.operator);
        Ok(())
    }
}
