//! Token surfaces used by the incentive engine.
//!
//! The reward token is the only token whose supply this workspace controls:
//! it is minted exclusively by addresses on its Pool Authorization List.
//! Staking tokens are external collaborators; the engine only needs
//! `balance_of` and `transfer` from them, expressed by [`TokenLedger`].

pub mod error;
pub mod ledger;
pub mod reward;

pub use error::TokenError;
pub use ledger::{Balances, RewardMinter, TokenBank, TokenLedger};
pub use reward::{RewardToken, TokenEvent};
