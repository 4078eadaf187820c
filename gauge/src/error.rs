use thiserror::Error;
use vegauge_token::TokenError;
use vegauge_types::Address;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GaugeError {
    #[error("amount must be non-zero")]
    InvalidAmount,

    #[error("withdraw of {requested} exceeds stake of {staked}")]
    InsufficientBalance { requested: u128, staked: u128 },

    #[error("{0} has nothing staked")]
    NothingStaked(Address),

    #[error("arithmetic overflow in reward accounting")]
    Overflow,

    #[error(transparent)]
    Token(#[from] TokenError),
}
