use thiserror::Error;
use vegauge_access::AccessError;
use vegauge_types::Address;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("insufficient balance: need {needed}, available {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    #[error("minter {0} is not on the pool authorization list")]
    MintUnauthorized(Address),

    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("arithmetic overflow in token accounting")]
    Overflow,

    #[error(transparent)]
    Access(#[from] AccessError),
}
