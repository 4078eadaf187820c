use thiserror::Error;
use vegauge_access::AccessError;
use vegauge_token::TokenError;
use vegauge_types::{Address, LockId, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    #[error("lock amount must be non-zero")]
    InvalidAmount,

    #[error("lock duration {secs}s outside [{min}s, {max}s]")]
    InvalidDuration { secs: u64, min: u64, max: u64 },

    #[error("new end {requested} must be after {current} and no later than {limit}")]
    InvalidEnd {
        requested: Timestamp,
        current: Timestamp,
        limit: Timestamp,
    },

    #[error("lock {0} not found")]
    LockNotFound(LockId),

    #[error("caller {caller} does not own lock {id}")]
    NotOwner { id: LockId, caller: Address },

    #[error("lock {0} has expired")]
    LockExpired(LockId),

    #[error("lock {id} has not expired: ends at {end}")]
    NotExpired { id: LockId, end: Timestamp },

    #[error("lock {0} was already withdrawn")]
    AlreadyWithdrawn(LockId),

    #[error("arithmetic overflow in lock accounting")]
    Overflow,

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Token(#[from] TokenError),
}
