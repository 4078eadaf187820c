use thiserror::Error;
use vegauge_access::AccessError;
use vegauge_emission::EmissionError;
use vegauge_locker::LockError;
use vegauge_types::{Address, LockId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeightError {
    #[error("pool {0} is already registered")]
    PoolAlreadyExists(Address),

    #[error("pool {0} is not registered")]
    PoolNotFound(Address),

    #[error("pool index {index} out of range (have {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("duration must be at least one block")]
    InvalidDuration,

    #[error("vote share {0} bps must be in 1..=10000")]
    InvalidBps(u32),

    #[error("lock would allocate {requested} bps, cap is 10000")]
    WeightCapExceeded { requested: u32 },

    #[error("caller {caller} does not own lock {id}")]
    NotOwner { id: LockId, caller: Address },

    #[error("lock {0} has no voting power")]
    NoVotingPower(LockId),

    #[error("arithmetic overflow in vote tally")]
    Overflow,

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Emission(#[from] EmissionError),
}
