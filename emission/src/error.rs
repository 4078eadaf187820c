use thiserror::Error;
use vegauge_access::AccessError;
use vegauge_gauge::GaugeError;
use vegauge_types::Address;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmissionError {
    #[error("pool for token {0} already exists")]
    PoolAlreadyExists(Address),

    #[error("no pool for token {0}")]
    PoolNotFound(Address),

    #[error("pool for token {0} has been removed")]
    PoolInactive(Address),

    #[error("base share {0} bps exceeds 10000")]
    InvalidShare(u32),

    #[error("arithmetic overflow in emission schedule")]
    Overflow,

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Gauge(#[from] GaugeError),
}
