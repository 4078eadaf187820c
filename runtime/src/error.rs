use thiserror::Error;
use vegauge_access::AccessError;
use vegauge_emission::EmissionError;
use vegauge_gauge::GaugeError;
use vegauge_locker::LockError;
use vegauge_token::TokenError;
use vegauge_weights::WeightError;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("access error: {0}")]
    Access(#[from] AccessError),

    #[error("token error: {0}")]
    Token(#[from] TokenError),

    #[error("lock error: {0}")]
    Lock(#[from] LockError),

    #[error("gauge error: {0}")]
    Gauge(#[from] GaugeError),

    #[error("emission error: {0}")]
    Emission(#[from] EmissionError),

    #[error("weight error: {0}")]
    Weight(#[from] WeightError),

    #[error("config error: {0}")]
    Config(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure taxonomy shared by every entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthorized,
    InvalidAddress,
    InvalidAmount,
    InvalidDuration,
    AlreadyExists,
    AlreadyRevoked,
    NotExpired,
    AlreadyWithdrawn,
    LockExpired,
    InsufficientBalance,
    IndexOutOfRange,
    WeightCapExceeded,
    /// A gauge tried to mint without being on the reward token's pool list.
    MintUnauthorized,
    NotFound,
    Inactive,
    Overflow,
    Config,
    Snapshot,
}

impl RuntimeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RuntimeError::Access(e) => access_kind(e),
            RuntimeError::Token(e) => token_kind(e),
            RuntimeError::Lock(e) => lock_kind(e),
            RuntimeError::Gauge(e) => gauge_kind(e),
            RuntimeError::Emission(e) => emission_kind(e),
            RuntimeError::Weight(e) => weight_kind(e),
            RuntimeError::Config(_) | RuntimeError::Io(_) => ErrorKind::Config,
            RuntimeError::Snapshot(_) => ErrorKind::Snapshot,
        }
    }
}

fn access_kind(e: &AccessError) -> ErrorKind {
    match e {
        AccessError::Unauthorized(_) => ErrorKind::Unauthorized,
        AccessError::AddressAlreadyExists(_) => ErrorKind::AlreadyExists,
        AccessError::AlreadyRevoked(_) => ErrorKind::AlreadyRevoked,
        AccessError::ZeroAddress => ErrorKind::InvalidAddress,
    }
}

fn token_kind(e: &TokenError) -> ErrorKind {
    match e {
        TokenError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
        TokenError::MintUnauthorized(_) => ErrorKind::MintUnauthorized,
        TokenError::ZeroAmount => ErrorKind::InvalidAmount,
        TokenError::Overflow => ErrorKind::Overflow,
        TokenError::Access(e) => access_kind(e),
    }
}

fn lock_kind(e: &LockError) -> ErrorKind {
    match e {
        LockError::InvalidAmount => ErrorKind::InvalidAmount,
        LockError::InvalidDuration { .. } | LockError::InvalidEnd { .. } => ErrorKind::InvalidDuration,
        LockError::LockNotFound(_) => ErrorKind::NotFound,
        LockError::NotOwner { .. } => ErrorKind::Unauthorized,
        LockError::LockExpired(_) => ErrorKind::LockExpired,
        LockError::NotExpired { .. } => ErrorKind::NotExpired,
        LockError::AlreadyWithdrawn(_) => ErrorKind::AlreadyWithdrawn,
        LockError::Overflow => ErrorKind::Overflow,
        LockError::Access(e) => access_kind(e),
        LockError::Token(e) => token_kind(e),
    }
}

fn gauge_kind(e: &GaugeError) -> ErrorKind {
    match e {
        GaugeError::InvalidAmount => ErrorKind::InvalidAmount,
        GaugeError::InsufficientBalance { .. } | GaugeError::NothingStaked(_) => {
            ErrorKind::InsufficientBalance
        }
        GaugeError::Overflow => ErrorKind::Overflow,
        GaugeError::Token(e) => token_kind(e),
    }
}

fn emission_kind(e: &EmissionError) -> ErrorKind {
    match e {
        EmissionError::PoolAlreadyExists(_) => ErrorKind::AlreadyExists,
        EmissionError::PoolNotFound(_) => ErrorKind::NotFound,
        EmissionError::PoolInactive(_) => ErrorKind::Inactive,
        EmissionError::InvalidShare(_) => ErrorKind::InvalidAmount,
        EmissionError::Overflow => ErrorKind::Overflow,
        EmissionError::Access(e) => access_kind(e),
        EmissionError::Gauge(e) => gauge_kind(e),
    }
}

fn weight_kind(e: &WeightError) -> ErrorKind {
    match e {
        WeightError::PoolAlreadyExists(_) => ErrorKind::AlreadyExists,
        WeightError::PoolNotFound(_) => ErrorKind::NotFound,
        WeightError::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
        WeightError::InvalidDuration => ErrorKind::InvalidDuration,
        WeightError::InvalidBps(_) | WeightError::NoVotingPower(_) => ErrorKind::InvalidAmount,
        WeightError::WeightCapExceeded { .. } => ErrorKind::WeightCapExceeded,
        WeightError::NotOwner { .. } => ErrorKind::Unauthorized,
        WeightError::Overflow => ErrorKind::Overflow,
        WeightError::Access(e) => access_kind(e),
        WeightError::Lock(e) => lock_kind(e),
        WeightError::Emission(e) => emission_kind(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vegauge_types::Address;

    #[test]
    fn nested_mint_failure_keeps_its_kind() {
        let gauge = Address::from_low_u64(7);
        let err: RuntimeError =
            EmissionError::Gauge(GaugeError::Token(TokenError::MintUnauthorized(gauge))).into();
        assert_eq!(err.kind(), ErrorKind::MintUnauthorized);
    }

    #[test]
    fn lock_errors_map_to_taxonomy() {
        let err: RuntimeError = LockError::NotExpired {
            id: 1,
            end: vegauge_types::Timestamp::new(5),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::NotExpired);
        let err: RuntimeError = WeightError::Lock(LockError::AlreadyWithdrawn(1)).into();
        assert_eq!(err.kind(), ErrorKind::AlreadyWithdrawn);
    }

    #[test]
    fn access_errors_inside_components() {
        let err: RuntimeError =
            EmissionError::Access(AccessError::AddressAlreadyExists(Address::from_low_u64(1))).into();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }
}
