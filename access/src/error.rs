use thiserror::Error;
use vegauge_types::Address;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("caller {0} is not authorized")]
    Unauthorized(Address),

    #[error("address {0} already exists")]
    AddressAlreadyExists(Address),

    #[error("address {0} is not on the list (already revoked)")]
    AlreadyRevoked(Address),

    #[error("the zero address cannot be granted a capability")]
    ZeroAddress,
}
