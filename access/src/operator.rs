//! The protocol operator (governance) capability.

use crate::error::AccessError;
use serde::{Deserialize, Serialize};
use vegauge_types::Address;

/// The single governance address allowed to reconfigure components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator(Address);

impl Operator {
    pub fn new(addr: Address) -> Self {
        Self(addr)
    }

    pub fn address(&self) -> Address {
        self.0
    }

    pub fn is_operator(&self, caller: &Address) -> bool {
        self.0 == *caller
    }

    pub fn ensure(&self, caller: &Address) -> Result<(), AccessError> {
        if self.is_operator(caller) {
            Ok(())
        } else {
            tracing::warn!(%caller, "privileged call rejected: not the operator");
            Err(AccessError::Unauthorized(*caller))
        }
    }

    /// Hand governance to a new address. Only the current operator may do so.
    pub fn transfer(&mut self, caller: &Address, new_operator: Address) -> Result<(), AccessError> {
        self.ensure(caller)?;
        if new_operator.is_zero() {
            return Err(AccessError::ZeroAddress);
        }
        tracing::info!(from = %self.0, to = %new_operator, "operator transferred");
        self.0 = new_operator;
        Ok(())
    }
}
