//! An ordered allow-list of addresses.

use crate::error::AccessError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use vegauge_types::Address;

/// A set of addresses holding one capability.
///
/// Used for the Reward Token's Pool Authorization List, the Lock Registry's
/// power readers and the Emission Controller's controllers. Mutation happens
/// only through [`AccessGate::grant`] / [`AccessGate::revoke`]; the owning
/// component is responsible for checking that the caller may mutate it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGate {
    members: BTreeSet<Address>,
}

impl AccessGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_members(members: impl IntoIterator<Item = Address>) -> Self {
        Self {
            members: members.into_iter().filter(|a| !a.is_zero()).collect(),
        }
    }

    /// Pure predicate: does `addr` hold this capability?
    pub fn is_authorized(&self, addr: &Address) -> bool {
        self.members.contains(addr)
    }

    /// Fail with `Unauthorized` unless `caller` is on the gate.
    pub fn ensure(&self, caller: &Address) -> Result<(), AccessError> {
        if self.is_authorized(caller) {
            Ok(())
        } else {
            Err(AccessError::Unauthorized(*caller))
        }
    }

    /// Add an address. Duplicates fail with `AddressAlreadyExists`.
    pub fn grant(&mut self, addr: Address) -> Result<(), AccessError> {
        if addr.is_zero() {
            return Err(AccessError::ZeroAddress);
        }
        if !self.members.insert(addr) {
            return Err(AccessError::AddressAlreadyExists(addr));
        }
        tracing::debug!(%addr, "capability granted");
        Ok(())
    }

    /// Remove an address. Missing addresses fail with `AlreadyRevoked`.
    pub fn revoke(&mut self, addr: &Address) -> Result<(), AccessError> {
        if !self.members.remove(addr) {
            return Err(AccessError::AlreadyRevoked(*addr));
        }
        tracing::debug!(%addr, "capability revoked");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.members.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    #[test]
    fn grant_then_authorized() {
        let mut gate = AccessGate::new();
        assert!(!gate.is_authorized(&addr(1)));
        gate.grant(addr(1)).unwrap();
        assert!(gate.is_authorized(&addr(1)));
        assert!(gate.ensure(&addr(1)).is_ok());
        assert_eq!(gate.len(), 1);
    }

    #[test]
    fn duplicate_grant_rejected() {
        let mut gate = AccessGate::new();
        gate.grant(addr(1)).unwrap();
        assert_eq!(
            gate.grant(addr(1)),
            Err(AccessError::AddressAlreadyExists(addr(1)))
        );
        assert_eq!(gate.len(), 1);
    }

    #[test]
    fn revoke_twice_rejected() {
        let mut gate = AccessGate::with_members([addr(1)]);
        gate.revoke(&addr(1)).unwrap();
        assert_eq!(gate.revoke(&addr(1)), Err(AccessError::AlreadyRevoked(addr(1))));
        assert!(gate.is_empty());
    }

    #[test]
    fn revoke_then_regrant() {
        let mut gate = AccessGate::with_members([addr(1)]);
        gate.revoke(&addr(1)).unwrap();
        gate.grant(addr(1)).unwrap();
        assert!(gate.is_authorized(&addr(1)));
    }

    #[test]
    fn ensure_reports_caller() {
        let gate = AccessGate::new();
        assert_eq!(gate.ensure(&addr(9)), Err(AccessError::Unauthorized(addr(9))));
    }

    #[test]
    fn zero_address_never_granted() {
        let mut gate = AccessGate::with_members([Address::ZERO]);
        assert!(gate.is_empty());
        assert_eq!(gate.grant(Address::ZERO), Err(AccessError::ZeroAddress));
    }
}
