//! 20-byte account address, displayed as `0x`-prefixed lowercase hex.

use blake2::digest::consts::U20;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

type Blake2b160 = Blake2b<U20>;

/// An account or component address on the host ledger.
///
/// Users, staking tokens and protocol components (registry, controllers,
/// gauges) all share this address space.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address([u8; 20]);

impl Address {
    /// The zero address. Never a valid owner or minter.
    pub const ZERO: Self = Self([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Build an address whose trailing eight bytes hold `n` (big-endian).
    /// Handy for deterministic fixtures.
    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    /// Derive a component address from a domain tag and seed parts.
    ///
    /// Blake2b-160 over `tag || parts...`. Used to give every gauge a stable
    /// address derived from its staking token.
    pub fn derive(tag: &[u8], parts: &[&[u8]]) -> Self {
        let mut hasher = Blake2b160::new();
        hasher.update(tag);
        for part in parts {
            hasher.update(part);
        }
        let digest = hasher.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.strip_prefix("0x").unwrap_or(s);
        let raw = hex::decode(body).map_err(|e| TypesError::InvalidAddress(e.to_string()))?;
        let bytes: [u8; 20] = raw
            .try_into()
            .map_err(|v: Vec<u8>| TypesError::InvalidAddress(format!("expected 20 bytes, got {}", v.len())))?;
        Ok(Self(bytes))
    }
}
