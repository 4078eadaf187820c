//! Lock Registry: vote-escrow positions.
//!
//! A holder locks governance tokens for a chosen duration and receives
//! voting power that decays linearly to zero at the lock's end:
//!
//! `power(t) = amount × (end − max(t, start)) / max_lock_duration`, `t < end`
//!
//! Power is zero once `t ≥ end` and after withdrawal. Addresses on the
//! registry's access gate (the weight controller) may read any lock's power
//! for boosting.

pub mod error;
pub mod lock;
pub mod registry;

pub use error::LockError;
pub use lock::Lock;
pub use registry::{LockRegistry, LockerConfig};
