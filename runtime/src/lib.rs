//! Host runtime for the vegauge protocol.
//!
//! Owns the chain clock and every component, and exposes the protocol's
//! public entry points as all-or-nothing transactions. Configuration is
//! read from TOML; the whole state can be snapshotted with bincode.

pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod runtime;
pub mod state;

pub use clock::ChainClock;
pub use config::RuntimeConfig;
pub use error::{ErrorKind, RuntimeError};
pub use event::{EventBus, RuntimeEvent};
pub use runtime::Runtime;
pub use state::RuntimeState;
