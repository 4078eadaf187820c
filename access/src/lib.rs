//! Capability allow-lists for privileged entry points.
//!
//! Every privileged call in the protocol starts with a pure predicate over
//! explicit data: either "is the caller the operator" or "is the caller on
//! this gate". There is no inheritance-style role mixin; a component simply
//! owns the gates it consults.

pub mod error;
pub mod gate;
pub mod operator;

pub use error::AccessError;
pub use gate::AccessGate;
pub use operator::Operator;
