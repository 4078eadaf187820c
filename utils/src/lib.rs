//! Shared utilities for vegauge.

pub mod amount;
pub mod logging;

pub use amount::{format_amount, parse_amount, AmountParseError};
pub use logging::{init_logging, LogFormat, LoggingError};
