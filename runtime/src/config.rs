//! Runtime configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::Path;

use vegauge_emission::EmissionParams;
use vegauge_locker::LockerConfig;
use vegauge_types::{Address, BlockHeight, BPS_DENOMINATOR};
use vegauge_utils::{parse_amount, LogFormat};

use crate::RuntimeError;

/// Configuration for a vegauge runtime.
///
/// Can be loaded from a TOML file via [`RuntimeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Amounts are decimal token
/// counts (`"1000"`, `"0.5"`); addresses are `0x`-prefixed hex.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub locker: LockerConfig,
    #[serde(default)]
    pub emission: EmissionConfig,
    #[serde(default)]
    pub weights: WeightsConfig,
    #[serde(default)]
    pub token: TokenConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    #[serde(default)]
    pub genesis_block: u64,
    #[serde(default)]
    pub genesis_time: u64,
    #[serde(default = "default_block_time")]
    pub block_time_secs: u64,
    /// Governance address of every component.
    #[serde(default = "default_operator")]
    pub operator: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionConfig {
    #[serde(default = "default_token_per_block")]
    pub token_per_block: String,
    #[serde(default)]
    pub start_block: u64,
    /// Emission period in blocks.
    #[serde(default = "default_mint_duration")]
    pub mint_duration: u64,
    #[serde(default = "default_base_share")]
    pub base_share_bps: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightsConfig {
    /// Blocks between checkpoints. Falls back to `emission.mint_duration`.
    #[serde(default)]
    pub duration: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    #[serde(default = "default_token_name")]
    pub name: String,
    #[serde(default = "default_token_symbol")]
    pub symbol: String,
    #[serde(default = "default_initial_supply")]
    pub initial_supply: String,
    /// Receives the initial supply. Defaults to the operator.
    #[serde(default)]
    pub treasury: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_block_time() -> u64 {
    3
}

fn default_operator() -> String {
    Address::from_low_u64(1).to_string()
}

fn default_token_per_block() -> String {
    "1".to_string()
}

fn default_mint_duration() -> u64 {
    28_800 // one day of 3s blocks
}

fn default_base_share() -> u32 {
    3_000
}

fn default_token_name() -> String {
    "Stock".to_string()
}

fn default_token_symbol() -> String {
    "STOCK".to_string()
}

fn default_initial_supply() -> String {
    "350000000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            genesis_block: 0,
            genesis_time: 0,
            block_time_secs: default_block_time(),
            operator: default_operator(),
        }
    }
}

impl Default for EmissionConfig {
    fn default() -> Self {
        Self {
            token_per_block: default_token_per_block(),
            start_block: 0,
            mint_duration: default_mint_duration(),
            base_share_bps: default_base_share(),
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            name: default_token_name(),
            symbol: default_token_symbol(),
            initial_supply: default_initial_supply(),
            treasury: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: default_log_level(),
        }
    }
}

// ── Impl ───────────────────────────────────────────────────────────────

impl RuntimeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| RuntimeError::Config(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, RuntimeError> {
        toml::from_str(s).map_err(|e| RuntimeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, RuntimeError> {
        toml::to_string_pretty(self).map_err(|e| RuntimeError::Config(e.to_string()))
    }

    /// Reject values the runtime cannot start with.
    pub fn validate(&self) -> Result<(), RuntimeError> {
        let fail = |msg: String| Err(RuntimeError::Config(msg));
        if self.chain.block_time_secs == 0 {
            return fail("chain.block_time_secs must be positive".into());
        }
        if self.locker.min_lock_secs == 0 || self.locker.min_lock_secs > self.locker.max_lock_secs {
            return fail(format!(
                "locker: need 0 < min_lock_secs ({}) <= max_lock_secs ({})",
                self.locker.min_lock_secs, self.locker.max_lock_secs
            ));
        }
        if self.emission.base_share_bps > BPS_DENOMINATOR {
            return fail(format!(
                "emission.base_share_bps {} exceeds {BPS_DENOMINATOR}",
                self.emission.base_share_bps
            ));
        }
        if self.emission.mint_duration == 0 {
            return fail("emission.mint_duration must be positive".into());
        }
        if self.weights_duration() == 0 {
            return fail("weights.duration must be positive".into());
        }
        self.operator()?;
        self.treasury()?;
        self.token_per_block()?;
        self.initial_supply()?;
        Ok(())
    }

    pub fn operator(&self) -> Result<Address, RuntimeError> {
        parse_address("chain.operator", &self.chain.operator)
    }

    pub fn treasury(&self) -> Result<Address, RuntimeError> {
        match &self.token.treasury {
            Some(s) => parse_address("token.treasury", s),
            None => self.operator(),
        }
    }

    pub fn token_per_block(&self) -> Result<u128, RuntimeError> {
        parse_amount(&self.emission.token_per_block)
            .map_err(|e| RuntimeError::Config(format!("emission.token_per_block: {e}")))
    }

    pub fn initial_supply(&self) -> Result<u128, RuntimeError> {
        parse_amount(&self.token.initial_supply)
            .map_err(|e| RuntimeError::Config(format!("token.initial_supply: {e}")))
    }

    pub fn weights_duration(&self) -> u64 {
        self.weights.duration.unwrap_or(self.emission.mint_duration)
    }

    pub fn emission_params(&self) -> Result<EmissionParams, RuntimeError> {
        Ok(EmissionParams {
            token_per_block: self.token_per_block()?,
            start_block: BlockHeight::new(self.emission.start_block),
            mint_duration: self.emission.mint_duration,
            base_share_bps: self.emission.base_share_bps,
        })
    }
}

impl LoggingConfig {
    /// Install the global tracing subscriber with these settings.
    pub fn init(&self) -> Result<(), RuntimeError> {
        vegauge_utils::init_logging(self.format, &self.level)
            .map_err(|e| RuntimeError::Config(e.to_string()))
    }
}

fn parse_address(field: &str, s: &str) -> Result<Address, RuntimeError> {
    s.parse()
        .map_err(|e| RuntimeError::Config(format!("{field}: {e}")))
}
