//! Engine configuration

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use cropshield_common::{
    Address, CropShieldError, Result, DEFAULT_COVERAGE_MULTIPLIER, DEFAULT_JOURNAL_CAPACITY,
};

/// Configuration file looked up by [`EngineConfig::load`], extension optional
pub const CONFIG_FILE: &str = "cropshield";

/// Prefix for environment overrides, e.g. `CROPSHIELD_COVERAGE_MULTIPLIER=4`
pub const ENV_PREFIX: &str = "CROPSHIELD";

/// CropShield engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Premium-to-coverage ratio, fixed for the engine's lifetime
    pub coverage_multiplier: Decimal,
    /// Account holding every capability
    pub operator: Address,
    /// Additional accounts allowed to submit readings
    pub oracles: Vec<Address>,
    /// Journal entries kept in memory
    pub journal_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            coverage_multiplier: Decimal::from(DEFAULT_COVERAGE_MULTIPLIER),
            operator: Address::from("operator"),
            oracles: Vec::new(),
            journal_capacity: DEFAULT_JOURNAL_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Load configuration from `.env`, `cropshield.toml` and `CROPSHIELD_*` variables
    pub fn load() -> Result<Self> {
        // Try to load .env file
        let _ = dotenvy::dotenv();

        let cfg: Self = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse an inline TOML document; missing keys keep their defaults
    pub fn from_toml(document: &str) -> Result<Self> {
        let cfg: Self = config::Config::builder()
            .add_source(config::File::from_str(document, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.coverage_multiplier <= Decimal::ZERO {
            return Err(CropShieldError::Config(format!(
                "coverage_multiplier must be positive, got {}",
                self.coverage_multiplier
            )));
        }
        if self.operator.is_empty() {
            return Err(CropShieldError::Config(
                "operator address must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
