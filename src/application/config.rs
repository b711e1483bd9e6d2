use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::{DISPLAY_PLACES, MAX_DECIMAL_PLACES};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max_decimal_places must be at most {max}, got {0}", max = DISPLAY_PLACES)]
    TooManyDecimalPlaces(u32),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tunables for the ledger service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Fractional digits accepted in incoming amounts
    pub max_decimal_places: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_decimal_places: MAX_DECIMAL_PLACES,
        }
    }
}

impl LedgerConfig {
    pub fn with_max_decimal_places(mut self, places: u32) -> Self {
        self.max_decimal_places = places;
        self
    }

    /// Outputs always carry two decimals, so inputs may not carry more.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_decimal_places > DISPLAY_PLACES {
            return Err(ConfigError::TooManyDecimalPlaces(self.max_decimal_places));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: LedgerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
