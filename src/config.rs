//! Registry configuration.

use std::env;

use thiserror::Error;

use crate::Amount;

pub const CREATION_FEE_VAR: &str = "SPLIT_LEDGER_CREATION_FEE";
pub const EVENT_CAPACITY_VAR: &str = "SPLIT_LEDGER_EVENT_CAPACITY";

const DEFAULT_EVENT_CAPACITY: usize = 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}: expected a non-negative integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("SPLIT_LEDGER_EVENT_CAPACITY must be at least 1")]
    ZeroEventCapacity,
}

/// Settings of a [`Registry`](crate::Registry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Payment required to create a group. Zero disables the fee.
    pub creation_fee: Amount,
    /// Number of events buffered per subscriber before slow subscribers start lagging.
    pub event_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            creation_fee: Amount::ZERO,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl RegistryConfig {
    pub fn with_creation_fee(fee: Amount) -> Self {
        Self {
            creation_fee: fee,
            ..Default::default()
        }
    }

    /// Read overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build a config from `lookup`, falling back to defaults for unset variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(CREATION_FEE_VAR) {
            config.creation_fee = Amount::from_units(parse_number(CREATION_FEE_VAR, &value)?);
        }
        if let Some(value) = lookup(EVENT_CAPACITY_VAR) {
            let capacity = parse_number(EVENT_CAPACITY_VAR, &value)?;
            if capacity == 0 {
                return Err(ConfigError::ZeroEventCapacity);
            }
            config.event_capacity = usize::try_from(capacity).unwrap_or(usize::MAX);
        }

        Ok(config)
    }
}

fn parse_number(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber {
            var,
            value: value.to_string(),
        })
}
