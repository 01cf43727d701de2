//! Harness configuration.
//!
//! Defaults cover every fixture in the test suite; a YAML file can override
//! them per run:
//!
//! ```yaml
//! default_account_balance: 1000000
//! default_max_gas: 1000000
//! gas_unit_price: 0
//! genesis_timestamp_usecs: 0
//! file_extension: "mvir"
//! jobs: 4
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Balance given to accounts declared without one
pub const DEFAULT_BALANCE: u64 = 1_000_000;

/// Gas budget used when a transaction has no `//! max-gas:` directive
pub const DEFAULT_MAX_GAS: u64 = 1_000_000;

/// Upper bound accepted for `max-gas`
pub const MAX_GAS_UNITS_BOUND: u64 = 1_000_000;

/// Extension of functional test files
pub const DEFAULT_FILE_EXTENSION: &str = "mvir";

/// Runtime configuration of the harness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Balance for `//! account:` entries that omit it
    pub default_account_balance: u64,
    /// Gas budget for transactions that omit `//! max-gas:`
    pub default_max_gas: u64,
    /// Gas price for transactions that omit `//! gas-price:`
    pub gas_unit_price: u64,
    /// Largest accepted `max-gas`
    pub max_gas_units_bound: u64,
    /// Ledger clock at genesis, in microseconds
    pub genesis_timestamp_usecs: u64,
    /// Files with this extension are picked up by suite discovery
    pub file_extension: String,
    /// Number of test files evaluated concurrently
    pub jobs: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            default_account_balance: DEFAULT_BALANCE,
            default_max_gas: DEFAULT_MAX_GAS,
            gas_unit_price: 0,
            max_gas_units_bound: MAX_GAS_UNITS_BOUND,
            genesis_timestamp_usecs: 0,
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
            jobs: 4,
        }
    }
}

impl HarnessConfig {
    /// Parse a configuration from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: HarnessConfig =
            serde_yaml::from_str(yaml).context("Failed to parse harness config YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid config: {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        if self.default_max_gas > self.max_gas_units_bound {
            anyhow::bail!(
                "default_max_gas {} exceeds max_gas_units_bound {}",
                self.default_max_gas,
                self.max_gas_units_bound
            );
        }
        if self.jobs == 0 {
            anyhow::bail!("jobs must be at least 1");
        }
        if self.file_extension.is_empty() {
            anyhow::bail!("file_extension cannot be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = HarnessConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.file_extension, "mvir");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = HarnessConfig::from_yaml("gas_unit_price: 2\njobs: 1\n").unwrap();
        assert_eq!(config.gas_unit_price, 2);
        assert_eq!(config.jobs, 1);
        assert_eq!(config.default_max_gas, DEFAULT_MAX_GAS);
    }

    #[test]
    fn test_invalid_gas_bound_rejected() {
        let yaml = "default_max_gas: 10\nmax_gas_units_bound: 5\n";
        assert!(HarnessConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_zero_jobs_rejected() {
        assert!(HarnessConfig::from_yaml("jobs: 0\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harness.yaml");
        std::fs::write(&path, "genesis_timestamp_usecs: 42\n").unwrap();
        let config = HarnessConfig::load(&path).unwrap();
        assert_eq!(config.genesis_timestamp_usecs, 42);
    }
}
