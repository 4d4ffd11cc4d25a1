use config::{Config, ConfigError, File, FileFormat};
use serde::Deserialize;

use crate::{db::models::Window, utils::normalize_address};

/// PostgreSQL database connection configuration.
///
/// Used for storing:
/// - Raw share price samples
/// - Derived APY rows
/// - Hourly and daily snapshots
/// - Sync checkpoints
#[derive(Debug, Deserialize, Clone)]
pub struct PostgresSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

fn default_pool_size() -> usize {
    16
}

/// Chain the tracked vaults live on.
#[derive(Debug, Deserialize, Clone)]
pub struct ChainSettings {
    pub chain_id: i64,
    pub name: String,
    pub rpc_url: String,
}

/// Block cadence of the indexer.
///
/// Only blocks at `start_block + k * block_interval` are processed.
#[derive(Debug, Deserialize, Clone)]
pub struct IndexerSettings {
    pub start_block: u64,
    #[serde(default = "default_block_interval")]
    pub block_interval: u64,
    #[serde(default = "default_tip_poll_interval")]
    pub tip_poll_interval_milliseconds: u64,
}

fn default_block_interval() -> u64 {
    150
}

fn default_tip_poll_interval() -> u64 {
    2_000
}

/// A tracked vault. The vault is ignored until the processed block
/// reaches `activation_block`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct VaultSettings {
    pub address: String,
    pub activation_block: u64,
    /// Fixed-point decimals of `pricePerShare` and `totalSupply`
    #[serde(default = "default_vault_decimals")]
    pub decimals: u8,
}

fn default_vault_decimals() -> u8 {
    6
}

impl VaultSettings {
    pub fn new(address: &str, activation_block: u64, decimals: u8) -> Self {
        Self {
            address: normalize_address(address),
            activation_block,
            decimals,
        }
    }

    pub fn is_live_at(&self, block_number: u64) -> bool {
        block_number >= self.activation_block
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApySettings {
    #[serde(default = "default_windows")]
    pub windows: Vec<Window>,
}

impl Default for ApySettings {
    fn default() -> Self {
        Self {
            windows: default_windows(),
        }
    }
}

fn default_windows() -> Vec<Window> {
    Window::ALL.to_vec()
}

/// Root application configuration.
///
/// Loaded from `config.yaml` at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub postgres: PostgresSettings,
    pub chain: ChainSettings,
    pub indexer: IndexerSettings,
    #[serde(default)]
    pub vaults: Vec<VaultSettings>,
    #[serde(default)]
    pub apy: ApySettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config"))
            .build()?;

        Self::finish(s.try_deserialize()?)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?;

        Self::finish(s.try_deserialize()?)
    }

    fn finish(mut settings: Settings) -> Result<Self, ConfigError> {
        // Lowercase addresses for consistent comparisons
        for vault in settings.vaults.iter_mut() {
            vault.address = normalize_address(&vault.address);
        }

        if settings.indexer.block_interval == 0 {
            return Err(ConfigError::Message(
                "indexer.block_interval must be greater than 0".to_string(),
            ));
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
postgres:
  host: localhost
  port: 5432
  user: vaultapy
  password: secret
  database: vaultapy
chain:
  chain_id: 80001
  name: mumbai
  rpc_url: http://localhost:8545
indexer:
  start_block: 32887180
vaults:
  - address: "0x2a958665bC9A1680135241133569C7014230Cb21"
    activation_block: 86095723
apy:
  windows: ["1d", "7d"]
"#;

    #[test]
    fn test_settings_defaults_and_normalization() {
        let settings = Settings::from_yaml_str(YAML).unwrap();

        assert_eq!(settings.postgres.pool_size, 16);
        assert_eq!(settings.indexer.block_interval, 150);
        assert_eq!(settings.indexer.tip_poll_interval_milliseconds, 2_000);
        assert_eq!(settings.vaults.len(), 1);
        assert_eq!(
            settings.vaults[0].address,
            "0x2a958665bc9a1680135241133569c7014230cb21"
        );
        assert_eq!(settings.vaults[0].decimals, 6);
        assert_eq!(settings.apy.windows, vec![Window::OneDay, Window::SevenDays]);
    }

    #[test]
    fn test_zero_block_interval_rejected() {
        let yaml = YAML.replace("start_block: 32887180", "start_block: 1\n  block_interval: 0");
        assert!(Settings::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn test_vault_activation() {
        let vault = VaultSettings::new("0xABC", 100, 6);
        assert_eq!(vault.address, "0xabc");
        assert!(!vault.is_live_at(99));
        assert!(vault.is_live_at(100));
        assert!(vault.is_live_at(101));
    }
}
