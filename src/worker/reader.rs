use alloy::primitives::U256;
use async_trait::async_trait;

use crate::error::VaultError;

/// Vault fields that never change once the contract is deployed.
///
/// Only these are cached. The share price is always read fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataField {
    Name,
    Symbol,
}

impl MetadataField {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataField::Name => "name",
            MetadataField::Symbol => "symbol",
        }
    }
}

/// Raw fixed-point values read from a vault at a specific block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPriceReading {
    pub price_per_share: U256,
    pub total_supply: U256,
}

/// On-chain reads needed per vault.
#[async_trait]
pub trait VaultReader: Send + Sync {
    async fn read_metadata(&self, vault: &str, field: MetadataField) -> Result<String, VaultError>;

    /// Share price and supply as of `block_number`. Never cached.
    async fn read_share_price(
        &self,
        vault: &str,
        block_number: u64,
    ) -> Result<RawPriceReading, VaultError>;
}

/// Chain head and block header access for the block worker.
#[async_trait]
pub trait BlockSource: Send + Sync {
    async fn latest_block_number(&self) -> anyhow::Result<u64>;

    async fn block_timestamp(&self, block_number: u64) -> anyhow::Result<i64>;
}
