use serde::{Deserialize, Serialize};

/// Immutable vault metadata, read once per vault and cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultMetadata {
    pub name: String,
    pub symbol: String,
}

impl VaultMetadata {
    pub fn new(name: String, symbol: String) -> Self {
        Self { name, symbol }
    }
}

/// One observation of a vault's share price at a block (PostgreSQL `vaults.samples`).
///
/// Append-only. Never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultSample {
    // Tags
    pub vault: String,
    pub name: String,
    pub symbol: String,
    // Position
    pub block_number: u64,
    pub timestamp: i64,
    // Fields
    pub share_price: f64,
    pub total_supply: f64,
}

impl VaultSample {
    pub fn new(
        vault: String,
        metadata: VaultMetadata,
        block_number: u64,
        timestamp: i64,
        share_price: f64,
        total_supply: f64,
    ) -> Self {
        Self {
            vault,
            name: metadata.name,
            symbol: metadata.symbol,
            block_number,
            timestamp,
            share_price,
            total_supply,
        }
    }
}

/// Result of a historical price lookup.
///
/// Rows written by older indexer versions may lack a share price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub block_number: u64,
    pub timestamp: i64,
    pub share_price: Option<f64>,
}
