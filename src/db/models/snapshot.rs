use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ApySet, VaultApy};
use crate::utils::{floor_to_bucket, SECONDS_PER_DAY, SECONDS_PER_HOUR};

/// Snapshot resolution. The tag is stored in the `res` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "1h")]
    Hourly,
    #[serde(rename = "1d")]
    Daily,
}

impl Resolution {
    pub fn period_secs(&self) -> i64 {
        match self {
            Resolution::Hourly => SECONDS_PER_HOUR,
            Resolution::Daily => SECONDS_PER_DAY,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Resolution::Hourly => "1h",
            Resolution::Daily => "1d",
        }
    }

    /// Start of the bucket containing `timestamp`.
    pub fn bucket(&self, timestamp: i64) -> i64 {
        floor_to_bucket(timestamp, self.period_secs())
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Bucketed copy of a vault's APY metrics (PostgreSQL `vaults.snapshots`).
///
/// Population: written by the snapshot roller the first time a block lands in
/// a new hourly/daily bucket.
///
/// Query Patterns:
///   - "Get daily APY history for vault X over 90 days"
///   - "Get hourly share price for vault X over the last week"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultSnapshot {
    pub res: Resolution,
    pub vault: String,
    pub name: String,
    pub symbol: String,
    pub block_number: u64,
    /// Bucket start, not the block timestamp
    pub timestamp: i64,
    pub share_price: f64,
    pub apy: ApySet,
}

impl VaultSnapshot {
    pub fn new(res: Resolution, bucket: i64, metrics: &VaultApy) -> Self {
        Self {
            res,
            vault: metrics.vault.clone(),
            name: metrics.name.clone(),
            symbol: metrics.symbol.clone(),
            block_number: metrics.block_number,
            timestamp: bucket,
            share_price: metrics.share_price,
            apy: metrics.apy,
        }
    }
}
