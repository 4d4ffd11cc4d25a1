use async_trait::async_trait;

use crate::{
    db::models::{PricePoint, Resolution, SyncCheckpoint, VaultApy, VaultSample, VaultSnapshot},
    error::VaultError,
};

/// Persistence contract shared by the recorder, the APY engine and the snapshot roller.
///
/// Samples and APY rows are append-only. Snapshots are unique on
/// `(res, timestamp, vault)`: inserting an existing key is silently skipped.
#[async_trait]
pub trait VaultStore: Send + Sync {
    async fn insert_sample(&self, sample: &VaultSample) -> Result<(), VaultError>;

    /// Most recent sample of `vault` with `timestamp < before`.
    async fn latest_price_before(
        &self,
        vault: &str,
        before: i64,
    ) -> Result<Option<PricePoint>, VaultError>;

    async fn insert_apy(&self, apy: &VaultApy) -> Result<(), VaultError>;

    /// Latest bucket captured for `res`, across all vaults.
    async fn latest_snapshot_bucket(&self, res: Resolution) -> Result<Option<i64>, VaultError>;

    /// Bulk insert. Returns the number of rows actually written.
    async fn insert_snapshots(&self, snapshots: &[VaultSnapshot]) -> Result<u64, VaultError>;

    async fn get_sync_checkpoint(&self, chain_id: i64)
        -> Result<Option<SyncCheckpoint>, VaultError>;

    async fn set_sync_checkpoint(&self, checkpoint: &SyncCheckpoint) -> Result<(), VaultError>;
}
