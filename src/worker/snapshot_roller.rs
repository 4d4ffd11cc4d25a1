use std::sync::Arc;

use log::{debug, info};

use crate::{
    db::{
        models::{Resolution, VaultApy, VaultSnapshot},
        VaultStore,
    },
    error::VaultError,
};

/// Captures one snapshot per vault the first time a block lands in a new bucket.
///
/// The watermark is the newest bucket stored for a resolution across all
/// vaults. It only moves forward.
#[derive(Clone)]
pub struct SnapshotRoller {
    store: Arc<dyn VaultStore>,
}

impl SnapshotRoller {
    pub fn new(store: Arc<dyn VaultStore>) -> Self {
        Self { store }
    }

    /// Write snapshots for the bucket containing `now` unless it is already captured.
    /// Returns the number of rows written.
    pub async fn maybe_snapshot(
        &self,
        res: Resolution,
        now: i64,
        metrics: &[VaultApy],
    ) -> Result<u64, VaultError> {
        if metrics.is_empty() {
            return Ok(0);
        }

        let bucket = res.bucket(now);
        let last_bucket = self
            .store
            .latest_snapshot_bucket(res)
            .await?
            .unwrap_or(bucket - res.period_secs());

        if last_bucket >= bucket {
            debug!("{} bucket {} already captured", res, bucket);
            return Ok(0);
        }

        let snapshots: Vec<VaultSnapshot> = metrics
            .iter()
            .map(|m| VaultSnapshot::new(res, bucket, m))
            .collect();

        let written = self.store.insert_snapshots(&snapshots).await?;
        info!(
            "Captured {} {} snapshots for bucket {}",
            written, res, bucket
        );

        Ok(written)
    }
}
