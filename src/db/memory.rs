//! In-process store with the same semantics as the PostgreSQL backend.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard,
};

use async_trait::async_trait;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    db::{
        models::{
            PricePoint, Resolution, SyncCheckpoint, VaultApy, VaultSample, VaultSnapshot,
        },
        VaultStore,
    },
    error::VaultError,
};

#[derive(Default)]
struct MemoryState {
    samples: Vec<VaultSample>,
    apys: Vec<VaultApy>,
    snapshots: Vec<VaultSnapshot>,
    snapshot_keys: FxHashSet<(Resolution, i64, String)>,
    checkpoints: FxHashMap<i64, SyncCheckpoint>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    sample_writes_failing: AtomicBool,
    snapshot_writes_failing: AtomicBool,
    checkpoints_failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make subsequent sample inserts fail with `StoreUnavailable`.
    pub fn set_sample_writes_failing(&self, failing: bool) {
        self.sample_writes_failing.store(failing, Ordering::SeqCst);
    }

    /// Make subsequent snapshot inserts fail with `StoreUnavailable`.
    pub fn set_snapshot_writes_failing(&self, failing: bool) {
        self.snapshot_writes_failing.store(failing, Ordering::SeqCst);
    }

    /// Make checkpoint reads and writes fail with `StoreUnavailable`.
    pub fn set_checkpoints_failing(&self, failing: bool) {
        self.checkpoints_failing.store(failing, Ordering::SeqCst);
    }

    /// Samples of `vault` in insertion order.
    pub fn samples(&self, vault: &str) -> Vec<VaultSample> {
        self.state()
            .samples
            .iter()
            .filter(|s| s.vault == vault)
            .cloned()
            .collect()
    }

    /// APY rows of `vault` in insertion order.
    pub fn apys(&self, vault: &str) -> Vec<VaultApy> {
        self.state()
            .apys
            .iter()
            .filter(|a| a.vault == vault)
            .cloned()
            .collect()
    }

    /// Snapshots of `res` in insertion order.
    pub fn snapshots(&self, res: Resolution) -> Vec<VaultSnapshot> {
        self.state()
            .snapshots
            .iter()
            .filter(|s| s.res == res)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl VaultStore for MemoryStore {
    async fn insert_sample(&self, sample: &VaultSample) -> Result<(), VaultError> {
        if self.sample_writes_failing.load(Ordering::SeqCst) {
            return Err(VaultError::store("sample writes disabled"));
        }

        self.state().samples.push(sample.clone());
        Ok(())
    }

    async fn latest_price_before(
        &self,
        vault: &str,
        before: i64,
    ) -> Result<Option<PricePoint>, VaultError> {
        let state = self.state();
        let latest = state
            .samples
            .iter()
            .filter(|s| s.vault == vault && s.timestamp < before)
            // Ties go to the highest block, then the latest insert
            .max_by_key(|s| (s.timestamp, s.block_number));

        Ok(latest.map(|s| PricePoint {
            block_number: s.block_number,
            timestamp: s.timestamp,
            share_price: Some(s.share_price),
        }))
    }

    async fn insert_apy(&self, apy: &VaultApy) -> Result<(), VaultError> {
        self.state().apys.push(apy.clone());
        Ok(())
    }

    async fn latest_snapshot_bucket(&self, res: Resolution) -> Result<Option<i64>, VaultError> {
        Ok(self
            .state()
            .snapshots
            .iter()
            .filter(|s| s.res == res)
            .map(|s| s.timestamp)
            .max())
    }

    async fn insert_snapshots(&self, snapshots: &[VaultSnapshot]) -> Result<u64, VaultError> {
        if self.snapshot_writes_failing.load(Ordering::SeqCst) {
            return Err(VaultError::store("snapshot writes disabled"));
        }

        let mut state = self.state();
        let mut written = 0;
        for snapshot in snapshots {
            let key = (snapshot.res, snapshot.timestamp, snapshot.vault.clone());
            if state.snapshot_keys.insert(key) {
                state.snapshots.push(snapshot.clone());
                written += 1;
            }
        }
        Ok(written)
    }

    async fn get_sync_checkpoint(
        &self,
        chain_id: i64,
    ) -> Result<Option<SyncCheckpoint>, VaultError> {
        if self.checkpoints_failing.load(Ordering::SeqCst) {
            return Err(VaultError::store("checkpoints disabled"));
        }

        Ok(self.state().checkpoints.get(&chain_id).cloned())
    }

    async fn set_sync_checkpoint(&self, checkpoint: &SyncCheckpoint) -> Result<(), VaultError> {
        if self.checkpoints_failing.load(Ordering::SeqCst) {
            return Err(VaultError::store("checkpoints disabled"));
        }

        self.state()
            .checkpoints
            .insert(checkpoint.chain_id, checkpoint.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{ApySet, VaultMetadata};

    fn sample(vault: &str, timestamp: i64, share_price: f64) -> VaultSample {
        sample_at(vault, timestamp as u64, timestamp, share_price)
    }

    fn sample_at(vault: &str, block_number: u64, timestamp: i64, share_price: f64) -> VaultSample {
        VaultSample::new(
            vault.to_string(),
            VaultMetadata::new("Vault".to_string(), "yV".to_string()),
            block_number,
            timestamp,
            share_price,
            1_000.0,
        )
    }

    #[tokio::test]
    async fn test_latest_price_before_is_strict_and_per_vault() {
        let store = MemoryStore::new();
        store.insert_sample(&sample("0xa", 100, 1.0)).await.unwrap();
        store.insert_sample(&sample("0xa", 200, 1.1)).await.unwrap();
        store.insert_sample(&sample("0xb", 150, 9.0)).await.unwrap();

        let point = store.latest_price_before("0xa", 200).await.unwrap().unwrap();
        assert_eq!(point.timestamp, 100);
        assert_eq!(point.share_price, Some(1.0));

        let point = store.latest_price_before("0xa", 201).await.unwrap().unwrap();
        assert_eq!(point.timestamp, 200);

        assert!(store.latest_price_before("0xa", 100).await.unwrap().is_none());
        assert!(store.latest_price_before("0xc", 1_000).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_price_before_breaks_timestamp_ties() {
        let store = MemoryStore::new();
        store.insert_sample(&sample_at("0xa", 11, 100, 1.1)).await.unwrap();
        store.insert_sample(&sample_at("0xa", 10, 100, 1.0)).await.unwrap();
        store.insert_sample(&sample_at("0xa", 11, 100, 1.2)).await.unwrap();

        let point = store.latest_price_before("0xa", 101).await.unwrap().unwrap();
        assert_eq!(point.block_number, 11);
        assert_eq!(point.share_price, Some(1.2));
    }

    #[tokio::test]
    async fn test_failing_switches() {
        let store = MemoryStore::new();
        store.set_sample_writes_failing(true);
        store.set_checkpoints_failing(true);

        let err = store.insert_sample(&sample("0xa", 100, 1.0)).await.unwrap_err();
        assert!(matches!(err, VaultError::StoreUnavailable(_)));
        assert!(store.get_sync_checkpoint(1).await.is_err());
        assert!(store
            .set_sync_checkpoint(&SyncCheckpoint::new(1, 100))
            .await
            .is_err());

        store.set_sample_writes_failing(false);
        store.set_checkpoints_failing(false);
        store.insert_sample(&sample("0xa", 100, 1.0)).await.unwrap();
        store.set_sync_checkpoint(&SyncCheckpoint::new(1, 100)).await.unwrap();
        assert_eq!(store.samples("0xa").len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_unique_key() {
        let store = MemoryStore::new();
        let apy = VaultApy::new(&sample("0xa", 3_700, 1.0), ApySet::default());
        let snapshot = VaultSnapshot::new(Resolution::Hourly, 3_600, &apy);

        assert_eq!(store.insert_snapshots(&[snapshot.clone()]).await.unwrap(), 1);
        assert_eq!(store.insert_snapshots(&[snapshot]).await.unwrap(), 0);
        assert_eq!(store.snapshots(Resolution::Hourly).len(), 1);
        assert_eq!(
            store.latest_snapshot_bucket(Resolution::Hourly).await.unwrap(),
            Some(3_600)
        );
        assert_eq!(store.latest_snapshot_bucket(Resolution::Daily).await.unwrap(), None);
    }
}
