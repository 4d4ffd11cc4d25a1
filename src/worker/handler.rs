use std::sync::Arc;

use futures::future::join_all;
use log::{error, info};

use crate::{
    config::VaultSettings,
    db::{
        models::{Resolution, VaultApy, VaultSample, Window},
        VaultStore,
    },
    error::VaultError,
    utils::scaled_u256_to_f64,
    worker::{
        apy_engine::ApyEngine, metadata_cache::MetadataCache, reader::VaultReader,
        recorder::SeriesRecorder, snapshot_roller::SnapshotRoller,
    },
};

/// Block handed to the handler by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockContext {
    pub number: u64,
    pub timestamp: i64,
}

impl BlockContext {
    pub fn new(number: u64, timestamp: i64) -> Self {
        Self { number, timestamp }
    }
}

/// Outcome of one block invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockReport {
    pub block_number: u64,
    /// Vaults whose sample and APY row were written
    pub recorded: Vec<String>,
    /// Vaults that failed and were left out of the snapshot round
    pub failed: Vec<String>,
    pub hourly_snapshots: u64,
    pub daily_snapshots: u64,
}

/// Runs record, derive and snapshot for every live vault at a block.
pub struct VaultHandler {
    vaults: Vec<VaultSettings>,
    reader: Arc<dyn VaultReader>,
    metadata: MetadataCache,
    recorder: SeriesRecorder,
    engine: ApyEngine,
    roller: SnapshotRoller,
}

impl VaultHandler {
    pub fn new(
        vaults: Vec<VaultSettings>,
        windows: &[Window],
        reader: Arc<dyn VaultReader>,
        store: Arc<dyn VaultStore>,
    ) -> Self {
        Self {
            vaults,
            reader,
            metadata: MetadataCache::default(),
            recorder: SeriesRecorder::new(store.clone()),
            engine: ApyEngine::new(store.clone(), windows),
            roller: SnapshotRoller::new(store),
        }
    }

    pub fn vaults(&self) -> &[VaultSettings] {
        &self.vaults
    }

    /// Process every vault live at `block`, then roll hourly and daily snapshots.
    ///
    /// A failing vault is logged and excluded from the snapshot round. A roller
    /// failure fails the invocation after APY rows are already stored. When every
    /// live vault failed on the store the block returns `BlockNotRecorded`.
    pub async fn handle_block(&self, block: BlockContext) -> Result<BlockReport, VaultError> {
        let live: Vec<&VaultSettings> = self
            .vaults
            .iter()
            .filter(|v| v.is_live_at(block.number))
            .collect();

        let results = join_all(live.iter().map(|vault| self.process_vault(vault, block))).await;

        let mut report = BlockReport {
            block_number: block.number,
            ..Default::default()
        };
        let mut metrics: Vec<VaultApy> = Vec::with_capacity(results.len());
        let mut store_failures = 0;
        let mut last_store_error = None;

        for (vault, result) in live.iter().zip(results) {
            match result {
                Ok(apy) => {
                    report.recorded.push(vault.address.clone());
                    metrics.push(apy);
                },
                Err(e) => {
                    error!("Block {}: skipping vault {}: {}", block.number, vault.address, e);
                    report.failed.push(vault.address.clone());
                    if matches!(e, VaultError::StoreUnavailable(_)) {
                        store_failures += 1;
                        last_store_error = Some(e);
                    }
                },
            }
        }

        // Store outage: nothing landed for this block, so it must be retried
        if metrics.is_empty() && store_failures == report.failed.len() {
            if let Some(source) = last_store_error {
                return Err(VaultError::BlockNotRecorded {
                    block: block.number,
                    source: Box::new(source),
                });
            }
        }

        report.hourly_snapshots = self
            .roller
            .maybe_snapshot(Resolution::Hourly, block.timestamp, &metrics)
            .await?;
        report.daily_snapshots = self
            .roller
            .maybe_snapshot(Resolution::Daily, block.timestamp, &metrics)
            .await?;

        info!(
            "Block {}: {} vaults recorded, {} failed",
            block.number,
            report.recorded.len(),
            report.failed.len()
        );

        Ok(report)
    }

    async fn process_vault(
        &self,
        vault: &VaultSettings,
        block: BlockContext,
    ) -> Result<VaultApy, VaultError> {
        let (metadata, reading) = futures::try_join!(
            self.metadata.metadata(self.reader.as_ref(), &vault.address),
            self.reader.read_share_price(&vault.address, block.number),
        )?;

        let share_price = scaled_u256_to_f64(reading.price_per_share, vault.decimals)
            .ok_or_else(|| {
                VaultError::chain_read(&vault.address, "pricePerShare", "unparseable value")
            })?;
        let total_supply = scaled_u256_to_f64(reading.total_supply, vault.decimals)
            .ok_or_else(|| {
                VaultError::chain_read(&vault.address, "totalSupply", "unparseable value")
            })?;

        let sample = VaultSample::new(
            vault.address.clone(),
            metadata,
            block.number,
            block.timestamp,
            share_price,
            total_supply,
        );

        self.recorder.append(&sample).await?;
        self.engine.derive(&sample).await
    }
}
