use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::{
    config::Settings,
    db::{models::SyncCheckpoint, VaultStore},
    error::VaultError,
    worker::{
        handler::{BlockContext, VaultHandler},
        reader::BlockSource,
    },
};

/// Interval for logging progress updates (10 seconds)
const PROGRESS_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Sequential block scheduler for one chain.
///
/// Walks qualifying blocks (`start_block + k * block_interval`) past the stored
/// checkpoint and hands each one to the [`VaultHandler`]. Only one block is in
/// flight at a time, which makes this the single writer of snapshot watermarks.
pub struct BlockWorker {
    chain_id: i64,
    source: Arc<dyn BlockSource>,
    store: Arc<dyn VaultStore>,
    handler: VaultHandler,
    start_block: u64,
    block_interval: u64,
    tip_poll_interval: Duration,
}

impl BlockWorker {
    pub fn new(
        settings: &Settings,
        source: Arc<dyn BlockSource>,
        store: Arc<dyn VaultStore>,
        handler: VaultHandler,
    ) -> Self {
        Self {
            chain_id: settings.chain.chain_id,
            source,
            store,
            handler,
            start_block: settings.indexer.start_block,
            block_interval: settings.indexer.block_interval,
            tip_poll_interval: Duration::from_millis(
                settings.indexer.tip_poll_interval_milliseconds,
            ),
        }
    }

    pub async fn run(&self, cancellation_token: CancellationToken) -> anyhow::Result<()> {
        info!(
            "Block worker for chain {} tracking {} vaults every {} blocks",
            self.chain_id,
            self.handler.vaults().len(),
            self.block_interval
        );

        let mut last_indexed = match self.store.get_sync_checkpoint(self.chain_id).await {
            Ok(checkpoint) => checkpoint.map(|c| c.last_indexed_block),
            Err(e) => {
                warn!(
                    "Failed to fetch checkpoint for chain {}: {:?}. Starting from block {}.",
                    self.chain_id, e, self.start_block
                );
                None
            },
        };

        loop {
            if cancellation_token.is_cancelled() {
                info!(
                    "Block worker for chain {} received cancellation signal",
                    self.chain_id
                );
                break;
            }

            match self.source.latest_block_number().await {
                Ok(tip) => {
                    let next = next_qualifying_block(last_indexed, self.start_block, self.block_interval);
                    if let Some(done) = self.process_range(next, tip, &cancellation_token).await {
                        last_indexed = Some(done);
                    }
                },
                Err(e) => warn!("Chain {}: failed to fetch tip: {:?}", self.chain_id, e),
            }

            tokio::select! {
                _ = cancellation_token.cancelled() => {},
                _ = tokio::time::sleep(self.tip_poll_interval) => {},
            }
        }

        Ok(())
    }

    /// Handle qualifying blocks from `next` up to `tip`.
    /// Returns the last block handled and checkpointed, if any.
    ///
    /// Stops at the first block whose timestamp cannot be fetched, whose data
    /// could not be written at all, or whose checkpoint write fails. That block
    /// is handled again on the next call.
    pub async fn process_range(
        &self,
        mut next: u64,
        tip: u64,
        cancellation_token: &CancellationToken,
    ) -> Option<u64> {
        let mut last_handled = None;
        let mut last_progress_log = Instant::now();

        while next <= tip {
            if cancellation_token.is_cancelled() {
                break;
            }

            let timestamp = match self.source.block_timestamp(next).await {
                Ok(ts) => ts,
                Err(e) => {
                    // Retried on the next poll
                    warn!("Chain {}: failed to fetch block {}: {:?}", self.chain_id, next, e);
                    break;
                },
            };

            match self.handler.handle_block(BlockContext::new(next, timestamp)).await {
                Ok(_) => {},
                Err(e @ VaultError::BlockNotRecorded { .. }) => {
                    // Store is down, retry the same block on the next poll
                    warn!("Chain {}: {}", self.chain_id, e);
                    break;
                },
                Err(e) => error!("Chain {}: block {} failed: {}", self.chain_id, next, e),
            }

            let checkpoint = SyncCheckpoint::new(self.chain_id, next);
            if let Err(e) = self.store.set_sync_checkpoint(&checkpoint).await {
                warn!(
                    "Failed to update checkpoint for chain {} at block {}: {:?}",
                    self.chain_id, next, e
                );
                break;
            }

            last_handled = Some(next);

            if last_progress_log.elapsed() >= PROGRESS_LOG_INTERVAL {
                info!("Chain {} synced to block {} (tip {})", self.chain_id, next, tip);
                last_progress_log = Instant::now();
            }

            next += self.block_interval;
        }

        last_handled
    }
}

/// First qualifying block after `last_indexed`.
///
/// Qualifying blocks are `start + k * interval`. A checkpoint that is off the
/// grid (e.g. the interval changed) snaps forward to the next grid block.
pub fn next_qualifying_block(last_indexed: Option<u64>, start: u64, interval: u64) -> u64 {
    let interval = interval.max(1);
    match last_indexed {
        None => start,
        Some(last) if last < start => start,
        Some(last) => start + ((last - start) / interval + 1) * interval,
    }
}
