use async_trait::async_trait;
use log::error;
use tokio_postgres::types::ToSql;

use crate::{
    db::{
        models::{
            PricePoint, Resolution, SyncCheckpoint, VaultApy, VaultSample, VaultSnapshot,
        },
        postgres::PostgresClient,
        VaultStore,
    },
    error::VaultError,
};

/// Sanitize a string for PostgreSQL by removing null bytes (0x00)
/// which are invalid in UTF-8 text columns
fn sanitize_string(s: &str) -> String {
    s.replace('\0', "")
}

#[async_trait]
impl VaultStore for PostgresClient {
    // ==================== SAMPLES ====================

    async fn insert_sample(&self, sample: &VaultSample) -> Result<(), VaultError> {
        let client = self.pool.get().await?;
        let query = r#"
            INSERT INTO vaults.samples (
                vault, name, symbol, block_number, timestamp, share_price, total_supply
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#;

        let block_number = sample.block_number as i64;
        client
            .execute(
                query,
                &[
                    &sample.vault,
                    &sanitize_string(&sample.name),
                    &sanitize_string(&sample.symbol),
                    &block_number,
                    &sample.timestamp,
                    &sample.share_price,
                    &sample.total_supply,
                ],
            )
            .await
            .map_err(|e| {
                error!(
                    "Failed to insert sample for {} at block {}: {:?}",
                    sample.vault, sample.block_number, e
                );
                e
            })?;

        Ok(())
    }

    async fn latest_price_before(
        &self,
        vault: &str,
        before: i64,
    ) -> Result<Option<PricePoint>, VaultError> {
        let client = self.pool.get().await?;
        let query = r#"
            SELECT block_number, timestamp, share_price
            FROM vaults.samples
            WHERE vault = $1 AND timestamp < $2
            ORDER BY timestamp DESC, block_number DESC, id DESC
            LIMIT 1
        "#;

        let row = client.query_opt(query, &[&vault, &before]).await?;

        Ok(row.map(|r| {
            let block_number: i64 = r.get("block_number");
            PricePoint {
                block_number: block_number as u64,
                timestamp: r.get("timestamp"),
                share_price: r.get("share_price"),
            }
        }))
    }

    // ==================== APYS ====================

    async fn insert_apy(&self, apy: &VaultApy) -> Result<(), VaultError> {
        let client = self.pool.get().await?;
        let query = r#"
            INSERT INTO vaults.vault_apys (
                vault, name, symbol, block_number, timestamp, share_price,
                apy_1d, apy_3d, apy_7d, apy_14d
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#;

        let block_number = apy.block_number as i64;
        client
            .execute(
                query,
                &[
                    &apy.vault,
                    &sanitize_string(&apy.name),
                    &sanitize_string(&apy.symbol),
                    &block_number,
                    &apy.timestamp,
                    &apy.share_price,
                    &apy.apy.apy_1d,
                    &apy.apy.apy_3d,
                    &apy.apy.apy_7d,
                    &apy.apy.apy_14d,
                ],
            )
            .await
            .map_err(|e| {
                error!(
                    "Failed to insert apy for {} at block {}: {:?}",
                    apy.vault, apy.block_number, e
                );
                e
            })?;

        Ok(())
    }

    // ==================== SNAPSHOTS ====================

    async fn latest_snapshot_bucket(&self, res: Resolution) -> Result<Option<i64>, VaultError> {
        let client = self.pool.get().await?;
        let query = "SELECT MAX(timestamp) AS bucket FROM vaults.snapshots WHERE res = $1";

        let row = client.query_one(query, &[&res.tag()]).await?;
        Ok(row.get("bucket"))
    }

    /// Batch insert with multi-row VALUES inside one transaction.
    /// Existing `(res, timestamp, vault)` keys are skipped.
    async fn insert_snapshots(&self, snapshots: &[VaultSnapshot]) -> Result<u64, VaultError> {
        if snapshots.is_empty() {
            return Ok(0);
        }

        const COLS_PER_ROW: usize = 12;
        const BATCH_SIZE: usize = 500;

        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        let mut written = 0;

        for chunk in snapshots.chunks(BATCH_SIZE) {
            // Build VALUES placeholders: ($1,...,$12), ($13,...,$24), ...
            let values_clauses: Vec<String> = chunk
                .iter()
                .enumerate()
                .map(|(i, _)| {
                    let start = i * COLS_PER_ROW + 1;
                    let placeholders: Vec<String> = (start..start + COLS_PER_ROW)
                        .map(|n| format!("${}", n))
                        .collect();
                    format!("({})", placeholders.join(", "))
                })
                .collect();

            let query = format!(
                r#"
                INSERT INTO vaults.snapshots (
                    res, vault, name, symbol, block_number, timestamp, share_price,
                    apy_1d, apy_3d, apy_7d, apy_14d, created_at
                ) VALUES {}
                ON CONFLICT (res, timestamp, vault) DO NOTHING
                "#,
                values_clauses.join(", ")
            );

            let tags: Vec<&'static str> = chunk.iter().map(|s| s.res.tag()).collect();
            let names: Vec<String> = chunk.iter().map(|s| sanitize_string(&s.name)).collect();
            let symbols: Vec<String> = chunk.iter().map(|s| sanitize_string(&s.symbol)).collect();
            let blocks: Vec<i64> = chunk.iter().map(|s| s.block_number as i64).collect();
            let created_at = chrono::Utc::now();

            let mut params: Vec<&(dyn ToSql + Sync)> =
                Vec::with_capacity(chunk.len() * COLS_PER_ROW);

            for (i, snapshot) in chunk.iter().enumerate() {
                params.push(&tags[i]);
                params.push(&snapshot.vault);
                params.push(&names[i]);
                params.push(&symbols[i]);
                params.push(&blocks[i]);
                params.push(&snapshot.timestamp);
                params.push(&snapshot.share_price);
                params.push(&snapshot.apy.apy_1d);
                params.push(&snapshot.apy.apy_3d);
                params.push(&snapshot.apy.apy_7d);
                params.push(&snapshot.apy.apy_14d);
                params.push(&created_at);
            }

            written += tx.execute(&query, &params).await.map_err(|e| {
                error!("Failed to batch insert {} snapshots: {:?}", chunk.len(), e);
                e
            })?;
        }

        tx.commit().await?;
        Ok(written)
    }

    // ==================== CHECKPOINTS ====================

    async fn get_sync_checkpoint(
        &self,
        chain_id: i64,
    ) -> Result<Option<SyncCheckpoint>, VaultError> {
        let client = self.pool.get().await?;
        let query = "SELECT chain_id, last_indexed_block, updated_at FROM vaults.sync_checkpoints WHERE chain_id = $1";

        let row = client.query_opt(query, &[&chain_id]).await?;

        Ok(row.map(|r| {
            let last_indexed_block: i64 = r.get("last_indexed_block");
            SyncCheckpoint {
                chain_id: r.get("chain_id"),
                last_indexed_block: last_indexed_block as u64,
                updated_at: r.get("updated_at"),
            }
        }))
    }

    async fn set_sync_checkpoint(&self, checkpoint: &SyncCheckpoint) -> Result<(), VaultError> {
        let client = self.pool.get().await?;
        let query = r#"
            INSERT INTO vaults.sync_checkpoints (chain_id, last_indexed_block, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (chain_id) DO UPDATE SET
                last_indexed_block = EXCLUDED.last_indexed_block,
                updated_at = EXCLUDED.updated_at
        "#;

        let last_indexed_block = checkpoint.last_indexed_block as i64;
        client
            .execute(
                query,
                &[&checkpoint.chain_id, &last_indexed_block, &checkpoint.updated_at],
            )
            .await
            .map_err(|e| {
                error!(
                    "Failed to update sync checkpoint for chain {}: {:?}",
                    checkpoint.chain_id, e
                );
                e
            })?;

        Ok(())
    }
}

