use log::info;

use crate::config::PostgresSettings;

pub mod memory;
pub mod models;
pub mod postgres;
mod store;

pub use memory::MemoryStore;
pub use postgres::PostgresClient;
pub use store::VaultStore;

/// Connect to PostgreSQL and apply `schema/postgres.sql`.
///
/// PostgreSQL holds every table: samples, APYs, snapshots and checkpoints.
pub async fn connect_postgres(settings: PostgresSettings) -> anyhow::Result<PostgresClient> {
    let postgres = PostgresClient::new(settings).await?;

    // Run migrations
    postgres.migrate().await?;

    info!("PostgreSQL store ready");
    Ok(postgres)
}
