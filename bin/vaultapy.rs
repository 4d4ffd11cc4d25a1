use std::sync::Arc;

use anyhow::Context;
use jemallocator::Jemalloc;
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use vaultapy::{db::connect_postgres, BlockWorker, ChainClient, Settings, VaultHandler};

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .context("Failed to initialize logger")?;

    // Load configuration
    let settings =
        Settings::new().context("Failed to load config.yaml. Please ensure it exists and is valid")?;

    let store = Arc::new(
        connect_postgres(settings.postgres.clone())
            .await
            .context("Failed to initialize database connection")?,
    );

    let chain = Arc::new(
        ChainClient::new(&settings.chain.rpc_url).context("Failed to create chain client")?,
    );

    let handler = VaultHandler::new(
        settings.vaults.clone(),
        &settings.apy.windows,
        chain.clone(),
        store.clone(),
    );

    let worker = BlockWorker::new(&settings, chain, store, handler);

    let cancellation_token = CancellationToken::new();
    let worker_token = cancellation_token.child_token();
    let worker_handle = tokio::spawn(async move {
        if let Err(e) = worker.run(worker_token).await {
            error!("Block worker failed: {:#}", e);
        }
    });

    info!(
        "Block worker started for {} ({} vaults)",
        settings.chain.name,
        settings.vaults.len()
    );

    #[cfg(unix)]
    let mut sigterm_stream = {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?
    };

    // Set up graceful shutdown signal handler
    info!("Indexer running. Press Ctrl+C to stop.");

    #[cfg(unix)]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
            _ = sigterm_stream.recv() => {
                info!("Received SIGTERM, exiting gracefully...");
            },
        };
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
        };
    }

    cancellation_token.cancel();

    // Let the in-flight block finish before exiting
    info!("Waiting for block worker to stop...");
    let _ = worker_handle.await;

    info!("Block worker stopped");
    Ok(())
}
