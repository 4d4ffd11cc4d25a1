pub mod abis;
pub mod config;
pub mod db;
pub mod error;
pub mod utils;
pub mod worker;

pub use crate::config::Settings;
pub use db::{MemoryStore, PostgresClient, VaultStore};
pub use error::VaultError;
pub use worker::{
    ApyEngine, BlockContext, BlockReport, BlockSource, BlockWorker, ChainClient, MetadataCache,
    SeriesRecorder, SnapshotRoller, VaultHandler, VaultReader,
};
