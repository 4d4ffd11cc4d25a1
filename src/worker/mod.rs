pub mod apy_engine;
pub mod chain;
pub mod handler;
pub mod metadata_cache;
pub mod reader;
pub mod recorder;
pub mod snapshot_roller;
pub mod worker;

pub use apy_engine::{annualized_growth, ApyEngine};
pub use chain::ChainClient;
pub use handler::{BlockContext, BlockReport, VaultHandler};
pub use metadata_cache::MetadataCache;
pub use reader::{BlockSource, MetadataField, RawPriceReading, VaultReader};
pub use recorder::SeriesRecorder;
pub use snapshot_roller::SnapshotRoller;
pub use worker::{next_qualifying_block, BlockWorker};
