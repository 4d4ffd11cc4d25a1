#[allow(clippy::module_inception)]
mod config;

pub use self::config::{
    ApySettings, ChainSettings, IndexerSettings, PostgresSettings, Settings, VaultSettings,
};
