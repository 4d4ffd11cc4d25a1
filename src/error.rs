use thiserror::Error;

use crate::db::models::Window;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while recording samples, deriving APYs and rolling snapshots.
///
/// `DivisionByZero` and `NonFiniteApy` never leave the APY engine: they are
/// logged and the affected window is reported as `0`.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] BoxError),

    #[error("chain read failed for {vault} ({field}): {reason}")]
    ChainReadFailure {
        vault: String,
        field: &'static str,
        reason: String,
    },

    #[error("historical share price is zero for {vault} over {window} window")]
    DivisionByZero { vault: String, window: Window },

    #[error("non-finite apy for {vault} over {window} window")]
    NonFiniteApy { vault: String, window: Window },

    #[error("invalid sample for {vault}: {reason}")]
    InvalidSample { vault: String, reason: String },

    /// Every live vault failed on the store, so nothing was written for the block.
    #[error("block {block} not recorded: {source}")]
    BlockNotRecorded {
        block: u64,
        #[source]
        source: Box<VaultError>,
    },
}

impl VaultError {
    pub fn chain_read(vault: &str, field: &'static str, reason: impl ToString) -> Self {
        VaultError::ChainReadFailure {
            vault: vault.to_string(),
            field,
            reason: reason.to_string(),
        }
    }

    pub fn store(err: impl Into<BoxError>) -> Self {
        VaultError::StoreUnavailable(err.into())
    }
}

impl From<tokio_postgres::Error> for VaultError {
    fn from(err: tokio_postgres::Error) -> Self {
        VaultError::store(err)
    }
}

impl From<deadpool_postgres::PoolError> for VaultError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        VaultError::store(err)
    }
}
