use std::sync::Arc;

use crate::{
    db::{models::VaultSample, VaultStore},
    error::VaultError,
};

/// Append-only writer for raw vault samples.
#[derive(Clone)]
pub struct SeriesRecorder {
    store: Arc<dyn VaultStore>,
}

impl SeriesRecorder {
    pub fn new(store: Arc<dyn VaultStore>) -> Self {
        Self { store }
    }

    /// Validate `sample` and write exactly one row for it.
    pub async fn append(&self, sample: &VaultSample) -> Result<(), VaultError> {
        validate(sample)?;
        self.store.insert_sample(sample).await
    }
}

fn validate(sample: &VaultSample) -> Result<(), VaultError> {
    let invalid = |reason: String| VaultError::InvalidSample {
        vault: sample.vault.clone(),
        reason,
    };

    if sample.timestamp < 0 {
        return Err(invalid(format!("negative timestamp {}", sample.timestamp)));
    }
    if !sample.share_price.is_finite() || sample.share_price < 0.0 {
        return Err(invalid(format!("share price {}", sample.share_price)));
    }
    if !sample.total_supply.is_finite() || sample.total_supply < 0.0 {
        return Err(invalid(format!("total supply {}", sample.total_supply)));
    }

    Ok(())
}
