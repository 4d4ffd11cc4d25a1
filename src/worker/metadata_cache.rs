use std::future::Future;

use moka::future::Cache;

use crate::{
    db::models::VaultMetadata,
    error::VaultError,
    worker::reader::{MetadataField, VaultReader},
};

/// Read-through cache for immutable vault metadata.
///
/// Entries never expire: name and symbol are fixed at deployment. A failed
/// fetch is not cached, so the next block retries it.
#[derive(Clone)]
pub struct MetadataCache {
    cache: Cache<(String, MetadataField), String>,
}

impl MetadataCache {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_capacity).build(),
        }
    }

    /// Return the cached value or run `fetch` once and cache its success.
    /// Concurrent callers for the same key share a single fetch.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        vault: &str,
        field: MetadataField,
        fetch: F,
    ) -> Result<String, VaultError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, VaultError>>,
    {
        self.cache
            .try_get_with((vault.to_string(), field), fetch())
            .await
            .map_err(|e| match e.as_ref() {
                VaultError::ChainReadFailure {
                    vault,
                    field,
                    reason,
                } => VaultError::ChainReadFailure {
                    vault: vault.clone(),
                    field: *field,
                    reason: reason.clone(),
                },
                other => VaultError::chain_read(vault, field.as_str(), other),
            })
    }

    /// Name and symbol of `vault`, fetched through `reader` on a miss.
    pub async fn metadata(
        &self,
        reader: &dyn VaultReader,
        vault: &str,
    ) -> Result<VaultMetadata, VaultError> {
        let (name, symbol) = futures::try_join!(
            self.get_or_fetch(vault, MetadataField::Name, || {
                reader.read_metadata(vault, MetadataField::Name)
            }),
            self.get_or_fetch(vault, MetadataField::Symbol, || {
                reader.read_metadata(vault, MetadataField::Symbol)
            }),
        )?;

        Ok(VaultMetadata::new(name, symbol))
    }
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new(10_000)
    }
}
