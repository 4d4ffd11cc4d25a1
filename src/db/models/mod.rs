mod checkpoint;
mod sample;
mod snapshot;
mod vault_apy;

pub use checkpoint::SyncCheckpoint;
pub use sample::{PricePoint, VaultMetadata, VaultSample};
pub use snapshot::{Resolution, VaultSnapshot};
pub use vault_apy::{ApySet, VaultApy, Window};
