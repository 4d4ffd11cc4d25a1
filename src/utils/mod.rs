//! Utility functions for the vault APY indexer.
//!
//! - [`conversion`] - Fixed-point U256 to f64 conversion, address normalization
//! - [`time`] - Period constants and bucket alignment

mod conversion;
mod time;

pub use conversion::{normalize_address, scaled_u256_to_f64};
pub use time::{floor_to_bucket, SECONDS_PER_DAY, SECONDS_PER_HOUR, SECONDS_PER_YEAR};
