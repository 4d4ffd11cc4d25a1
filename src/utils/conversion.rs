//! Fixed-point conversions for on-chain vault values.
//!
//! `pricePerShare` and `totalSupply` come back as integers scaled by
//! `10^decimals`. They are rescaled as exact decimals before landing in `f64`.

use alloy::primitives::U256;
use bigdecimal::BigDecimal;
use num_bigint::{BigInt, Sign};
use num_traits::ToPrimitive;

/// Interpret `raw` as a fixed-point number with `decimals` fractional digits.
///
/// Returns `None` when the value does not fit a finite `f64`.
///
/// ```ignore
/// assert_eq!(scaled_u256_to_f64(U256::from(1_050_000u64), 6), Some(1.05));
/// ```
pub fn scaled_u256_to_f64(raw: U256, decimals: u8) -> Option<f64> {
    let digits = BigInt::from_bytes_be(Sign::Plus, &raw.to_be_bytes::<32>());
    let value = BigDecimal::new(digits, i64::from(decimals)).to_f64()?;

    value.is_finite().then_some(value)
}

/// Lowercase an address and make sure it carries the `0x` prefix.
pub fn normalize_address(address: &str) -> String {
    let trimmed = address.trim().to_lowercase();
    if trimmed.starts_with("0x") {
        trimmed
    } else {
        format!("0x{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_six_decimal_share_price() {
        let one = scaled_u256_to_f64(U256::from(1_000_000u64), 6).unwrap();
        let grown = scaled_u256_to_f64(U256::from(1_010_000u64), 6).unwrap();
        let zero = scaled_u256_to_f64(U256::ZERO, 6).unwrap();

        assert!((one - 1.0).abs() < 1e-12);
        assert!((grown - 1.01).abs() < 1e-12);
        assert_eq!(zero, 0.0);
    }

    #[test]
    fn test_zero_decimals_passthrough() {
        let value = scaled_u256_to_f64(U256::from(42u64), 0).unwrap();
        assert!((value - 42.0).abs() < 1e-12);
    }

    #[test]
    fn test_large_value_keeps_magnitude() {
        // 1e30 raw units at 18 decimals = 1e12
        let raw = U256::from(10u64).pow(U256::from(30u64));
        let value = scaled_u256_to_f64(raw, 18).unwrap();
        assert!((value - 1e12).abs() < 1.0);
    }

    #[test]
    fn test_max_value_is_finite() {
        let value = scaled_u256_to_f64(U256::MAX, 0).unwrap();
        assert!(value > 1e77);
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address(" 0xABCdef "), "0xabcdef");
        assert_eq!(normalize_address("ABCDEF"), "0xabcdef");
    }
}
