//! Time constants and bucket alignment.

pub const SECONDS_PER_HOUR: i64 = 60 * 60;
pub const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;

/// 365 days. Leap years are ignored for annualization.
pub const SECONDS_PER_YEAR: i64 = 365 * SECONDS_PER_DAY;

/// Floor-align `timestamp` to the start of its `period`-second bucket.
///
/// Uses Euclidean division so timestamps before the epoch still round down.
#[inline]
pub fn floor_to_bucket(timestamp: i64, period: i64) -> i64 {
    debug_assert!(period > 0);
    timestamp.div_euclid(period) * period
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_per_year() {
        assert_eq!(SECONDS_PER_YEAR, 31_536_000);
    }

    #[test]
    fn test_floor_to_bucket() {
        assert_eq!(floor_to_bucket(0, SECONDS_PER_HOUR), 0);
        assert_eq!(floor_to_bucket(3_599, SECONDS_PER_HOUR), 0);
        assert_eq!(floor_to_bucket(3_600, SECONDS_PER_HOUR), 3_600);
        assert_eq!(floor_to_bucket(1_700_003_723, SECONDS_PER_HOUR), 1_700_002_800);
        assert_eq!(floor_to_bucket(1_700_003_723, SECONDS_PER_DAY), 1_699_920_000);
    }

    #[test]
    fn test_floor_to_bucket_negative() {
        assert_eq!(floor_to_bucket(-1, SECONDS_PER_HOUR), -3_600);
    }
}
