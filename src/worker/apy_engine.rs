use std::sync::Arc;

use futures::future::try_join_all;
use log::warn;

use crate::{
    db::{
        models::{ApySet, VaultApy, VaultSample, Window},
        VaultStore,
    },
    error::VaultError,
    utils::SECONDS_PER_YEAR,
};

/// Derives trailing APYs from a vault's sample history.
///
/// Each window looks up the newest sample strictly older than
/// `timestamp - window` and compounds the growth ratio to a year:
///
/// ```text
/// apy = (current / historical) ^ (SECONDS_PER_YEAR / window_secs) - 1
/// ```
#[derive(Clone)]
pub struct ApyEngine {
    store: Arc<dyn VaultStore>,
    windows: Vec<Window>,
}

impl ApyEngine {
    pub fn new(store: Arc<dyn VaultStore>, windows: &[Window]) -> Self {
        let mut unique: Vec<Window> = Vec::with_capacity(windows.len());
        for window in windows {
            if !unique.contains(window) {
                unique.push(*window);
            }
        }

        Self {
            store,
            windows: unique,
        }
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    /// Compute every configured window for `current`, persist the row and return it.
    pub async fn derive(&self, current: &VaultSample) -> Result<VaultApy, VaultError> {
        let values = try_join_all(
            self.windows
                .iter()
                .map(|window| self.window_apy(current, *window)),
        )
        .await?;

        let apy = VaultApy::new(
            current,
            ApySet::from_windows(self.windows.iter().copied().zip(values)),
        );

        self.store.insert_apy(&apy).await?;
        Ok(apy)
    }

    async fn window_apy(&self, current: &VaultSample, window: Window) -> Result<f64, VaultError> {
        let from = current.timestamp - window.seconds();

        let historical = match self.store.latest_price_before(&current.vault, from).await? {
            Some(point) => match point.share_price {
                Some(price) => price,
                None => return Ok(0.0),
            },
            None => return Ok(0.0),
        };

        match annualized_growth(&current.vault, window, current.share_price, historical) {
            Ok(apy) => Ok(apy),
            Err(e @ (VaultError::DivisionByZero { .. } | VaultError::NonFiniteApy { .. })) => {
                warn!("{} (block {}), reporting 0", e, current.block_number);
                Ok(0.0)
            },
            Err(e) => Err(e),
        }
    }
}

/// Annualized compound growth from `historical` to `current` over `window`.
pub fn annualized_growth(
    vault: &str,
    window: Window,
    current: f64,
    historical: f64,
) -> Result<f64, VaultError> {
    if historical == 0.0 {
        return Err(VaultError::DivisionByZero {
            vault: vault.to_string(),
            window,
        });
    }

    let exponent = SECONDS_PER_YEAR as f64 / window.seconds() as f64;
    let apy = (current / historical).powf(exponent) - 1.0;

    if !apy.is_finite() {
        return Err(VaultError::NonFiniteApy {
            vault: vault.to_string(),
            window,
        });
    }

    Ok(apy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{models::VaultMetadata, MemoryStore},
        utils::SECONDS_PER_DAY,
    };

    const VAULT: &str = "0xa";

    fn sample(timestamp: i64, share_price: f64) -> VaultSample {
        VaultSample::new(
            VAULT.to_string(),
            VaultMetadata::new("Vault A".to_string(), "yA".to_string()),
            timestamp as u64,
            timestamp,
            share_price,
            1_000.0,
        )
    }

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * b.abs().max(1.0)
    }

    #[test]
    fn test_annualized_growth_formula() {
        let apy = annualized_growth(VAULT, Window::OneDay, 1.1, 1.0).unwrap();
        assert!(approx_eq(apy, 1.1f64.powf(365.0) - 1.0));

        let apy = annualized_growth(VAULT, Window::SevenDays, 1.0, 1.0).unwrap();
        assert_eq!(apy, 0.0);
    }

    #[test]
    fn test_annualized_growth_guards() {
        let err = annualized_growth(VAULT, Window::OneDay, 1.0, 0.0).unwrap_err();
        assert!(matches!(err, VaultError::DivisionByZero { window: Window::OneDay, .. }));

        let err = annualized_growth(VAULT, Window::OneDay, 1e300, 1e-300).unwrap_err();
        assert!(matches!(err, VaultError::NonFiniteApy { .. }));
    }

    #[tokio::test]
    async fn test_empty_history_yields_zero_for_every_window() {
        let store = Arc::new(MemoryStore::new());
        let engine = ApyEngine::new(store.clone(), &Window::ALL);

        let apy = engine.derive(&sample(30 * SECONDS_PER_DAY, 1.5)).await.unwrap();

        assert_eq!(apy.apy, ApySet::default());
        assert_eq!(store.apys(VAULT).len(), 1);
    }

    #[tokio::test]
    async fn test_one_day_growth() {
        let store = Arc::new(MemoryStore::new());
        let now = 10 * SECONDS_PER_DAY;
        store
            .insert_sample(&sample(now - SECONDS_PER_DAY - 1, 1.0))
            .await
            .unwrap();

        let engine = ApyEngine::new(store.clone(), &Window::ALL);
        let apy = engine.derive(&sample(now, 1.1)).await.unwrap();

        assert!(approx_eq(apy.apy.apy_1d, 1.1f64.powf(365.0) - 1.0));
        assert_eq!(apy.apy.apy_3d, 0.0);
        assert_eq!(apy.apy.apy_7d, 0.0);
        assert_eq!(apy.apy.apy_14d, 0.0);
    }

    #[tokio::test]
    async fn test_sample_exactly_at_window_edge_is_excluded() {
        let store = Arc::new(MemoryStore::new());
        let now = 10 * SECONDS_PER_DAY;
        store
            .insert_sample(&sample(now - SECONDS_PER_DAY, 1.0))
            .await
            .unwrap();

        let engine = ApyEngine::new(store, &[Window::OneDay]);
        let apy = engine.derive(&sample(now, 1.1)).await.unwrap();

        assert_eq!(apy.apy.apy_1d, 0.0);
    }

    #[tokio::test]
    async fn test_each_window_uses_its_own_history() {
        let store = Arc::new(MemoryStore::new());
        let now = 20 * SECONDS_PER_DAY;
        let history = [(15, 1.1), (8, 1.2), (4, 1.4), (2, 1.5)];
        for (days_ago, price) in history {
            store
                .insert_sample(&sample(now - days_ago * SECONDS_PER_DAY, price))
                .await
                .unwrap();
        }

        let engine = ApyEngine::new(store, &Window::ALL);
        let apy = engine.derive(&sample(now, 1.6)).await.unwrap();

        // Newest row strictly older than each window start
        for (window, historical) in [
            (Window::OneDay, 1.5),
            (Window::ThreeDays, 1.4),
            (Window::SevenDays, 1.2),
            (Window::FourteenDays, 1.1),
        ] {
            let expected = (1.6f64 / historical).powf(365.0 / window.days() as f64) - 1.0;
            assert!(approx_eq(apy.apy.get(window), expected), "{window}");
        }
    }

    #[tokio::test]
    async fn test_zero_historical_price_only_affects_its_window() {
        let store = Arc::new(MemoryStore::new());
        let now = 20 * SECONDS_PER_DAY;
        // Only the 1d window lands on the zero price
        let history = [(15, 1.0), (8, 1.05), (4, 1.1), (2, 0.0)];
        for (days_ago, price) in history {
            store
                .insert_sample(&sample(now - days_ago * SECONDS_PER_DAY, price))
                .await
                .unwrap();
        }

        let engine = ApyEngine::new(store.clone(), &Window::ALL);
        let apy = engine.derive(&sample(now, 1.2)).await.unwrap();

        assert_eq!(apy.apy.apy_1d, 0.0);
        for (window, historical) in [
            (Window::ThreeDays, 1.1),
            (Window::SevenDays, 1.05),
            (Window::FourteenDays, 1.0),
        ] {
            let expected = (1.2f64 / historical).powf(365.0 / window.days() as f64) - 1.0;
            assert!(approx_eq(apy.apy.get(window), expected), "{window}");
        }
    }

    #[tokio::test]
    async fn test_three_day_series_with_one_day_window() {
        let store = Arc::new(MemoryStore::new());
        let engine = ApyEngine::new(store.clone(), &[Window::OneDay]);
        let start = 1_700_000_000;
        let prices = [1.00, 1.01, 1.02];

        let mut derived = Vec::new();
        for (day, price) in prices.iter().enumerate() {
            let current = sample(start + day as i64 * SECONDS_PER_DAY, *price);
            store.insert_sample(&current).await.unwrap();
            derived.push(engine.derive(&current).await.unwrap());
        }

        // Day 2 sits exactly on the one-day edge of day 1, which is excluded
        assert_eq!(derived[0].apy.apy_1d, 0.0);
        assert_eq!(derived[1].apy.apy_1d, 0.0);
        // Day 3 compares against day 1
        assert!(approx_eq(derived[2].apy.apy_1d, (1.02f64 / 1.00).powf(365.0) - 1.0));
        assert_eq!(derived[2].apy.apy_3d, 0.0);
        assert_eq!(store.apys(VAULT).len(), 3);
    }

    #[test]
    fn test_windows_are_deduplicated() {
        let store = Arc::new(MemoryStore::new());
        let engine = ApyEngine::new(store, &[Window::OneDay, Window::OneDay, Window::SevenDays]);
        assert_eq!(engine.windows(), &[Window::OneDay, Window::SevenDays]);
    }
}
