use std::fmt;

use serde::{Deserialize, Serialize};

use super::VaultSample;
use crate::utils::SECONDS_PER_DAY;

/// Trailing APY window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Window {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "3d")]
    ThreeDays,
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "14d")]
    FourteenDays,
}

impl Window {
    pub const ALL: [Window; 4] = [
        Window::OneDay,
        Window::ThreeDays,
        Window::SevenDays,
        Window::FourteenDays,
    ];

    pub fn days(&self) -> i64 {
        match self {
            Window::OneDay => 1,
            Window::ThreeDays => 3,
            Window::SevenDays => 7,
            Window::FourteenDays => 14,
        }
    }

    pub fn seconds(&self) -> i64 {
        self.days() * SECONDS_PER_DAY
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d", self.days())
    }
}

/// APY per window. A window with insufficient history holds `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ApySet {
    pub apy_1d: f64,
    pub apy_3d: f64,
    pub apy_7d: f64,
    pub apy_14d: f64,
}

impl ApySet {
    /// Build from computed windows. Windows missing from `values` stay at `0.0`.
    pub fn from_windows(values: impl IntoIterator<Item = (Window, f64)>) -> Self {
        let mut set = Self::default();
        for (window, value) in values {
            match window {
                Window::OneDay => set.apy_1d = value,
                Window::ThreeDays => set.apy_3d = value,
                Window::SevenDays => set.apy_7d = value,
                Window::FourteenDays => set.apy_14d = value,
            }
        }
        set
    }

    pub fn get(&self, window: Window) -> f64 {
        match window {
            Window::OneDay => self.apy_1d,
            Window::ThreeDays => self.apy_3d,
            Window::SevenDays => self.apy_7d,
            Window::FourteenDays => self.apy_14d,
        }
    }
}

/// Derived APY metrics for one vault sample (PostgreSQL `vaults.vault_apys`).
///
/// One row per vault per processed block, never deduplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultApy {
    pub vault: String,
    pub name: String,
    pub symbol: String,
    pub block_number: u64,
    pub timestamp: i64,
    pub share_price: f64,
    pub apy: ApySet,
}

impl VaultApy {
    pub fn new(sample: &VaultSample, apy: ApySet) -> Self {
        Self {
            vault: sample.vault.clone(),
            name: sample.name.clone(),
            symbol: sample.symbol.clone(),
            block_number: sample.block_number,
            timestamp: sample.timestamp,
            share_price: sample.share_price,
            apy,
        }
    }
}
