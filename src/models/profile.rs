use serde::{Deserialize, Serialize};

use crate::config::{Price, PriceRange};

/// One bin of the volume histogram. Built fresh per profile computation and
/// never mutated afterwards; `rank` stays 0 until the HVN engine ranks a copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub index: usize,
    pub low: f64,
    pub high: f64,
    pub center: f64,
    pub volume: f64,
    pub percent_of_total: f64,
    pub rank: u8,
}

impl PriceLevel {
    pub fn contains(&self, price: f64) -> bool {
        self.low <= price && price <= self.high
    }
}

/// Result of one volume-profile build. Convenience lookups are functions over
/// this value so concurrent callers never share hidden engine state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VolumeProfileResult {
    /// Non-empty levels in ascending price order
    pub levels: Vec<PriceLevel>,
    /// Width of one level (0.0 for a degenerate build)
    pub hvn_unit: f64,
    pub price_range: PriceRange<Price>,
}

impl VolumeProfileResult {
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Top `n` levels by volume share, highest first.
    pub fn top_levels(&self, n: usize) -> Vec<PriceLevel> {
        let mut sorted = self.levels.clone();
        sorted.sort_by(|a, b| b.percent_of_total.total_cmp(&a.percent_of_total));
        sorted.truncate(n);
        sorted
    }

    /// All levels at or above a volume-share threshold (in percent).
    pub fn levels_above_threshold(&self, threshold: f64) -> Vec<PriceLevel> {
        self.levels
            .iter()
            .filter(|level| level.percent_of_total >= threshold)
            .cloned()
            .collect()
    }

    /// The level containing `price`, if any.
    pub fn level_by_price(&self, price: f64) -> Option<&PriceLevel> {
        self.levels.iter().find(|level| level.contains(price))
    }

    /// Points of control: the `count` highest-volume levels of this window.
    pub fn multiple_pocs(&self, count: usize) -> Vec<PriceLevel> {
        self.top_levels(count)
    }
}
