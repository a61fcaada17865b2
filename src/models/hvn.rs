use serde::{Deserialize, Serialize};

use crate::config::{Price, PriceRange};
use crate::models::PriceLevel;

/// A run of contiguous price levels that all cleared the percentile filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HvnCluster {
    /// Member levels in ascending index order
    pub levels: Vec<PriceLevel>,
    pub cluster_high: f64,
    pub cluster_low: f64,
    /// Volume-weighted center of the member levels
    pub center_price: f64,
    pub total_volume: f64,
    pub total_percent: f64,
    pub highest_volume_level: PriceLevel,
}

/// Complete single-window HVN analysis.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HvnResult {
    pub hvn_unit: f64,
    pub price_range: PriceRange<Price>,
    /// Clusters sorted by aggregate volume share, strongest first
    pub clusters: Vec<HvnCluster>,
    /// All levels with rank assigned, strongest first
    pub ranked_levels: Vec<PriceLevel>,
    /// Ranked levels at or above the percentile threshold
    pub filtered_levels: Vec<PriceLevel>,
}

/// Single volume peak information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumePeak {
    pub price: f64,
    /// 1 = highest volume peak within its window
    pub rank: usize,
    pub volume_percent: f64,
    /// Original level index in the volume profile
    pub level_index: usize,
}

/// HVN peak analysis result for a single lookback window.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TimeframeResult {
    pub timeframe_days: i64,
    pub price_range: (f64, f64),
    pub total_levels: usize,
    /// Sorted by rank (volume share descending)
    pub peaks: Vec<VolumePeak>,
    /// Number of bars analyzed
    pub data_points: usize,
}

impl TimeframeResult {
    /// Placeholder for a window with insufficient or degenerate data.
    pub fn empty(timeframe_days: i64, data_points: usize) -> Self {
        Self {
            timeframe_days,
            data_points,
            ..Self::default()
        }
    }
}

/// One point-of-control anchor produced for HVN-anchored zone discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PocAnchorZone {
    pub zone_id: String,
    pub poc_price: f64,
    pub poc_volume_pct: f64,
    pub zone_low: f64,
    pub zone_high: f64,
    pub zone_width: f64,
    pub timeframe_days: i64,
    /// 1 = highest volume POC within its window
    pub rank: usize,
    /// Window priority applied by the scanner (1.0 when unset)
    pub timeframe_weight: f64,
    pub distance_to_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PocAnchorMetadata {
    pub timeframe_days: i64,
    pub total_pocs: usize,
    pub price_range: (f64, f64),
    pub zone_width: Option<f64>,
}

/// POC anchors for one lookback window plus the context they came from.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PocAnchorSet {
    pub zones: Vec<PocAnchorZone>,
    pub metadata: PocAnchorMetadata,
}
