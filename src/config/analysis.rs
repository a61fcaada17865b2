//! Analysis and computation configuration

use serde::{Deserialize, Serialize};

use crate::config::Weight;

/// Volume profile histogram resolution.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Number of equal-width price levels the bar range is divided into
    pub levels: usize,
}

/// Tunables for HVN peak and cluster detection.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct HvnConfig {
    /// Levels with rank >= this survive percentile filtering (80 keeps the top 20%)
    pub percentile_threshold: f64,

    /// Minimum peak prominence as a % of the tallest level's volume share.
    /// Turn UP to keep only dominant peaks. Turn DOWN to admit shoulders.
    pub prominence_threshold: f64,

    /// Minimum index spacing between accepted peaks (in levels)
    pub min_peak_distance: usize,

    /// Height floor: peaks must clear this percentile of the volume distribution
    pub peak_height_percentile: f64,

    /// ATR lookback used by the window sizing helpers
    pub atr_period: usize,
}

/// Zone discovery defaults. Merge flags are runtime-mutable on the engine;
/// these are the construction-time values.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    pub merge_overlapping: bool,
    pub merge_identical: bool,

    /// Two items within this price delta count as "the same level"
    pub identical_threshold: f64,

    /// Anchored mode returns at most this many zones (the closest ones)
    pub max_anchor_zones: usize,

    /// Every POC anchor starts from this score before overlap credits
    pub anchor_base_score: f64,

    /// Per-extra-source-type multiplier step on top of 1.0
    pub diversity_bonus_step: f64,
}

impl DiscoveryConfig {
    /// Per-source-type weights for the HVN-anchored scoring path.
    /// Unknown tags fall back to 1.0 (logged by the discovery engine).
    pub fn source_weight(tag: &str) -> Option<Weight> {
        let w = match tag {
            "hvn_poc" => 3.0,
            "fractal" => 2.5,
            "cam-monthly" => 2.0,
            "cam-weekly" => 1.5,
            "cam-daily" => 1.0,
            "weekly" => 2.0,
            "daily-zone" => 1.0,
            "daily-level" => 0.5,
            "atr" => 1.0,
            "market-structure" => 0.8,
            _ => return None,
        };
        Some(Weight::new(w))
    }
}

/// Scanner orchestration tunables.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Top N peaks per lookback window fed into discovery
    pub hvn_peaks_per_timeframe: usize,

    /// Narrow zones for volume peaks (x M15 ATR)
    pub hvn_zone_multiplier: f64,

    /// POC anchor band width (x M15 ATR)
    pub poc_zone_width_multiplier: f64,

    /// Minimum anchor zones requested per window
    pub poc_min_zones: usize,

    /// Anchors closer than this relative price delta collapse to the
    /// higher-weighted one
    pub poc_overlap_threshold: f64,

    /// Scan within this many daily ATRs of the current price when the caller
    /// does not supply explicit bounds
    pub scan_range_atr_multiplier: f64,
}

impl ScannerConfig {
    /// Lookback windows for POC anchoring with their priority weights.
    /// Shorter windows reflect current auction structure and outrank longer ones.
    pub const POC_WINDOWS: [(i64, f64); 3] = [(7, 1.0), (14, 0.7), (30, 0.5)];

    /// Lookback windows (days) for the multi-timeframe peak sweep.
    pub const HVN_TIMEFRAMES: [i64; 3] = [30, 14, 7];
}

/// Zone validation scoring knobs.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Distance bands (% of current price) and their score adjustments
    pub near_distance_pct: f64,
    pub near_bonus: f64,
    pub far_distance_pct: f64,
    pub far_penalty: f64,

    /// A best candle at most this many days old earns the recency bonus
    pub recency_days: i64,
    pub recency_bonus: f64,

    /// Zones scoring below this are rejected
    pub min_valid_score: f64,
}

/// The Master Analysis Configuration
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub profile: ProfileConfig,
    pub hvn: HvnConfig,
    pub discovery: DiscoveryConfig,
    pub scanner: ScannerConfig,
    pub validation: ValidationConfig,
}

pub const ANALYSIS: AnalysisConfig = AnalysisConfig {
    profile: ProfileConfig { levels: 100 },

    hvn: HvnConfig {
        percentile_threshold: 80.0,
        prominence_threshold: 0.5,
        min_peak_distance: 3,
        peak_height_percentile: 70.0,
        atr_period: 14,
    },

    discovery: DiscoveryConfig {
        merge_overlapping: false,
        merge_identical: true,
        identical_threshold: 0.10,
        max_anchor_zones: 6,
        anchor_base_score: 3.0,
        diversity_bonus_step: 0.1,
    },

    scanner: ScannerConfig {
        hvn_peaks_per_timeframe: 5,
        hvn_zone_multiplier: 0.15, // Narrow zones for volume peaks
        poc_zone_width_multiplier: 0.5,
        poc_min_zones: 6,
        poc_overlap_threshold: 0.005,
        scan_range_atr_multiplier: 2.0, // Scan within 2x Daily ATR
    },

    validation: ValidationConfig {
        near_distance_pct: 1.0,
        near_bonus: 10.0,
        far_distance_pct: 5.0,
        far_penalty: 20.0,
        recency_days: 5,
        recency_bonus: 10.0,
        min_valid_score: 40.0,
    },
};
