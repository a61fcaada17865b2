use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// A single price signal handed to zone discovery. Every upstream calculator
/// (HVN, pivots, prior-period zones, volatility bands, market structure)
/// flattens into this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfluenceItem {
    pub name: String,
    /// The signal's price level
    pub level: f64,
    pub low: f64,
    pub high: f64,
    /// Source tag, e.g. "hvn-7d", "cam-weekly", "market-structure"
    pub source_type: String,
    pub strength: f64,
    /// Open bag for source-specific extras the typed fields don't cover
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ConfluenceItem {
    /// A point signal with no band of its own.
    pub fn point(name: impl Into<String>, level: f64, source_type: impl Into<String>) -> Self {
        Self::banded(name, level, level, level, source_type)
    }

    pub fn banded(
        name: impl Into<String>,
        level: f64,
        low: f64,
        high: f64,
        source_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            level,
            low,
            high,
            source_type: source_type.into(),
            strength: 1.0,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Geometric overlap against an arbitrary interval.
    pub fn overlaps(&self, low: f64, high: f64) -> bool {
        self.low <= high && self.high >= low
    }
}

/// Whether a zone sits below (support) or above (resistance) the current price.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter, Default,
)]
pub enum ZoneType {
    #[default]
    #[strum(to_string = "support")]
    Support,
    #[strum(to_string = "resistance")]
    Resistance,
}

impl ZoneType {
    pub fn classify(center_price: f64, current_price: f64) -> Self {
        if center_price > current_price {
            Self::Resistance
        } else {
            Self::Support
        }
    }
}

/// Confluence tier, L0 (none) through L5 (maximal agreement).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    Default,
)]
pub enum ConfluenceLevel {
    #[default]
    L0,
    L1,
    L2,
    L3,
    L4,
    L5,
}

/// The M15 candle that best expressed respect for a zone, kept for
/// recency-aware validation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BestCandle {
    pub timestamp_ms: i64,
    pub low: f64,
    pub high: f64,
    pub volume: f64,
}

/// Extra context carried by zones born from an HVN POC anchor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneMetadata {
    pub is_hvn_anchor: bool,
    pub hvn_rank: usize,
    pub hvn_volume_pct: f64,
    pub timeframe_weight: f64,
    pub timeframe_days: i64,
}

/// A discovered price zone with its confluence evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub zone_id: usize,
    pub zone_low: f64,
    pub zone_high: f64,
    pub center_price: f64,
    pub zone_width: f64,
    pub zone_type: ZoneType,
    pub confluence_level: ConfluenceLevel,
    pub confluence_score: f64,
    pub confluent_sources: Vec<ConfluenceItem>,
    pub distance_from_price: f64,
    pub distance_percentage: f64,
    pub recency_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_candle: Option<BestCandle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ZoneMetadata>,
}

/// Verdict of the post-hoc confidence gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub score: f64,
    pub touch_count: usize,
    pub recent_respect: bool,
    pub notes: String,
}

/// Market context computed by collaborators and handed into the core.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct MarketMetrics {
    pub current_price: f64,
    pub atr_daily: f64,
    pub atr_m15: f64,
}
