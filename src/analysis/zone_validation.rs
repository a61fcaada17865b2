//! Post-hoc zone validation.
//!
//! An independent confidence gate over a discovered zone: it reads the zone's
//! tier, its distance from the live price and the recency of the best
//! respecting candle, and emits a 0-100 score with a validity verdict. The
//! discovery engine never consults this scoring.

use crate::config::{ANALYSIS, ValidationConfig};
use crate::models::{ConfluenceLevel, MarketMetrics, ValidationResult, Zone};
use crate::utils::days_between_ms;

#[derive(Debug, Clone, Copy)]
pub struct ZoneValidator {
    pub config: ValidationConfig,
}

impl Default for ZoneValidator {
    fn default() -> Self {
        Self {
            config: ANALYSIS.validation,
        }
    }
}

impl ZoneValidator {
    /// Score one zone against the current market context.
    ///
    /// The base score comes from the confluence tier, adjusted for distance
    /// (close zones gain, far zones lose) and for a best candle seen within
    /// the recency window before `analysis_time_ms`.
    pub fn validate_zone(
        &self,
        zone: &Zone,
        symbol: &str,
        analysis_time_ms: i64,
        metrics: &MarketMetrics,
    ) -> ValidationResult {
        let cfg = &self.config;
        let touch_count = zone.confluent_sources.len();

        let mut score = match zone.confluence_level {
            ConfluenceLevel::L5 => 100.0,
            ConfluenceLevel::L4 => 80.0,
            ConfluenceLevel::L3 => 60.0,
            ConfluenceLevel::L2 => 40.0,
            ConfluenceLevel::L1 => 20.0,
            ConfluenceLevel::L0 => 50.0,
        };

        // Recompute the distance from fresh metrics when possible; the zone's
        // stored percentage may predate the latest price
        let distance_percentage = if metrics.current_price > 0.0 {
            (zone.center_price - metrics.current_price).abs() / metrics.current_price * 100.0
        } else {
            zone.distance_percentage
        };

        if distance_percentage < cfg.near_distance_pct {
            score += cfg.near_bonus;
        } else if distance_percentage > cfg.far_distance_pct {
            score -= cfg.far_penalty;
        }

        let mut recent_respect = false;
        if let Some(candle) = &zone.best_candle {
            let days_since = days_between_ms(candle.timestamp_ms, analysis_time_ms);
            recent_respect = days_since <= cfg.recency_days;
            if recent_respect {
                score += cfg.recency_bonus;
            }
        }

        let score = score.clamp(0.0, 100.0);
        let is_valid = score >= cfg.min_valid_score;

        log::debug!(
            "validated {symbol} zone {}: score {score:.0}, valid {is_valid}",
            zone.zone_id
        );

        ValidationResult {
            is_valid,
            score,
            touch_count,
            recent_respect,
            notes: format!("confluence level: {}", zone.confluence_level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BestCandle, ConfluenceItem, ZoneType};
    use crate::utils::TimeUtils;

    fn zone(level: ConfluenceLevel, center: f64) -> Zone {
        Zone {
            zone_id: 0,
            zone_low: center - 1.0,
            zone_high: center + 1.0,
            center_price: center,
            zone_width: 2.0,
            zone_type: ZoneType::Support,
            confluence_level: level,
            confluence_score: 1.0,
            confluent_sources: vec![ConfluenceItem::point("a", center, "atr")],
            distance_from_price: 0.0,
            distance_percentage: 0.0,
            recency_score: 1.0,
            best_candle: None,
            metadata: None,
        }
    }

    #[test]
    fn test_tier_base_scores() {
        let validator = ZoneValidator::default();
        let metrics = MarketMetrics {
            current_price: 100.0,
            ..MarketMetrics::default()
        };

        // Close to price: every tier gets the +10 proximity bonus
        let l5 = validator.validate_zone(&zone(ConfluenceLevel::L5, 100.0), "TEST", 0, &metrics);
        assert_eq!(l5.score, 100.0); // clamped
        assert!(l5.is_valid);

        let l1 = validator.validate_zone(&zone(ConfluenceLevel::L1, 100.0), "TEST", 0, &metrics);
        assert_eq!(l1.score, 30.0); // 20 + 10
        assert!(!l1.is_valid);

        let l2 = validator.validate_zone(&zone(ConfluenceLevel::L2, 100.0), "TEST", 0, &metrics);
        assert_eq!(l2.score, 50.0); // 40 + 10
        assert!(l2.is_valid);
    }

    #[test]
    fn test_distance_penalty() {
        let validator = ZoneValidator::default();
        let metrics = MarketMetrics {
            current_price: 100.0,
            ..MarketMetrics::default()
        };

        // 10% away: -20
        let far = validator.validate_zone(&zone(ConfluenceLevel::L3, 110.0), "TEST", 0, &metrics);
        assert_eq!(far.score, 40.0); // 60 - 20
        assert!(far.is_valid);

        // 3% away: no adjustment either way
        let mid = validator.validate_zone(&zone(ConfluenceLevel::L3, 103.0), "TEST", 0, &metrics);
        assert_eq!(mid.score, 60.0);
    }

    #[test]
    fn test_distance_falls_back_to_stored_percentage() {
        let validator = ZoneValidator::default();
        let mut z = zone(ConfluenceLevel::L3, 110.0);
        z.distance_percentage = 8.0;
        let result = validator.validate_zone(&z, "TEST", 0, &MarketMetrics::default());
        assert_eq!(result.score, 40.0); // 60 - 20 from the stored 8%
    }

    #[test]
    fn test_recency_bonus() {
        let validator = ZoneValidator::default();
        let metrics = MarketMetrics {
            current_price: 100.0,
            ..MarketMetrics::default()
        };
        let analysis_time = 30 * TimeUtils::MS_IN_D;

        let mut recent = zone(ConfluenceLevel::L1, 100.0);
        recent.best_candle = Some(BestCandle {
            timestamp_ms: analysis_time - 2 * TimeUtils::MS_IN_D,
            low: 99.0,
            high: 101.0,
            volume: 1000.0,
        });
        let result = validator.validate_zone(&recent, "TEST", analysis_time, &metrics);
        assert!(result.recent_respect);
        assert_eq!(result.score, 40.0); // 20 + 10 near + 10 recency
        assert!(result.is_valid);

        let mut stale = zone(ConfluenceLevel::L1, 100.0);
        stale.best_candle = Some(BestCandle {
            timestamp_ms: analysis_time - 9 * TimeUtils::MS_IN_D,
            low: 99.0,
            high: 101.0,
            volume: 1000.0,
        });
        let result = validator.validate_zone(&stale, "TEST", analysis_time, &metrics);
        assert!(!result.recent_respect);
        assert_eq!(result.score, 30.0);
    }

    #[test]
    fn test_touch_count_reports_sources() {
        let validator = ZoneValidator::default();
        let mut z = zone(ConfluenceLevel::L2, 100.0);
        z.confluent_sources.push(ConfluenceItem::point("b", 100.1, "weekly"));
        let result = validator.validate_zone(&z, "TEST", 0, &MarketMetrics::default());
        assert_eq!(result.touch_count, 2);
    }
}
