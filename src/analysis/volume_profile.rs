//! Volume-by-price histogram construction.
//!
//! All timestamps are epoch-ms UTC. A build is a pure function over the bar
//! series: the same input and flags always produce the same result, and the
//! input series is never modified.

use crate::config::{ANALYSIS, Price, PriceLike, PriceRange};
use crate::domain::MarketSession;
use crate::models::{BarSeries, PriceLevel, VolumeProfileResult};

/// Build a volume profile over `bars` with the default level count.
pub fn build_volume_profile(
    bars: &BarSeries,
    include_pre: bool,
    include_post: bool,
) -> VolumeProfileResult {
    build_volume_profile_with_levels(bars, ANALYSIS.profile.levels, include_pre, include_post)
}

/// Build a volume profile dividing the filtered price range into `levels`
/// equal-width bins. Each bar's volume is spread EVENLY across every bin its
/// [low, high] span touches; there is no time or within-bar weighting.
///
/// Degenerate input (no bars, everything session-filtered, inverted or flat
/// price range, zero volume) yields an empty result rather than an error.
pub fn build_volume_profile_with_levels(
    bars: &BarSeries,
    levels: usize,
    include_pre: bool,
    include_post: bool,
) -> VolumeProfileResult {
    if bars.is_empty() || levels == 0 {
        return VolumeProfileResult::default();
    }

    // Session filter. Bars in [00:00, 08:00) UTC never qualify.
    let included: Vec<usize> = (0..bars.klines())
        .filter(|&i| {
            MarketSession::classify(bars.timestamps[i])
                .map(|session| session.is_included(include_pre, include_post))
                .unwrap_or(false)
        })
        .collect();

    if included.is_empty() {
        log::debug!(
            "{}: no bars left after session filtering",
            bars.symbol_interval
        );
        return VolumeProfileResult::default();
    }

    let mut low = f64::INFINITY;
    let mut high = f64::NEG_INFINITY;
    for &i in &included {
        low = low.min(bars.low_prices[i].value());
        high = high.max(bars.high_prices[i].value());
    }

    // Also rejects NaN bounds
    if !(high > low) {
        log::warn!(
            "{}: degenerate price range [{low}, {high}], skipping profile",
            bars.symbol_interval
        );
        return VolumeProfileResult::default();
    }

    let price_range = PriceRange::new(Price::new(low), Price::new(high), levels);
    let hvn_unit = price_range.chunk_size();

    let min_p = Price::new(low);
    let max_p = Price::new(high);

    let mut volume_by_level = vec![0.0_f64; levels];
    for &i in &included {
        let candle = bars.get_candle(i);
        if !(candle.volume > 0.0) || !candle.volume.is_finite() {
            continue;
        }

        let bar_low = Price::from(candle.low_price).clamp(min_p, max_p);
        let bar_high = Price::from(candle.high_price).clamp(min_p, max_p);

        let num_chunks = price_range.count_intersecting_chunks(bar_low, bar_high);
        if num_chunks == 0 {
            continue;
        }

        // Conserved distribution: divide by the number of bins covered
        let volume_per_level = candle.volume / num_chunks as f64;
        let start_chunk = price_range.chunk_index(bar_low);

        volume_by_level
            .iter_mut()
            .skip(start_chunk)
            .take(num_chunks)
            .for_each(|level| *level += volume_per_level);
    }

    let total_volume: f64 = volume_by_level.iter().sum();
    if total_volume <= 0.0 {
        return VolumeProfileResult::default();
    }

    let price_levels = volume_by_level
        .iter()
        .enumerate()
        .filter(|&(_, &volume)| volume > 0.0)
        .map(|(idx, &volume)| {
            let (level_low, level_high) = price_range.chunk_bounds(idx);
            PriceLevel {
                index: idx,
                low: level_low,
                high: level_high,
                center: (level_low + level_high) / 2.0,
                volume,
                percent_of_total: volume / total_volume * 100.0,
                rank: 0,
            }
        })
        .collect();

    VolumeProfileResult {
        levels: price_levels,
        hvn_unit,
        price_range,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Candle, SymbolInterval};
    use crate::utils::TimeUtils;

    // 14:00 UTC, squarely inside the regular session
    const REGULAR_TS: i64 = 14 * TimeUtils::MS_IN_H;

    fn regular_candle(offset_min: i64, low: f64, high: f64, volume: f64) -> Candle {
        let mid = (low + high) / 2.0;
        Candle::new(
            REGULAR_TS + offset_min * TimeUtils::MS_IN_MIN,
            mid,
            high,
            low,
            mid,
            volume,
        )
    }

    fn series(candles: &[Candle]) -> BarSeries {
        BarSeries::from_candles(SymbolInterval::new("TEST", TimeUtils::MS_IN_5_MIN), candles)
    }

    #[test]
    fn test_empty_bars_empty_profile() {
        let bars = series(&[]);
        let profile = build_volume_profile(&bars, true, true);
        assert!(profile.is_empty());
        assert_eq!(profile.hvn_unit, 0.0);
    }

    #[test]
    fn test_flat_range_empty_profile() {
        let bars = series(&[regular_candle(0, 100.0, 100.0, 50.0)]);
        let profile = build_volume_profile(&bars, true, true);
        assert!(profile.is_empty());
    }

    #[test]
    fn test_percentages_sum_to_hundred() {
        let candles = vec![
            regular_candle(0, 100.0, 103.0, 1000.0),
            regular_candle(5, 101.0, 105.0, 500.0),
            regular_candle(10, 99.0, 100.5, 2000.0),
        ];
        let bars = series(&candles);
        let profile = build_volume_profile(&bars, true, true);

        assert!(!profile.is_empty());
        let pct_sum: f64 = profile.levels.iter().map(|l| l.percent_of_total).sum();
        assert!((pct_sum - 100.0).abs() < 1e-6, "sum was {pct_sum}");

        // Volume is conserved, not just the percentages
        let vol_sum: f64 = profile.levels.iter().map(|l| l.volume).sum();
        assert!((vol_sum - 3500.0).abs() < 1e-6);
    }

    #[test]
    fn test_level_bounds_within_bar_range() {
        let candles = vec![
            regular_candle(0, 98.0, 104.0, 800.0),
            regular_candle(5, 101.0, 107.0, 900.0),
        ];
        let bars = series(&candles);
        let profile = build_volume_profile(&bars, true, true);

        for level in &profile.levels {
            assert!(level.low >= 98.0 - 1e-9);
            assert!(level.high <= 107.0 + 1e-9);
            assert!(level.low < level.high);
        }
    }

    #[test]
    fn test_purity() {
        let candles = vec![
            regular_candle(0, 100.0, 103.0, 1000.0),
            regular_candle(5, 101.0, 105.0, 500.0),
        ];
        let bars = series(&candles);
        let first = build_volume_profile(&bars, true, false);
        let second = build_volume_profile(&bars, true, false);
        assert_eq!(first, second);
    }

    #[test]
    fn test_session_exclusion() {
        // One bar at 09:00 (pre), one at 14:00 (regular), one at 21:00 (post),
        // one at 03:00 (overnight, never included)
        let pre = Candle::new(9 * TimeUtils::MS_IN_H, 100.0, 101.0, 99.0, 100.0, 100.0);
        let regular = Candle::new(14 * TimeUtils::MS_IN_H, 100.0, 101.0, 99.0, 100.0, 100.0);
        let post = Candle::new(21 * TimeUtils::MS_IN_H, 100.0, 101.0, 99.0, 100.0, 100.0);
        let overnight = Candle::new(3 * TimeUtils::MS_IN_H, 100.0, 101.0, 99.0, 100.0, 9999.0);

        let bars = series(&[pre, regular, post, overnight]);

        let all = build_volume_profile(&bars, true, true);
        let total_all: f64 = all.levels.iter().map(|l| l.volume).sum();
        assert!((total_all - 300.0).abs() < 1e-6, "overnight bar must be dropped");

        let regular_only = build_volume_profile(&bars, false, false);
        let total_regular: f64 = regular_only.levels.iter().map(|l| l.volume).sum();
        assert!((total_regular - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_volume_bars_skipped() {
        let candles = vec![
            regular_candle(0, 100.0, 105.0, 0.0),
            regular_candle(5, 100.0, 105.0, 700.0),
        ];
        let bars = series(&candles);
        let profile = build_volume_profile(&bars, true, true);
        let total: f64 = profile.levels.iter().map(|l| l.volume).sum();
        assert!((total - 700.0).abs() < 1e-6);
    }
}
