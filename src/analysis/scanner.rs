//! Scan orchestration over precomputed inputs.
//!
//! The scanner owns no I/O. It takes a bar series plus externally computed
//! confluence items, folds in HVN peaks and POC anchors, and hands the lot to
//! the discovery engine. Request-shape violations (non-finite bounds, missing
//! price) are caller bugs and fail fast; thin or degenerate market DATA just
//! produces an empty zone list.

use anyhow::{Result, bail};
use rayon::prelude::*;
use std::collections::BTreeMap;

use crate::analysis::hvn_engine::HvnEngine;
use crate::analysis::zone_discovery::{ConfluenceSources, DiscoveryMode, ZoneDiscoveryEngine};
use crate::config::{ANALYSIS, ScannerConfig};
use crate::models::{
    BarSeries, ConfluenceItem, MarketMetrics, PocAnchorZone, TimeframeResult, Zone,
};

/// Everything a scan produced, plus the bookkeeping display panels want.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub symbol: String,
    pub scan_low: f64,
    pub scan_high: f64,
    pub zones: Vec<Zone>,
    /// Item count per source tag, for the "confluence sources" summary
    pub source_counts: BTreeMap<String, usize>,
    pub poc_anchors: Vec<PocAnchorZone>,
}

#[derive(Debug, Clone)]
pub struct ZoneScanner {
    pub hvn_engine: HvnEngine,
    pub discovery_engine: ZoneDiscoveryEngine,
    pub config: ScannerConfig,
}

impl ZoneScanner {
    pub fn new(discovery_engine: ZoneDiscoveryEngine) -> Self {
        Self {
            hvn_engine: HvnEngine::default(),
            discovery_engine,
            config: ANALYSIS.scanner,
        }
    }

    /// Run a full confluence scan.
    ///
    /// `scan_bounds` overrides the default range of
    /// `current_price +/- scan_range_atr_multiplier * atr_daily`. External
    /// items arrive pre-shaped from the sibling calculators; `bars` (when
    /// given) feeds the HVN peak sweep and, in anchored mode, POC anchoring.
    pub fn scan(
        &self,
        symbol: &str,
        bars: Option<&BarSeries>,
        metrics: &MarketMetrics,
        external_items: &[ConfluenceItem],
        scan_bounds: Option<(f64, f64)>,
    ) -> Result<ScanResult> {
        if !metrics.current_price.is_finite() || metrics.current_price <= 0.0 {
            bail!(
                "cannot scan {symbol}: current price {} is unusable",
                metrics.current_price
            );
        }

        let (scan_low, scan_high) = scan_bounds.unwrap_or_else(|| {
            let span = self.config.scan_range_atr_multiplier * metrics.atr_daily;
            (metrics.current_price - span, metrics.current_price + span)
        });

        if !scan_low.is_finite() || !scan_high.is_finite() || scan_high <= scan_low {
            bail!("cannot scan {symbol}: invalid scan range [{scan_low}, {scan_high}]");
        }

        log::info!("starting confluence scan for {symbol}: [{scan_low:.2}, {scan_high:.2}]");

        let mut sources = ConfluenceSources::new();
        for item in external_items {
            sources
                .entry(item.source_type.clone())
                .or_default()
                .push(item.clone());
        }

        let mut poc_anchors: Vec<PocAnchorZone> = Vec::new();
        if let Some(bars) = bars {
            let timeframe_results = self.hvn_engine.analyze_multi_timeframe(
                bars,
                &ScannerConfig::HVN_TIMEFRAMES,
                true,
                true,
            );
            let hvn_items =
                self.format_hvn_peaks(&timeframe_results, metrics.atr_m15, scan_low, scan_high);
            log::info!("added {} HVN peak items", hvn_items.len());
            for item in hvn_items {
                sources
                    .entry(item.source_type.clone())
                    .or_default()
                    .push(item);
            }

            if self.discovery_engine.discovery_mode == DiscoveryMode::HvnAnchor {
                poc_anchors = self.build_poc_anchor_zones(bars, metrics);
                log::info!("using {} POC anchor zones after overlap filtering", poc_anchors.len());
            }
        }

        let mut source_counts: BTreeMap<String, usize> = sources
            .iter()
            .map(|(tag, items)| (tag.clone(), items.len()))
            .collect();
        if !poc_anchors.is_empty() {
            source_counts.insert("hvn_poc_anchors".to_string(), poc_anchors.len());
        }

        let zones = self.discovery_engine.discover_zones(
            scan_low,
            scan_high,
            metrics.current_price,
            metrics.atr_m15,
            &sources,
            (!poc_anchors.is_empty()).then_some(poc_anchors.as_slice()),
        );

        log::info!("scan for {symbol} complete: {} zones", zones.len());

        Ok(ScanResult {
            symbol: symbol.to_string(),
            scan_low,
            scan_high,
            zones,
            source_counts,
            poc_anchors,
        })
    }

    /// Shape HVN peaks into confluence items for discovery. Peaks become
    /// narrow bands around their price, strength carries the volume share.
    pub fn format_hvn_peaks(
        &self,
        hvn_results: &[TimeframeResult],
        atr_m15: f64,
        scan_low: f64,
        scan_high: f64,
    ) -> Vec<ConfluenceItem> {
        let zone_width = atr_m15 * self.config.hvn_zone_multiplier;
        let mut formatted = Vec::new();

        for result in hvn_results {
            for peak in result.peaks.iter().take(self.config.hvn_peaks_per_timeframe) {
                if scan_low <= peak.price && peak.price <= scan_high {
                    formatted.push(
                        ConfluenceItem::banded(
                            format!("HVN{}d_R{}", result.timeframe_days, peak.rank),
                            peak.price,
                            peak.price - zone_width,
                            peak.price + zone_width,
                            format!("hvn-{}d", result.timeframe_days),
                        )
                        .with_strength(peak.volume_percent)
                        .with_meta("timeframe_days", serde_json::json!(result.timeframe_days)),
                    );
                }
            }
        }

        formatted
    }

    /// POC anchors across every configured window, stamped with the window's
    /// priority weight, deduplicated down to one anchor per price area.
    pub fn build_poc_anchor_zones(
        &self,
        bars: &BarSeries,
        metrics: &MarketMetrics,
    ) -> Vec<PocAnchorZone> {
        let zone_width = metrics.atr_m15 * self.config.poc_zone_width_multiplier;

        let window_sets: Vec<(Vec<PocAnchorZone>, f64)> = ScannerConfig::POC_WINDOWS
            .par_iter()
            .map(|&(days, weight)| {
                let set = self.hvn_engine.create_poc_anchor_zones(
                    bars,
                    days,
                    (zone_width > 0.0).then_some(zone_width),
                    self.config.poc_min_zones,
                );
                (set.zones, weight)
            })
            .collect();

        let mut all_anchors = Vec::new();
        for (zones, weight) in window_sets {
            for mut anchor in zones {
                anchor.timeframe_weight = weight;
                anchor.distance_to_price = (anchor.poc_price - metrics.current_price).abs();
                all_anchors.push(anchor);
            }
        }

        Self::filter_overlapping_pocs(all_anchors, self.config.poc_overlap_threshold)
    }

    /// Collapse anchors that sit on essentially the same price, keeping the
    /// highest-weighted (closest on ties).
    fn filter_overlapping_pocs(
        mut poc_zones: Vec<PocAnchorZone>,
        overlap_threshold: f64,
    ) -> Vec<PocAnchorZone> {
        if poc_zones.is_empty() {
            return poc_zones;
        }

        poc_zones.sort_by(|a, b| {
            b.timeframe_weight
                .total_cmp(&a.timeframe_weight)
                .then_with(|| a.distance_to_price.total_cmp(&b.distance_to_price))
        });

        let mut filtered: Vec<PocAnchorZone> = Vec::new();
        for poc in poc_zones {
            let overlaps_selected = filtered.iter().any(|selected| {
                let price_diff =
                    (poc.poc_price - selected.poc_price).abs() / selected.poc_price;
                price_diff <= overlap_threshold
            });

            if !overlaps_selected {
                filtered.push(poc);
            }
        }

        filtered
    }
}
