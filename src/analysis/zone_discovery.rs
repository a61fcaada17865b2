//! Zone discovery with configurable overlap logic.
//!
//! Confluence items flatten into zones through exactly one of three merge
//! strategies, or through HVN-anchored discovery when POC anchors are
//! available. Strategy choice is order-sensitive by design: the overlap
//! strategy first-fits price-ascending items into existing clusters rather
//! than computing a transitive closure.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use strum_macros::{Display, EnumIter};

use crate::analysis::TierPolicy;
use crate::config::{ANALYSIS, DiscoveryConfig, Weight};
use crate::models::{ConfluenceItem, PocAnchorZone, Zone, ZoneMetadata, ZoneType};

/// Confluence items grouped by source tag. A BTreeMap keeps flattening order
/// deterministic across runs.
pub type ConfluenceSources = BTreeMap<String, Vec<ConfluenceItem>>;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter, Default,
)]
pub enum DiscoveryMode {
    #[default]
    #[strum(to_string = "cluster")]
    Cluster,
    #[strum(to_string = "hvn_anchor")]
    HvnAnchor,
}

#[derive(Debug, Clone)]
pub struct ZoneDiscoveryEngine {
    pub merge_overlapping: bool,
    pub merge_identical: bool,
    pub identical_threshold: f64,
    pub discovery_mode: DiscoveryMode,
}

impl Default for ZoneDiscoveryEngine {
    fn default() -> Self {
        Self::new(
            ANALYSIS.discovery.merge_overlapping,
            ANALYSIS.discovery.merge_identical,
            DiscoveryMode::Cluster,
        )
    }
}

impl ZoneDiscoveryEngine {
    pub fn new(merge_overlapping: bool, merge_identical: bool, mode: DiscoveryMode) -> Self {
        log::info!(
            "ZoneDiscoveryEngine initialized - mode: {mode}, merge overlapping: {merge_overlapping}, merge identical: {merge_identical}"
        );
        Self {
            merge_overlapping,
            merge_identical,
            identical_threshold: ANALYSIS.discovery.identical_threshold,
            discovery_mode: mode,
        }
    }

    /// Change merge flags at runtime. Configuration only; nothing is
    /// re-discovered until the next `discover_zones` call.
    pub fn set_merge_mode(&mut self, merge_overlapping: bool, merge_identical: bool) {
        self.merge_overlapping = merge_overlapping;
        self.merge_identical = merge_identical;
        log::info!(
            "merge mode changed - overlapping: {merge_overlapping}, identical: {merge_identical}"
        );
    }

    /// Discover zones from confluence sources inside `[scan_low, scan_high]`.
    ///
    /// In `HvnAnchor` mode with POC anchors supplied, discovery pivots around
    /// the anchors instead of clustering the raw items. Otherwise exactly one
    /// merge strategy applies, selected by flag precedence: both flags off
    /// keeps every item as its own zone, `merge_identical` alone buckets
    /// same-price items, and `merge_overlapping` wins whenever it is set.
    pub fn discover_zones(
        &self,
        scan_low: f64,
        scan_high: f64,
        current_price: f64,
        zone_unit: f64,
        confluence_sources: &ConfluenceSources,
        poc_zones: Option<&[PocAnchorZone]>,
    ) -> Vec<Zone> {
        if self.discovery_mode == DiscoveryMode::HvnAnchor
            && let Some(anchors) = poc_zones
            && !anchors.is_empty()
        {
            return self.discover_hvn_anchored_zones(
                anchors,
                current_price,
                zone_unit,
                confluence_sources,
            );
        }

        let all_items: Vec<ConfluenceItem> = confluence_sources
            .values()
            .flatten()
            .filter(|item| scan_low <= item.level && item.level <= scan_high)
            .cloned()
            .collect();

        if all_items.is_empty() {
            log::warn!("no confluence items within scan range [{scan_low}, {scan_high}]");
            return Vec::new();
        }

        log::info!("processing {} confluence items", all_items.len());

        let mut zones = if !self.merge_overlapping && !self.merge_identical {
            Self::create_individual_zones(&all_items, current_price)
        } else if self.merge_identical && !self.merge_overlapping {
            self.create_zones_merge_identical(&all_items, current_price)
        } else {
            Self::create_zones_merge_overlapping(&all_items, current_price)
        };

        for zone in &mut zones {
            zone.confluence_score = Self::calculate_confluence_score(zone);
            zone.confluence_level =
                TierPolicy::SourceCount.tier(zone.confluent_sources.len(), zone.confluence_score);
        }

        zones.sort_by(|a, b| b.confluence_score.total_cmp(&a.confluence_score));

        log::info!("discovered {} zones", zones.len());
        zones
    }

    /// Discover zones using HVN POCs as anchors.
    ///
    /// Every anchor becomes a candidate zone scored by the non-HVN items that
    /// geometrically overlap its band. The candidate set is then ordered by
    /// distance from the current price (window weight breaks ties) and capped
    /// at the configured count; the score-descending pre-sort has no effect on
    /// the final ordering.
    pub fn discover_hvn_anchored_zones(
        &self,
        poc_zones: &[PocAnchorZone],
        current_price: f64,
        _zone_unit: f64,
        confluence_sources: &ConfluenceSources,
    ) -> Vec<Zone> {
        log::info!(
            "starting HVN-anchored discovery with {} POC zones",
            poc_zones.len()
        );

        let mut zones: Vec<Zone> = Vec::new();

        for (zone_id, poc) in poc_zones.iter().enumerate() {
            let mut overlapping_items: Vec<ConfluenceItem> = Vec::new();
            let mut confluence_types: BTreeSet<&str> = BTreeSet::new();

            for (source_type, items) in confluence_sources {
                // HVN sources are already our anchors
                if source_type.to_lowercase().contains("hvn") {
                    continue;
                }

                for item in items {
                    if item.overlaps(poc.zone_low, poc.zone_high) {
                        overlapping_items.push(item.clone());
                        confluence_types.insert(source_type.as_str());
                    }
                }
            }

            let mut confluence_score = ANALYSIS.discovery.anchor_base_score;
            for item in &overlapping_items {
                let weight =
                    DiscoveryConfig::source_weight(&item.source_type).unwrap_or_else(|| {
                        log::debug!(
                            "unknown source type '{}', using weight 1.0",
                            item.source_type
                        );
                        Weight::new(1.0)
                    });
                confluence_score += weight.value();
            }

            if confluence_types.len() > 1 {
                confluence_score *= 1.0
                    + (confluence_types.len() - 1) as f64 * ANALYSIS.discovery.diversity_bonus_step;
            }

            let confluence_level =
                TierPolicy::ScoreThreshold.tier(overlapping_items.len(), confluence_score);

            let anchor_item = ConfluenceItem::point(poc.zone_id.clone(), poc.poc_price, "hvn_poc")
                .with_strength(poc.poc_volume_pct);
            let mut confluent_sources = vec![anchor_item];
            confluent_sources.extend(overlapping_items);

            let distance = (poc.poc_price - current_price).abs();

            zones.push(Zone {
                zone_id,
                zone_low: poc.zone_low,
                zone_high: poc.zone_high,
                center_price: poc.poc_price,
                zone_width: poc.zone_width,
                zone_type: ZoneType::classify(poc.poc_price, current_price),
                confluence_level,
                confluence_score,
                confluent_sources,
                distance_from_price: distance,
                distance_percentage: distance / current_price * 100.0,
                recency_score: 1.0,
                best_candle: None,
                metadata: Some(ZoneMetadata {
                    is_hvn_anchor: true,
                    hvn_rank: poc.rank,
                    hvn_volume_pct: poc.poc_volume_pct,
                    timeframe_weight: poc.timeframe_weight,
                    timeframe_days: poc.timeframe_days,
                }),
            });
        }

        // Score ordering first, kept from the original flow
        zones.sort_by(|a, b| b.confluence_score.total_cmp(&a.confluence_score));

        // ...then the ordering that actually decides: closest to price wins,
        // higher window weight breaks ties
        zones.sort_by(|a, b| {
            a.distance_from_price
                .total_cmp(&b.distance_from_price)
                .then_with(|| {
                    let wa = a.metadata.as_ref().map(|m| m.timeframe_weight).unwrap_or(0.0);
                    let wb = b.metadata.as_ref().map(|m| m.timeframe_weight).unwrap_or(0.0);
                    wb.total_cmp(&wa)
                })
        });
        zones.truncate(ANALYSIS.discovery.max_anchor_zones);

        let above = zones
            .iter()
            .filter(|z| z.center_price > current_price)
            .count();
        log::info!(
            "selected {} zones (closest to price): {} above, {} below",
            zones.len(),
            above,
            zones.len() - above
        );

        zones
    }

    /// No merging at all: every confluence item becomes its own zone.
    fn create_individual_zones(items: &[ConfluenceItem], current_price: f64) -> Vec<Zone> {
        let zones: Vec<Zone> = items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                Self::make_zone(
                    idx,
                    item.low,
                    item.high,
                    item.level,
                    vec![item.clone()],
                    current_price,
                )
            })
            .collect();

        log::info!("created {} individual zones (no merging)", zones.len());
        zones
    }

    /// Merge only items at essentially the same price. Buckets key off the
    /// first-seen anchor price, not a running centroid.
    fn create_zones_merge_identical(
        &self,
        items: &[ConfluenceItem],
        current_price: f64,
    ) -> Vec<Zone> {
        let mut price_groups: Vec<(f64, Vec<ConfluenceItem>)> = Vec::new();

        for item in items {
            match price_groups
                .iter_mut()
                .find(|(anchor, _)| (item.level - *anchor).abs() <= self.identical_threshold)
            {
                Some((_, group)) => group.push(item.clone()),
                None => price_groups.push((item.level, vec![item.clone()])),
            }
        }

        let item_count = items.len();
        let zones: Vec<Zone> = price_groups
            .into_iter()
            .enumerate()
            .map(|(idx, (_, group))| {
                let zone_low = group.iter().map(|i| i.low).fold(f64::INFINITY, f64::min);
                let zone_high = group.iter().map(|i| i.high).fold(f64::NEG_INFINITY, f64::max);
                let center = group.iter().map(|i| i.level).sum::<f64>() / group.len() as f64;
                Self::make_zone(idx, zone_low, zone_high, center, group, current_price)
            })
            .collect();

        log::info!(
            "created {} zones from {item_count} items (identical price merging)",
            zones.len()
        );
        zones
    }

    /// Full overlap merging: price-ascending items first-fit into the first
    /// cluster whose current interval geometrically overlaps them.
    fn create_zones_merge_overlapping(items: &[ConfluenceItem], current_price: f64) -> Vec<Zone> {
        let mut sorted_items = items.to_vec();
        sorted_items.sort_by(|a, b| a.level.total_cmp(&b.level));

        let mut clusters: Vec<Vec<ConfluenceItem>> = Vec::new();
        for item in sorted_items {
            let target = clusters.iter_mut().find(|cluster| {
                let cluster_low = cluster.iter().map(|i| i.low).fold(f64::INFINITY, f64::min);
                let cluster_high = cluster
                    .iter()
                    .map(|i| i.high)
                    .fold(f64::NEG_INFINITY, f64::max);
                item.low <= cluster_high && item.high >= cluster_low
            });

            match target {
                Some(cluster) => cluster.push(item),
                None => clusters.push(vec![item]),
            }
        }

        let zones: Vec<Zone> = clusters
            .into_iter()
            .enumerate()
            .map(|(idx, cluster)| {
                let zone_low = cluster.iter().map(|i| i.low).fold(f64::INFINITY, f64::min);
                let zone_high = cluster
                    .iter()
                    .map(|i| i.high)
                    .fold(f64::NEG_INFINITY, f64::max);

                let total_weight: f64 = cluster.iter().map(|i| i.strength).sum();
                let center = if total_weight > 0.0 {
                    cluster.iter().map(|i| i.level * i.strength).sum::<f64>() / total_weight
                } else {
                    (zone_high + zone_low) / 2.0
                };

                Self::make_zone(idx, zone_low, zone_high, center, cluster, current_price)
            })
            .collect();

        log::info!(
            "created {} zones from {} items (overlap merging)",
            zones.len(),
            items.len()
        );
        zones
    }

    fn make_zone(
        zone_id: usize,
        zone_low: f64,
        zone_high: f64,
        center_price: f64,
        confluent_sources: Vec<ConfluenceItem>,
        current_price: f64,
    ) -> Zone {
        // Malformed items (level outside their own band) must not break the
        // bound invariant
        let zone_low = zone_low.min(center_price);
        let zone_high = zone_high.max(center_price);

        let distance = (center_price - current_price).abs();

        Zone {
            zone_id,
            zone_low,
            zone_high,
            center_price,
            zone_width: zone_high - zone_low,
            zone_type: ZoneType::classify(center_price, current_price),
            confluence_level: crate::models::ConfluenceLevel::L0,
            confluence_score: 0.0,
            confluent_sources,
            distance_from_price: distance,
            distance_percentage: distance / current_price * 100.0,
            recency_score: 1.0,
            best_candle: None,
            metadata: None,
        }
    }

    fn calculate_confluence_score(zone: &Zone) -> f64 {
        let count = zone.confluent_sources.len();
        if count == 0 {
            return 0.0;
        }

        let base_score = count as f64 * 2.0;

        let total_strength: f64 = zone.confluent_sources.iter().map(|s| s.strength).sum();
        let avg_strength = total_strength / count as f64;
        let strength_multiplier = if avg_strength > 0.0 {
            avg_strength / 5.0
        } else {
            1.0
        };

        let unique_types = zone
            .confluent_sources
            .iter()
            .map(|s| s.source_type.as_str())
            .collect::<HashSet<_>>()
            .len();
        let diversity_bonus =
            1.0 + (unique_types.saturating_sub(1)) as f64 * ANALYSIS.discovery.diversity_bonus_step;

        base_score * strength_multiplier * diversity_bonus * zone.recency_score
    }
}
