//! Confluence tier assignment.
//!
//! Two independent tier scales exist: the cluster strategies tier by raw
//! source count, the HVN-anchored path tiers by score thresholds. Both live
//! here so neither table gets duplicated inline.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::models::ConfluenceLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter)]
pub enum TierPolicy {
    /// Tier by how many sources back the zone
    #[strum(to_string = "source-count")]
    SourceCount,
    /// Tier by the accumulated confluence score (HVN-anchored mode)
    #[strum(to_string = "score-threshold")]
    ScoreThreshold,
}

impl TierPolicy {
    pub fn tier(self, source_count: usize, score: f64) -> ConfluenceLevel {
        match self {
            Self::SourceCount => match source_count {
                10.. => ConfluenceLevel::L5,
                8..=9 => ConfluenceLevel::L4,
                6..=7 => ConfluenceLevel::L3,
                4..=5 => ConfluenceLevel::L2,
                2..=3 => ConfluenceLevel::L1,
                _ => ConfluenceLevel::L0,
            },
            Self::ScoreThreshold => {
                if score >= 12.0 {
                    ConfluenceLevel::L5
                } else if score >= 8.0 {
                    ConfluenceLevel::L4
                } else if score >= 5.0 {
                    ConfluenceLevel::L3
                } else if score >= 2.5 {
                    ConfluenceLevel::L2
                } else {
                    ConfluenceLevel::L1
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConfluenceLevel::*;

    #[test]
    fn test_count_based_tiers() {
        let policy = TierPolicy::SourceCount;
        assert_eq!(policy.tier(0, 0.0), L0);
        assert_eq!(policy.tier(1, 99.0), L0); // score is ignored
        assert_eq!(policy.tier(2, 0.0), L1);
        assert_eq!(policy.tier(3, 0.0), L1);
        assert_eq!(policy.tier(4, 0.0), L2);
        assert_eq!(policy.tier(6, 0.0), L3);
        assert_eq!(policy.tier(8, 0.0), L4);
        assert_eq!(policy.tier(10, 0.0), L5);
        assert_eq!(policy.tier(25, 0.0), L5);
    }

    #[test]
    fn test_score_based_tiers() {
        let policy = TierPolicy::ScoreThreshold;
        assert_eq!(policy.tier(99, 0.0), L1); // count is ignored
        assert_eq!(policy.tier(0, 2.4), L1);
        assert_eq!(policy.tier(0, 2.5), L2);
        assert_eq!(policy.tier(0, 5.0), L3);
        assert_eq!(policy.tier(0, 8.0), L4);
        assert_eq!(policy.tier(0, 12.0), L5);
    }
}
