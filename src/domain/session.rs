use chrono::{DateTime, Timelike};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// Which slice of the UTC trading day a bar belongs to.
///
/// Boundaries follow the US cash session expressed in UTC: pre-market
/// [08:00, 13:30), regular [13:30, 20:00), post-market [20:00, 24:00).
/// The overnight stretch [00:00, 08:00) belongs to no session and is always
/// excluded from profile builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter)]
pub enum MarketSession {
    #[strum(to_string = "pre-market")]
    PreMarket,
    #[strum(to_string = "regular")]
    Regular,
    #[strum(to_string = "post-market")]
    PostMarket,
}

impl MarketSession {
    pub const PRE_START_HOUR: f64 = 8.0;
    pub const REGULAR_START_HOUR: f64 = 13.5; // 13:30 UTC
    pub const REGULAR_END_HOUR: f64 = 20.0;

    /// Classify an epoch-ms timestamp by its UTC hour-of-day.
    pub fn classify(timestamp_ms: i64) -> Option<Self> {
        let dt = DateTime::from_timestamp_millis(timestamp_ms)?;
        let hour = dt.hour() as f64 + dt.minute() as f64 / 60.0;

        if (Self::REGULAR_START_HOUR..Self::REGULAR_END_HOUR).contains(&hour) {
            Some(Self::Regular)
        } else if (Self::PRE_START_HOUR..Self::REGULAR_START_HOUR).contains(&hour) {
            Some(Self::PreMarket)
        } else if hour >= Self::REGULAR_END_HOUR {
            Some(Self::PostMarket)
        } else {
            // Overnight gap before the pre-market open
            None
        }
    }

    /// Whether a bar in this session survives the profile's include flags.
    /// The regular session is always kept.
    pub fn is_included(self, include_pre: bool, include_post: bool) -> bool {
        match self {
            Self::Regular => true,
            Self::PreMarket => include_pre,
            Self::PostMarket => include_post,
        }
    }
}
