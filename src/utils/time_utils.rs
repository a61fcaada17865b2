use chrono::DateTime;

pub struct TimeUtils;

impl TimeUtils {
    pub const MS_IN_S: i64 = 1000;
    pub const MS_IN_MIN: i64 = Self::MS_IN_S * 60;
    pub const MS_IN_5_MIN: i64 = Self::MS_IN_S * 60 * 5;
    pub const MS_IN_15_MIN: i64 = Self::MS_IN_S * 60 * 15;
    pub const MS_IN_H: i64 = Self::MS_IN_MIN * 60;
    pub const MS_IN_D: i64 = Self::MS_IN_H * 24;
    pub const MS_IN_W: i64 = Self::MS_IN_D * 7;
    pub const STANDARD_TIME_FORMAT: &str = "%Y-%m-%d";
}

// Time Helper functions

pub fn epoch_ms_to_utc(epoch_ms: i64) -> String {
    // Used for display purposes
    epoch_sec_to_utc(epoch_ms / 1000)
}

pub fn epoch_sec_to_utc(epoch_sec: i64) -> String {
    // Used for display purposes
    let dt = DateTime::from_timestamp(epoch_sec, 0).unwrap_or_default();
    format!("{}", dt.format(TimeUtils::STANDARD_TIME_FORMAT))
}

/// Whole calendar days between two epoch-ms instants (negative when `later`
/// precedes `earlier`).
pub fn days_between_ms(earlier_ms: i64, later_ms: i64) -> i64 {
    (later_ms - earlier_ms) / TimeUtils::MS_IN_D
}
