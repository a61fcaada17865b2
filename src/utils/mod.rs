mod maths_utils;
mod time_utils;

pub use time_utils::{TimeUtils, days_between_ms, epoch_ms_to_utc, epoch_sec_to_utc};

pub(crate) use maths_utils::{get_max, percentile_of};
