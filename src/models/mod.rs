mod hvn;
mod ohlcv;
mod profile;
mod zone;

pub use hvn::{
    HvnCluster, HvnResult, PocAnchorMetadata, PocAnchorSet, PocAnchorZone, TimeframeResult,
    VolumePeak,
};
pub use ohlcv::BarSeries;
pub use profile::{PriceLevel, VolumeProfileResult};
pub use zone::{
    BestCandle, ConfluenceItem, ConfluenceLevel, MarketMetrics, ValidationResult, Zone,
    ZoneMetadata, ZoneType,
};
