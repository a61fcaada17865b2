#![allow(clippy::collapsible_if)]
#![allow(clippy::collapsible_else_if)]
#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]

// Core modules
pub mod analysis;
pub mod config;
pub mod domain;
pub mod models;
pub mod utils;

// Re-export commonly used types outside of crate
pub use analysis::{
    DiscoveryMode, HvnEngine, ScanResult, TierPolicy, ZoneDiscoveryEngine, ZoneScanner,
    ZoneValidator, build_volume_profile,
};
pub use domain::{Candle, MarketSession, SymbolInterval};
pub use models::{
    BarSeries, ConfluenceItem, ConfluenceLevel, HvnCluster, HvnResult, MarketMetrics,
    PocAnchorZone, TimeframeResult, ValidationResult, VolumeProfileResult, Zone,
};
