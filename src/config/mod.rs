//! Configuration module for the zone-confluence engine.

mod analysis;
mod types;

// Re-export commonly used items
pub use analysis::{
    ANALYSIS, AnalysisConfig, DiscoveryConfig, HvnConfig, ProfileConfig, ScannerConfig,
    ValidationConfig,
};
pub use types::{
    ClosePrice, HighPrice, LowPrice, OpenPrice, Price, PriceLike, PriceRange, Weight,
};
