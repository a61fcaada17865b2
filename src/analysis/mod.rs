// Analysis engines: profile -> HVN -> discovery -> validation
mod hvn_engine;
mod scanner;
mod tiering;
mod volume_profile;
mod zone_discovery;
mod zone_validation;

pub use hvn_engine::HvnEngine;
pub use scanner::{ScanResult, ZoneScanner};
pub use tiering::TierPolicy;
pub use volume_profile::{build_volume_profile, build_volume_profile_with_levels};
pub use zone_discovery::{ConfluenceSources, DiscoveryMode, ZoneDiscoveryEngine};
pub use zone_validation::ZoneValidator;
