pub mod facilities;
pub mod tile;

pub use facilities::{FacilityRenderer, FeatureSet};
pub use tile::TileLayerOptions;
