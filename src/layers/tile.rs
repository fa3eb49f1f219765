use crate::core::constants::{MAX_ZOOM, MIN_ZOOM, OSM_ATTRIBUTION, OSM_TILE_URL};
use serde::{Deserialize, Serialize};

/// Base raster layer drawn under every other feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileLayerOptions {
    pub url_template: String,
    pub attribution: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl TileLayerOptions {
    /// Standard OpenStreetMap tiles
    pub fn openstreetmap() -> Self {
        Self {
            url_template: OSM_TILE_URL.to_string(),
            attribution: OSM_ATTRIBUTION.to_string(),
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
        }
    }
}

impl Default for TileLayerOptions {
    fn default() -> Self {
        Self::openstreetmap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openstreetmap_options() {
        let options = TileLayerOptions::openstreetmap();
        assert_eq!(options.url_template, "https://tile.openstreetmap.org/{z}/{x}/{y}.png");
        assert!(options.attribution.contains("OpenStreetMap"));
        assert_eq!(options.max_zoom, 19);
    }
}
