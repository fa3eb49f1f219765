use crate::core::{
    constants::{DEFAULT_CENTER, DEFAULT_ZOOM, MAX_ZOOM, MIN_ZOOM},
    geo::LatLng,
};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};

/// The current view of the map: center and zoom.
///
/// This is also the persisted form, serialized as
/// `{"center":{"lat":..,"lng":..},"zoom":..}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// The center of the map view in geographical coordinates
    pub center: LatLng,
    /// The current zoom level
    pub zoom: u8,
}

impl Viewport {
    /// Creates a new viewport, clamping zoom to the default provider range
    pub fn new(center: LatLng, zoom: u8) -> Self {
        Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    /// Returns a copy with zoom clamped to `[min_zoom, max_zoom]`
    pub fn clamped(self, min_zoom: u8, max_zoom: u8) -> Self {
        Self {
            center: self.center,
            zoom: self.zoom.clamp(min_zoom, max_zoom.max(min_zoom)),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.center.is_valid()
    }

    /// Serializes the viewport for storage
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a stored viewport, rejecting out-of-range centers
    pub fn from_json(raw: &str) -> Result<Self> {
        let viewport: Viewport = serde_json::from_str(raw)?;
        if !viewport.is_valid() {
            return Err(MapError::InvalidCoordinates(format!(
                "stored center {} is out of range",
                viewport.center
            )));
        }
        Ok(viewport)
    }

    /// Resolves the viewport to start from: the stored one when present and
    /// well formed, otherwise `fallback`. Never fails.
    pub fn from_stored(raw: Option<&str>, fallback: Viewport) -> Self {
        match raw {
            None => fallback,
            Some(raw) => match Self::from_json(raw) {
                Ok(viewport) => viewport,
                Err(e) => {
                    log::warn!("Discarding malformed stored viewport {:?}: {}", raw, e);
                    fallback
                }
            },
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(LatLng::new(DEFAULT_CENTER.0, DEFAULT_CENTER.1), DEFAULT_ZOOM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_viewport() {
        let viewport = Viewport::default();
        assert_eq!(viewport.center, LatLng::new(64.68, 9.39));
        assert_eq!(viewport.zoom, 4);
    }

    #[test]
    fn test_zoom_limits() {
        let viewport = Viewport::new(LatLng::new(0.0, 0.0), 30);
        assert_eq!(viewport.zoom, MAX_ZOOM);

        let viewport = Viewport::new(LatLng::new(0.0, 0.0), 1).clamped(2, 15);
        assert_eq!(viewport.zoom, 2);

        let viewport = Viewport::new(LatLng::new(0.0, 0.0), 18).clamped(2, 15);
        assert_eq!(viewport.zoom, 15);
    }

    #[test]
    fn test_persisted_round_trip() {
        let samples = [
            Viewport::default(),
            Viewport::new(LatLng::new(59.9139, 10.7522), 12),
            Viewport::new(LatLng::new(-33.8688, 151.2093), 0),
            Viewport::new(LatLng::new(90.0, -180.0), 19),
            Viewport::new(LatLng::new(0.1 + 0.2, 1.0 / 3.0), 7),
        ];

        for viewport in samples {
            let raw = viewport.to_json().unwrap();
            assert_eq!(Viewport::from_json(&raw).unwrap(), viewport);
        }
    }

    #[test]
    fn test_serialized_shape() {
        let raw = Viewport::new(LatLng::new(60.0, 10.0), 8).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["center"]["lat"], 60.0);
        assert_eq!(value["center"]["lng"], 10.0);
        assert_eq!(value["zoom"], 8);
    }

    #[test]
    fn test_malformed_values_fall_back() {
        let fallback = Viewport::default();
        let malformed = [
            "",
            "null",
            "not json",
            "{}",
            "[64.68, 9.39, 4]",
            r#"{"center":{"lat":"north","lng":9.39},"zoom":4}"#,
            r#"{"center":{"lat":64.68},"zoom":4}"#,
            r#"{"center":{"lat":64.68,"lng":9.39},"zoom":4.5}"#,
            r#"{"center":{"lat":64.68,"lng":9.39},"zoom":-1}"#,
            r#"{"center":{"lat":164.68,"lng":9.39},"zoom":4}"#,
            r#"{"center":{"lat":64.68,"lng":209.39},"zoom":4}"#,
        ];

        for raw in malformed {
            assert_eq!(Viewport::from_stored(Some(raw), fallback), fallback, "{raw}");
        }
        assert_eq!(Viewport::from_stored(None, fallback), fallback);
    }

    #[test]
    fn test_stored_viewport_is_used() {
        let stored = r#"{"center":{"lat":59.0,"lng":10.0},"zoom":11}"#;
        let viewport = Viewport::from_stored(Some(stored), Viewport::default());
        assert_eq!(viewport, Viewport::new(LatLng::new(59.0, 10.0), 11));
    }
}
