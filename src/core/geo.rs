use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a geographical coordinate with latitude and longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new LatLng coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Builds a coordinate from a GeoJSON position, which is `[lng, lat]`
    pub fn from_geojson_position(position: [f64; 2]) -> Self {
        Self::new(position[1], position[0])
    }

    /// Validates that the coordinates are finite and within valid ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && self.lat >= -90.0
            && self.lat <= 90.0
            && self.lng >= -180.0
            && self.lng <= 180.0
    }

    /// Wraps longitude to [-180, 180] range
    pub fn wrap_lng(lng: f64) -> f64 {
        let wrapped = lng % 360.0;
        if wrapped > 180.0 {
            wrapped - 360.0
        } else if wrapped < -180.0 {
            wrapped + 360.0
        } else {
            wrapped
        }
    }

    /// Returns the coordinate with longitude wrapped, as map clicks past the
    /// antimeridian report longitudes outside [-180, 180]
    pub fn wrapped(&self) -> LatLng {
        LatLng::new(self.lat, Self::wrap_lng(self.lng))
    }

    /// Formats the latitude for use in query strings
    pub fn lat_param(&self) -> String {
        format_coordinate(self.lat)
    }

    /// Formats the longitude for use in query strings
    pub fn lng_param(&self) -> String {
        format_coordinate(self.lng)
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lng)
    }
}

/// Prints a coordinate component so it always carries a decimal point,
/// `60` becomes `60.0` and `59.9139` stays as is.
pub fn format_coordinate(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}
