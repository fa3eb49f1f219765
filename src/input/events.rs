use crate::{
    core::{geo::LatLng, viewport::Viewport},
    traits::{ListenerId, MapId, WatchId},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One fix from the device geolocation capability
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub lat_lng: LatLng,
    pub accuracy_meters: f64,
    /// Milliseconds since the Unix epoch, as reported by the device
    pub timestamp_ms: u64,
}

impl PositionSample {
    pub fn new(lat_lng: LatLng, accuracy_meters: f64, timestamp_ms: u64) -> Self {
        Self {
            lat_lng,
            accuracy_meters,
            timestamp_ms,
        }
    }
}

/// Reasons the geolocation capability can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeolocationError {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    /// No geolocation capability on this platform
    Unsupported,
}

impl GeolocationError {
    /// Maps the W3C `GeolocationPositionError.code` values
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => GeolocationError::PermissionDenied,
            2 => GeolocationError::PositionUnavailable,
            3 => GeolocationError::Timeout,
            _ => GeolocationError::Unsupported,
        }
    }

    /// Fatal errors end the subscription; the others may be followed by
    /// further samples
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GeolocationError::PermissionDenied | GeolocationError::Unsupported
        )
    }

    pub fn message(&self) -> &'static str {
        match self {
            GeolocationError::PermissionDenied => {
                "Location access was denied. Allow location access to show your position."
            }
            GeolocationError::PositionUnavailable => "Your position is currently unavailable.",
            GeolocationError::Timeout => "Finding your position took too long.",
            GeolocationError::Unsupported => "This device cannot share its position.",
        }
    }
}

impl fmt::Display for GeolocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for GeolocationError {}

/// Callbacks from the map provider, delivered by the host in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// The user finished panning or zooming
    ViewChanged { map: MapId, viewport: Viewport },
    /// A click on the map surface, addressed to a click listener
    Click { listener: ListenerId, lat_lng: LatLng },
    /// A position fix for a geolocation subscription
    Position { watch: WatchId, sample: PositionSample },
    /// A failure reported by a geolocation subscription
    PositionError { watch: WatchId, error: GeolocationError },
}

impl MapEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            MapEvent::ViewChanged { .. } => "viewchanged",
            MapEvent::Click { .. } => "click",
            MapEvent::Position { .. } => "position",
            MapEvent::PositionError { .. } => "positionerror",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(GeolocationError::from_code(1), GeolocationError::PermissionDenied);
        assert_eq!(GeolocationError::from_code(2), GeolocationError::PositionUnavailable);
        assert_eq!(GeolocationError::from_code(3), GeolocationError::Timeout);
        assert_eq!(GeolocationError::from_code(0), GeolocationError::Unsupported);
    }

    #[test]
    fn test_fatal_errors() {
        assert!(GeolocationError::PermissionDenied.is_fatal());
        assert!(GeolocationError::Unsupported.is_fatal());
        assert!(!GeolocationError::Timeout.is_fatal());
        assert!(!GeolocationError::PositionUnavailable.is_fatal());
    }

    #[test]
    fn test_event_type() {
        let event = MapEvent::Click {
            listener: ListenerId(1),
            lat_lng: LatLng::new(60.0, 10.0),
        };
        assert_eq!(event.event_type(), "click");
    }
}
