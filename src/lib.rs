//! # stellerom-map
//!
//! Interactive map of public changing-room facilities.
//!
//! The crate is split the same way the map is used: a [`MapSurface`] owns the
//! viewport and base layer, a [`FacilityRenderer`] turns facility snapshots
//! into clickable markers, and a [`ModeController`] runs the exclusive
//! interaction modes (idle browsing, live position tracking and placing a new
//! facility). All of them talk to the map library through the
//! [`MapProvider`] capability trait, so swapping Leaflet for another provider
//! never touches the state machine.

pub mod core;
pub mod data;
pub mod input;
pub mod layers;
pub mod prelude;
pub mod providers;
pub mod services;
pub mod traits;
pub mod ui;

pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    config::{AppConfig, MapConfig},
    facility_map::FacilityMap,
    geo::LatLng,
    map::{MapSurface, PersistTimer, SurfaceState},
    storage::{KeyValueStore, MemoryStore},
    viewport::Viewport,
};

pub use data::facility::{Facility, Ratings, StarRating};

pub use input::{
    events::{GeolocationError, MapEvent, PositionSample},
    modes::{Mode, ModeController, PlacementHandOff},
};

pub use layers::{facilities::FacilityRenderer, facilities::FeatureSet, tile::TileLayerOptions};

pub use providers::headless::HeadlessProvider;

pub use services::room_api::RoomApiClient;

pub use traits::{FeatureId, ListenerId, MapId, MapProvider, PopupId, WatchId};

pub use ui::{popup::PopupContent, status::StatusLine};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Map is not ready: {0}")]
    NotReady(String),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Room API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Config error: {0}")]
    Config(String),
}

/// Error type alias for convenience
pub type Error = MapError;
