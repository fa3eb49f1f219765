//! Prelude module for common stellerom-map types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use stellerom_map::prelude::*;`

pub use crate::core::{
    config::{AppConfig, MapConfig},
    facility_map::FacilityMap,
    geo::LatLng,
    map::{MapSurface, PersistTimer, SurfaceState},
    storage::{KeyValueStore, MemoryStore},
    viewport::Viewport,
};

pub use crate::data::facility::{Facility, Ratings, StarRating};

pub use crate::input::{
    events::{GeolocationError, MapEvent, PositionSample},
    modes::{Mode, ModeController, PlacementHandOff},
};

pub use crate::layers::{
    facilities::{FacilityRenderer, FeatureSet},
    tile::TileLayerOptions,
};

pub use crate::providers::headless::HeadlessProvider;

pub use crate::services::room_api::RoomApiClient;

pub use crate::traits::{
    CircleOptions, FeatureId, ListenerId, MapId, MapProvider, MarkerIcon, MarkerOptions, PopupId,
    WatchId,
};

pub use crate::ui::{popup::PopupContent, status::StatusLine};

pub use crate::{Error as MapError, Result};

pub use instant::Instant;
pub use std::time::Duration;

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
