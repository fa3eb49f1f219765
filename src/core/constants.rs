//! Map-wide defaults. Everything here can be overridden through
//! [`MapConfig`](crate::core::config::MapConfig); these are the values used
//! when nothing else is known.

/// Fallback center when no viewport was persisted: the middle of Norway.
pub const DEFAULT_CENTER: (f64, f64) = (64.68, 9.39);

/// Fallback zoom, showing the whole country.
pub const DEFAULT_ZOOM: u8 = 4;

/// Zoom used when the first position sample recentres the map.
pub const TRACKING_ZOOM: u8 = 15;

/// Zoom range accepted by the OpenStreetMap tile server.
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 19;

/// Storage key holding the last viewed viewport.
pub const VIEWPORT_STORAGE_KEY: &str = "stellerom.viewport";

/// How often the viewport is written back to storage.
pub const DEFAULT_PERSIST_INTERVAL_MS: u64 = 5_000;

/// OpenStreetMap raster tiles.
pub const OSM_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const OSM_ATTRIBUTION: &str =
    "&copy; <a href=\"http://www.openstreetmap.org/copyright\">OpenStreetMap</a>";

/// Facility detail page, `{id}` is substituted.
pub const DEFAULT_DETAIL_PATH: &str = "/rooms/{id}";

/// Facility creation page receiving `lat` and `lng` query parameters.
pub const DEFAULT_CREATE_PATH: &str = "/new-room";

/// Room API endpoints used when the environment does not override them.
pub const DEFAULT_ROOM_API: &str = "https://room-api-dev.stellerom.no";
pub const DEFAULT_REVIEW_API: &str = "https://review-api-dev.stellerom.no";
