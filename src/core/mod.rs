pub mod config;
pub mod constants;
pub mod facility_map;
pub mod geo;
pub mod map;
pub mod storage;
pub mod viewport;

pub use config::{AppConfig, MapConfig, MapLabels};
pub use facility_map::FacilityMap;
pub use geo::LatLng;
pub use map::{MapSurface, PersistTimer, SurfaceState};
pub use storage::{KeyValueStore, MemoryStore};
pub use viewport::Viewport;
