pub mod events;
pub mod modes;

// Re-export the essential types
pub use events::{GeolocationError, MapEvent, PositionSample};
pub use modes::{Mode, ModeController, PlacementHandOff, PlacementSession, TrackingSession};
