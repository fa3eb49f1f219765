//! The capability interface between the map logic and a concrete map library.
//!
//! Everything the surface, renderer and mode controller do to a map goes
//! through [`MapProvider`]. Providers hand out opaque handles; every handle
//! that is allocated has a matching release call, and releasing an unknown or
//! already released handle is a no-op.

use crate::{
    core::{
        constants::{MAX_ZOOM, MIN_ZOOM},
        geo::LatLng,
        viewport::Viewport,
    },
    input::events::GeolocationError,
    layers::tile::TileLayerOptions,
    ui::popup::PopupContent,
    Result,
};
use async_trait::async_trait;
use std::fmt;

macro_rules! handle_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

handle_id!(
    /// A live map instance bound to a render target
    MapId,
    "map"
);
handle_id!(
    /// A rendered feature: marker, circle or tile layer
    FeatureId,
    "feature"
);
handle_id!(
    /// A free-standing popup not bound to a feature
    PopupId,
    "popup"
);
handle_id!(
    /// A map click subscription
    ListenerId,
    "listener"
);
handle_id!(
    /// A continuous geolocation subscription
    WatchId,
    "watch"
);

/// Visual variants of point markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerIcon {
    /// A facility pin
    #[default]
    Facility,
    /// The pending location while placing a new facility
    Pending,
    /// The user's current position
    Position,
}

/// A point marker, optionally with a tooltip and a popup opened on click
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerOptions {
    pub position: LatLng,
    pub icon: MarkerIcon,
    pub tooltip: Option<String>,
    pub popup: Option<PopupContent>,
}

impl MarkerOptions {
    pub fn new(position: LatLng) -> Self {
        Self {
            position,
            icon: MarkerIcon::default(),
            tooltip: None,
            popup: None,
        }
    }

    pub fn with_icon(mut self, icon: MarkerIcon) -> Self {
        self.icon = icon;
        self
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    pub fn with_popup(mut self, popup: PopupContent) -> Self {
        self.popup = Some(popup);
        self
    }
}

/// A circle with a radius in meters, e.g. position accuracy
#[derive(Debug, Clone, PartialEq)]
pub struct CircleOptions {
    pub center: LatLng,
    pub radius_meters: f64,
    pub color: String,
    pub fill_opacity: f32,
}

impl CircleOptions {
    /// Translucent accuracy halo around a position fix
    pub fn accuracy(center: LatLng, radius_meters: f64) -> Self {
        Self {
            center,
            radius_meters: radius_meters.max(0.0),
            color: "#3388ff".to_string(),
            fill_opacity: 0.15,
        }
    }
}

/// Map library capabilities used by this crate.
///
/// Providers are single-threaded; callbacks from the library (clicks,
/// position samples, view changes) are delivered to the host as
/// [`MapEvent`](crate::input::events::MapEvent) values which it feeds back
/// through [`FacilityMap::handle_event`](crate::core::facility_map::FacilityMap::handle_event).
#[async_trait(?Send)]
pub trait MapProvider {
    fn name(&self) -> &str;

    /// Valid zoom range, inclusive
    fn zoom_range(&self) -> (u8, u8) {
        (MIN_ZOOM, MAX_ZOOM)
    }

    /// Constructs a map in `container` and waits until the provider is ready
    async fn create_map(&mut self, container: &str, viewport: Viewport) -> Result<MapId>;

    /// Detaches the map from its render target
    fn destroy_map(&mut self, map: MapId);

    fn add_tile_layer(&mut self, map: MapId, options: &TileLayerOptions) -> Result<FeatureId>;

    /// Current live center and zoom
    fn viewport(&self, map: MapId) -> Result<Viewport>;

    fn set_viewport(&mut self, map: MapId, viewport: Viewport) -> Result<()>;

    fn create_marker(&mut self, map: MapId, options: MarkerOptions) -> Result<FeatureId>;

    fn create_circle(&mut self, map: MapId, options: CircleOptions) -> Result<FeatureId>;

    /// Moves a marker or recentres a circle
    fn move_feature(&mut self, feature: FeatureId, position: LatLng) -> Result<()>;

    fn set_circle_radius(&mut self, feature: FeatureId, radius_meters: f64) -> Result<()>;

    /// Removes a feature together with any popup bound to it
    fn remove_feature(&mut self, feature: FeatureId);

    /// Opens a free-standing popup
    fn create_popup(
        &mut self,
        map: MapId,
        position: LatLng,
        content: PopupContent,
    ) -> Result<PopupId>;

    /// Moves an open popup and replaces its content, reopening it if the user closed it
    fn update_popup(&mut self, popup: PopupId, position: LatLng, content: PopupContent)
        -> Result<()>;

    fn close_popup(&mut self, popup: PopupId);

    /// Subscribes to clicks on the map surface itself (not on features)
    fn listen_clicks(&mut self, map: MapId) -> Result<ListenerId>;

    fn unlisten(&mut self, listener: ListenerId);

    /// Starts a continuous position subscription
    fn watch_position(&mut self) -> std::result::Result<WatchId, GeolocationError>;

    fn clear_watch(&mut self, watch: WatchId);
}

/// Lends a provider to a map while the caller keeps ownership
#[async_trait(?Send)]
impl<P: MapProvider + ?Sized> MapProvider for &mut P {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn zoom_range(&self) -> (u8, u8) {
        (**self).zoom_range()
    }

    async fn create_map(&mut self, container: &str, viewport: Viewport) -> Result<MapId> {
        (**self).create_map(container, viewport).await
    }

    fn destroy_map(&mut self, map: MapId) {
        (**self).destroy_map(map)
    }

    fn add_tile_layer(&mut self, map: MapId, options: &TileLayerOptions) -> Result<FeatureId> {
        (**self).add_tile_layer(map, options)
    }

    fn viewport(&self, map: MapId) -> Result<Viewport> {
        (**self).viewport(map)
    }

    fn set_viewport(&mut self, map: MapId, viewport: Viewport) -> Result<()> {
        (**self).set_viewport(map, viewport)
    }

    fn create_marker(&mut self, map: MapId, options: MarkerOptions) -> Result<FeatureId> {
        (**self).create_marker(map, options)
    }

    fn create_circle(&mut self, map: MapId, options: CircleOptions) -> Result<FeatureId> {
        (**self).create_circle(map, options)
    }

    fn move_feature(&mut self, feature: FeatureId, position: LatLng) -> Result<()> {
        (**self).move_feature(feature, position)
    }

    fn set_circle_radius(&mut self, feature: FeatureId, radius_meters: f64) -> Result<()> {
        (**self).set_circle_radius(feature, radius_meters)
    }

    fn remove_feature(&mut self, feature: FeatureId) {
        (**self).remove_feature(feature)
    }

    fn create_popup(
        &mut self,
        map: MapId,
        position: LatLng,
        content: PopupContent,
    ) -> Result<PopupId> {
        (**self).create_popup(map, position, content)
    }

    fn update_popup(&mut self, popup: PopupId, position: LatLng, content: PopupContent)
        -> Result<()> {
        (**self).update_popup(popup, position, content)
    }

    fn close_popup(&mut self, popup: PopupId) {
        (**self).close_popup(popup)
    }

    fn listen_clicks(&mut self, map: MapId) -> Result<ListenerId> {
        (**self).listen_clicks(map)
    }

    fn unlisten(&mut self, listener: ListenerId) {
        (**self).unlisten(listener)
    }

    fn watch_position(&mut self) -> std::result::Result<WatchId, GeolocationError> {
        (**self).watch_position()
    }

    fn clear_watch(&mut self, watch: WatchId) {
        (**self).clear_watch(watch)
    }
}
