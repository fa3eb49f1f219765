//! In-memory [`MapProvider`] for servers, command line tools and tests.
//!
//! Nothing is drawn. The provider keeps the full state a real map library
//! would hold (maps, features, popups, click listeners and geolocation
//! watches) and exposes simulation methods that stand in for user input.
//! Each simulation returns the [`MapEvent`]s a browser provider would have
//! queued, for the host to feed back into the map.

use crate::{
    core::{
        constants::{MAX_ZOOM, MIN_ZOOM},
        geo::LatLng,
        viewport::Viewport,
    },
    input::events::{GeolocationError, MapEvent, PositionSample},
    layers::tile::TileLayerOptions,
    prelude::{HashMap, HashSet},
    traits::{
        CircleOptions, FeatureId, ListenerId, MapId, MapProvider, MarkerOptions, PopupId, WatchId,
    },
    ui::popup::PopupContent,
    MapError, Result,
};
use async_trait::async_trait;

/// A feature held by the headless provider
#[derive(Debug, Clone, PartialEq)]
pub enum HeadlessFeature {
    Tiles { map: MapId, options: TileLayerOptions },
    Marker { map: MapId, options: MarkerOptions },
    Circle { map: MapId, options: CircleOptions },
}

impl HeadlessFeature {
    fn map(&self) -> MapId {
        match self {
            HeadlessFeature::Tiles { map, .. }
            | HeadlessFeature::Marker { map, .. }
            | HeadlessFeature::Circle { map, .. } => *map,
        }
    }
}

/// A free-standing popup
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessPopup {
    pub map: MapId,
    pub position: LatLng,
    pub content: PopupContent,
    pub open: bool,
}

#[derive(Debug, Clone)]
struct HeadlessMap {
    container: String,
    viewport: Viewport,
}

#[derive(Debug)]
pub struct HeadlessProvider {
    next_handle: u64,
    zoom_range: (u8, u8),
    maps: HashMap<MapId, HeadlessMap>,
    features: HashMap<FeatureId, HeadlessFeature>,
    popups: HashMap<PopupId, HeadlessPopup>,
    listeners: HashMap<ListenerId, MapId>,
    watches: HashSet<WatchId>,
    load_failure: Option<String>,
    geolocation_failure: Option<GeolocationError>,
}

impl Default for HeadlessProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessProvider {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            zoom_range: (MIN_ZOOM, MAX_ZOOM),
            maps: HashMap::default(),
            features: HashMap::default(),
            popups: HashMap::default(),
            listeners: HashMap::default(),
            watches: HashSet::default(),
            load_failure: None,
            geolocation_failure: None,
        }
    }

    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.zoom_range = (min_zoom, max_zoom.max(min_zoom));
        self
    }

    /// Makes `create_map` fail, as when the map library cannot load
    pub fn failing_load(mut self, reason: impl Into<String>) -> Self {
        self.load_failure = Some(reason.into());
        self
    }

    /// Makes `watch_position` fail with `error`
    pub fn with_geolocation_error(mut self, error: GeolocationError) -> Self {
        self.geolocation_failure = Some(error);
        self
    }

    fn next_handle(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn check_map(&self, map: MapId) -> Result<()> {
        if self.maps.contains_key(&map) {
            Ok(())
        } else {
            Err(MapError::Provider(format!("{} does not exist", map)))
        }
    }

    fn check_position(position: LatLng) -> Result<()> {
        if position.is_valid() {
            Ok(())
        } else {
            Err(MapError::InvalidCoordinates(format!("{:?}", position)))
        }
    }

    // Simulated input

    /// A click on the bare map surface. Returns one event per click listener
    /// registered on `map`.
    pub fn click(&self, map: MapId, lat_lng: LatLng) -> Vec<MapEvent> {
        let mut listeners: Vec<ListenerId> = self
            .listeners
            .iter()
            .filter(|(_, owner)| **owner == map)
            .map(|(listener, _)| *listener)
            .collect();
        listeners.sort();
        listeners
            .into_iter()
            .map(|listener| MapEvent::Click { listener, lat_lng })
            .collect()
    }

    /// A click on a marker; returns the popup that opens, if the marker has one
    pub fn click_feature(&self, feature: FeatureId) -> Option<PopupContent> {
        match self.features.get(&feature) {
            Some(HeadlessFeature::Marker { options, .. }) => options.popup.clone(),
            _ => None,
        }
    }

    /// The user pans or zooms; the zoom is clamped like a real map would
    pub fn pan_to(&mut self, map: MapId, viewport: Viewport) -> Option<MapEvent> {
        let (min_zoom, max_zoom) = self.zoom_range;
        let state = self.maps.get_mut(&map)?;
        state.viewport = viewport.clamped(min_zoom, max_zoom);
        Some(MapEvent::ViewChanged {
            map,
            viewport: state.viewport,
        })
    }

    /// The user dismisses a popup
    pub fn close_popup_by_user(&mut self, popup: PopupId) {
        if let Some(state) = self.popups.get_mut(&popup) {
            state.open = false;
        }
    }

    /// The device reports a position fix to every active watch
    pub fn deliver_position(&self, sample: PositionSample) -> Vec<MapEvent> {
        self.sorted_watches()
            .into_iter()
            .map(|watch| MapEvent::Position { watch, sample })
            .collect()
    }

    /// The device reports a geolocation failure to every active watch
    pub fn fail_position(&self, error: GeolocationError) -> Vec<MapEvent> {
        self.sorted_watches()
            .into_iter()
            .map(|watch| MapEvent::PositionError { watch, error })
            .collect()
    }

    fn sorted_watches(&self) -> Vec<WatchId> {
        let mut watches: Vec<WatchId> = self.watches.iter().copied().collect();
        watches.sort();
        watches
    }

    // Inspection

    pub fn map_count(&self) -> usize {
        self.maps.len()
    }

    pub fn container(&self, map: MapId) -> Option<&str> {
        self.maps.get(&map).map(|state| state.container.as_str())
    }

    pub fn feature(&self, feature: FeatureId) -> Option<&HeadlessFeature> {
        self.features.get(&feature)
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn tile_layers(&self, map: MapId) -> Vec<&TileLayerOptions> {
        self.features
            .values()
            .filter_map(|feature| match feature {
                HeadlessFeature::Tiles { map: owner, options } if *owner == map => Some(options),
                _ => None,
            })
            .collect()
    }

    /// Markers on `map`, in creation order
    pub fn markers(&self, map: MapId) -> Vec<(FeatureId, &MarkerOptions)> {
        let mut markers: Vec<(FeatureId, &MarkerOptions)> = self
            .features
            .iter()
            .filter_map(|(id, feature)| match feature {
                HeadlessFeature::Marker { map: owner, options } if *owner == map => {
                    Some((*id, options))
                }
                _ => None,
            })
            .collect();
        markers.sort_by_key(|(id, _)| *id);
        markers
    }

    pub fn marker(&self, feature: FeatureId) -> Option<&MarkerOptions> {
        match self.features.get(&feature) {
            Some(HeadlessFeature::Marker { options, .. }) => Some(options),
            _ => None,
        }
    }

    pub fn circles(&self, map: MapId) -> Vec<(FeatureId, &CircleOptions)> {
        let mut circles: Vec<(FeatureId, &CircleOptions)> = self
            .features
            .iter()
            .filter_map(|(id, feature)| match feature {
                HeadlessFeature::Circle { map: owner, options } if *owner == map => {
                    Some((*id, options))
                }
                _ => None,
            })
            .collect();
        circles.sort_by_key(|(id, _)| *id);
        circles
    }

    pub fn popup(&self, popup: PopupId) -> Option<&HeadlessPopup> {
        self.popups.get(&popup)
    }

    /// Contents of every open free-standing popup
    pub fn open_popups(&self) -> Vec<&PopupContent> {
        let mut open: Vec<(&PopupId, &HeadlessPopup)> =
            self.popups.iter().filter(|(_, popup)| popup.open).collect();
        open.sort_by_key(|(id, _)| **id);
        open.into_iter().map(|(_, popup)| &popup.content).collect()
    }

    pub fn active_listeners(&self) -> usize {
        self.listeners.len()
    }

    pub fn active_watches(&self) -> usize {
        self.watches.len()
    }
}

#[async_trait(?Send)]
impl MapProvider for HeadlessProvider {
    fn name(&self) -> &str {
        "headless"
    }

    fn zoom_range(&self) -> (u8, u8) {
        self.zoom_range
    }

    async fn create_map(&mut self, container: &str, viewport: Viewport) -> Result<MapId> {
        if let Some(reason) = &self.load_failure {
            return Err(MapError::Provider(reason.clone()));
        }
        Self::check_position(viewport.center)?;

        let map = MapId(self.next_handle());
        let (min_zoom, max_zoom) = self.zoom_range;
        self.maps.insert(
            map,
            HeadlessMap {
                container: container.to_string(),
                viewport: viewport.clamped(min_zoom, max_zoom),
            },
        );
        Ok(map)
    }

    fn destroy_map(&mut self, map: MapId) {
        if self.maps.remove(&map).is_none() {
            return;
        }
        self.features.retain(|_, feature| feature.map() != map);
        self.popups.retain(|_, popup| popup.map != map);
        self.listeners.retain(|_, owner| *owner != map);
    }

    fn add_tile_layer(&mut self, map: MapId, options: &TileLayerOptions) -> Result<FeatureId> {
        self.check_map(map)?;
        let feature = FeatureId(self.next_handle());
        self.features.insert(
            feature,
            HeadlessFeature::Tiles {
                map,
                options: options.clone(),
            },
        );
        Ok(feature)
    }

    fn viewport(&self, map: MapId) -> Result<Viewport> {
        self.maps
            .get(&map)
            .map(|state| state.viewport)
            .ok_or_else(|| MapError::Provider(format!("{} does not exist", map)))
    }

    fn set_viewport(&mut self, map: MapId, viewport: Viewport) -> Result<()> {
        Self::check_position(viewport.center)?;
        let (min_zoom, max_zoom) = self.zoom_range;
        let state = self
            .maps
            .get_mut(&map)
            .ok_or_else(|| MapError::Provider(format!("{} does not exist", map)))?;
        state.viewport = viewport.clamped(min_zoom, max_zoom);
        Ok(())
    }

    fn create_marker(&mut self, map: MapId, options: MarkerOptions) -> Result<FeatureId> {
        self.check_map(map)?;
        Self::check_position(options.position)?;
        let feature = FeatureId(self.next_handle());
        self.features
            .insert(feature, HeadlessFeature::Marker { map, options });
        Ok(feature)
    }

    fn create_circle(&mut self, map: MapId, options: CircleOptions) -> Result<FeatureId> {
        self.check_map(map)?;
        Self::check_position(options.center)?;
        let feature = FeatureId(self.next_handle());
        self.features
            .insert(feature, HeadlessFeature::Circle { map, options });
        Ok(feature)
    }

    fn move_feature(&mut self, feature: FeatureId, position: LatLng) -> Result<()> {
        Self::check_position(position)?;
        match self.features.get_mut(&feature) {
            Some(HeadlessFeature::Marker { options, .. }) => options.position = position,
            Some(HeadlessFeature::Circle { options, .. }) => options.center = position,
            Some(HeadlessFeature::Tiles { .. }) => {
                return Err(MapError::Provider(format!("{} is a tile layer", feature)))
            }
            None => return Err(MapError::Provider(format!("{} does not exist", feature))),
        }
        Ok(())
    }

    fn set_circle_radius(&mut self, feature: FeatureId, radius_meters: f64) -> Result<()> {
        match self.features.get_mut(&feature) {
            Some(HeadlessFeature::Circle { options, .. }) => {
                options.radius_meters = radius_meters.max(0.0);
                Ok(())
            }
            _ => Err(MapError::Provider(format!("{} is not a circle", feature))),
        }
    }

    fn remove_feature(&mut self, feature: FeatureId) {
        self.features.remove(&feature);
    }

    fn create_popup(
        &mut self,
        map: MapId,
        position: LatLng,
        content: PopupContent,
    ) -> Result<PopupId> {
        self.check_map(map)?;
        Self::check_position(position)?;
        let popup = PopupId(self.next_handle());
        self.popups.insert(
            popup,
            HeadlessPopup {
                map,
                position,
                content,
                open: true,
            },
        );
        Ok(popup)
    }

    fn update_popup(
        &mut self,
        popup: PopupId,
        position: LatLng,
        content: PopupContent,
    ) -> Result<()> {
        Self::check_position(position)?;
        let state = self
            .popups
            .get_mut(&popup)
            .ok_or_else(|| MapError::Provider(format!("{} does not exist", popup)))?;
        state.position = position;
        state.content = content;
        state.open = true;
        Ok(())
    }

    fn close_popup(&mut self, popup: PopupId) {
        self.popups.remove(&popup);
    }

    fn listen_clicks(&mut self, map: MapId) -> Result<ListenerId> {
        self.check_map(map)?;
        let listener = ListenerId(self.next_handle());
        self.listeners.insert(listener, map);
        Ok(listener)
    }

    fn unlisten(&mut self, listener: ListenerId) {
        self.listeners.remove(&listener);
    }

    fn watch_position(&mut self) -> std::result::Result<WatchId, GeolocationError> {
        if let Some(error) = self.geolocation_failure {
            return Err(error);
        }
        let watch = WatchId(self.next_handle());
        self.watches.insert(watch);
        Ok(watch)
    }

    fn clear_watch(&mut self, watch: WatchId) {
        self.watches.remove(&watch);
    }
}
