use crate::{
    core::{
        config::MapConfig,
        map::{MapSurface, SurfaceState},
        storage::KeyValueStore,
        viewport::Viewport,
    },
    data::facility::Facility,
    input::{
        events::{GeolocationError, MapEvent},
        modes::{Mode, ModeController, PlacementHandOff},
    },
    layers::facilities::{FacilityRenderer, FeatureSet},
    traits::{MapId, MapProvider},
    ui::status::StatusLine,
    Result,
};
use instant::Instant;

/// The facility map: surface, facility markers and interaction modes bound
/// to one provider and one store.
///
/// Construction awaits the provider, so every method on a `FacilityMap` runs
/// after the surface either became ready or failed. Dropping the map
/// releases listeners, watches, features and the map itself.
///
/// # Examples
///
/// ```rust
/// use stellerom_map::prelude::*;
///
/// # tokio_test_block_on(async {
/// let mut map = FacilityMap::initialize(
///     HeadlessProvider::new(),
///     MemoryStore::new(),
///     "map",
///     MapConfig::default(),
/// )
/// .await;
///
/// assert_eq!(map.status().as_str(), "find and review a facility");
/// map.start_placing().unwrap();
/// assert_eq!(map.status().as_str(), "placing a facility — click the map");
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
pub struct FacilityMap<P: MapProvider, S: KeyValueStore> {
    provider: P,
    storage: S,
    config: MapConfig,
    surface: MapSurface,
    renderer: FacilityRenderer,
    controller: ModeController,
    torn_down: bool,
}

impl<P: MapProvider, S: KeyValueStore> FacilityMap<P, S> {
    pub async fn initialize(mut provider: P, storage: S, container: &str, config: MapConfig) -> Self {
        let surface = MapSurface::initialize(&mut provider, container, &storage, &config).await;
        let controller = ModeController::new(config.clone());

        Self {
            provider,
            storage,
            config,
            surface,
            renderer: FacilityRenderer::new(),
            controller,
            torn_down: false,
        }
    }

    pub fn status(&self) -> StatusLine {
        self.controller.status(self.surface.state())
    }

    pub fn surface_state(&self) -> &SurfaceState {
        self.surface.state()
    }

    pub fn map_id(&self) -> Result<MapId> {
        self.surface.map_id()
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn viewport(&self) -> Viewport {
        self.surface.viewport(&self.provider)
    }

    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.surface.set_viewport(&mut self.provider, viewport)
    }

    /// Writes the viewport now if it changed since the last write
    pub fn persist_viewport(&mut self) -> Result<bool> {
        self.surface
            .persist_viewport(&self.provider, &mut self.storage)
    }

    /// Called periodically by the host; persists the viewport once per
    /// configured interval
    pub fn tick(&mut self, now: Instant) -> Result<bool> {
        self.surface.tick(&self.provider, &mut self.storage, now)
    }

    /// Replaces the rendered facilities with `facilities`
    pub fn render_facilities(&mut self, facilities: &[Facility]) -> Result<&FeatureSet> {
        let map = self.surface.map_id()?;
        Ok(self
            .renderer
            .render(&mut self.provider, map, facilities, &self.config))
    }

    pub fn features(&self) -> &FeatureSet {
        self.renderer.features()
    }

    pub fn mode(&self) -> &Mode {
        self.controller.mode()
    }

    pub fn last_error(&self) -> Option<GeolocationError> {
        self.controller.last_error()
    }

    pub fn error_message(&self) -> Option<&'static str> {
        self.controller.error_message()
    }

    pub fn track_position(&mut self) -> Result<()> {
        self.controller
            .track_position(&mut self.provider, &mut self.surface)
    }

    pub fn stop_tracking(&mut self) {
        self.controller.stop_tracking(&mut self.provider);
    }

    pub fn start_placing(&mut self) -> Result<()> {
        self.controller
            .start_placing(&mut self.provider, &self.surface)
    }

    pub fn cancel_placing(&mut self) {
        self.controller.cancel_placing(&mut self.provider);
    }

    pub fn exit_mode(&mut self) {
        self.controller.exit(&mut self.provider);
    }

    pub fn confirm_placement(&self) -> Option<PlacementHandOff> {
        self.controller.confirm_placement()
    }

    /// Applies one provider callback
    pub fn handle_event(&mut self, event: &MapEvent) -> Result<()> {
        if self.torn_down {
            log::debug!("Dropping {} after teardown", event.event_type());
            return Ok(());
        }
        self.controller
            .handle_event(&mut self.provider, &mut self.surface, event)
    }

    /// Applies callbacks in arrival order. A failing event is logged and
    /// does not stop the ones after it.
    pub fn handle_events<I>(&mut self, events: I)
    where
        I: IntoIterator<Item = MapEvent>,
    {
        for event in events {
            if let Err(e) = self.handle_event(&event) {
                log::error!("Handling {} failed: {}", event.event_type(), e);
            }
        }
    }

    /// Leaves the active mode, removes all features, persists the final
    /// viewport and detaches the map. Later calls do nothing.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        self.controller.exit(&mut self.provider);
        self.renderer.clear(&mut self.provider);
        if let Err(e) = self
            .surface
            .persist_viewport(&self.provider, &mut self.storage)
        {
            log::warn!("Could not persist the final viewport: {}", e);
        }
        self.surface.teardown(&mut self.provider);
    }
}

impl<P: MapProvider, S: KeyValueStore> Drop for FacilityMap<P, S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::storage::MemoryStore, providers::headless::HeadlessProvider};

    #[tokio::test]
    async fn test_teardown_is_idempotent() {
        let mut map = FacilityMap::initialize(
            HeadlessProvider::new(),
            MemoryStore::new(),
            "map",
            MapConfig::default(),
        )
        .await;
        map.start_placing().unwrap();

        map.teardown();
        assert_eq!(map.provider().map_count(), 0);
        assert_eq!(map.provider().active_listeners(), 0);
        assert_eq!(map.status(), StatusLine::Unavailable);

        map.teardown();
        assert_eq!(map.storage().write_count(), 1);
    }

    #[tokio::test]
    async fn test_events_after_teardown_are_dropped() {
        let mut map = FacilityMap::initialize(
            HeadlessProvider::new(),
            MemoryStore::new(),
            "map",
            MapConfig::default(),
        )
        .await;
        let id = map.map_id().unwrap();
        map.start_placing().unwrap();
        let events = map
            .provider()
            .click(id, crate::core::geo::LatLng::new(60.0, 10.0));

        map.teardown();
        map.handle_events(events);
        assert!(map.confirm_placement().is_none());
    }
}
