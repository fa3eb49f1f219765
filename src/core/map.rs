use crate::{
    core::{config::MapConfig, storage::KeyValueStore, viewport::Viewport},
    traits::{FeatureId, MapId, MapProvider},
    MapError, Result,
};
use instant::Instant;
use std::time::Duration;

/// Lifecycle of the map surface
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceState {
    /// Waiting for the provider to create the map
    Loading,
    Ready,
    /// The provider failed to load; nothing is drawn until the page reloads
    Unavailable(String),
    /// `teardown` ran
    Detached,
}

/// Fixed-interval timer that rate-limits viewport writes.
///
/// It does not schedule anything itself; the host calls
/// [`MapSurface::tick`] from its event loop and the timer decides whether a
/// write is due.
#[derive(Debug, Clone)]
pub struct PersistTimer {
    interval: Duration,
    last_fired: Instant,
}

impl PersistTimer {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_fired: now,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true at most once per interval
    pub fn due(&mut self, now: Instant) -> bool {
        if now >= self.last_fired && now.duration_since(self.last_fired) >= self.interval {
            self.last_fired = now;
            true
        } else {
            false
        }
    }
}

/// Owns the map instance, its base layer and the persisted viewport
pub struct MapSurface {
    state: SurfaceState,
    map: Option<MapId>,
    base_layer: Option<FeatureId>,
    current: Viewport,
    last_persisted: Option<Viewport>,
    zoom_range: (u8, u8),
    storage_key: String,
    timer: PersistTimer,
}

impl MapSurface {
    /// A surface that has not been attached to a provider yet
    pub fn new(config: &MapConfig) -> Self {
        Self {
            state: SurfaceState::Loading,
            map: None,
            base_layer: None,
            current: config.default_viewport,
            last_persisted: None,
            zoom_range: (config.tile_layer.min_zoom, config.tile_layer.max_zoom),
            storage_key: config.storage_key.clone(),
            timer: PersistTimer::new(config.persist_interval(), Instant::now()),
        }
    }

    /// Creates the map in `container`, starting from the stored viewport when
    /// it is well formed and from the configured default otherwise.
    ///
    /// Never fails: a provider error leaves the surface `Unavailable`.
    pub async fn initialize(
        provider: &mut dyn MapProvider,
        container: &str,
        storage: &dyn KeyValueStore,
        config: &MapConfig,
    ) -> Self {
        let mut surface = Self::new(config);
        surface.attach(provider, container, storage, config).await;
        surface
    }

    async fn attach(
        &mut self,
        provider: &mut dyn MapProvider,
        container: &str,
        storage: &dyn KeyValueStore,
        config: &MapConfig,
    ) {
        let (provider_min, provider_max) = provider.zoom_range();
        self.zoom_range = (
            provider_min.max(config.tile_layer.min_zoom),
            provider_max.min(config.tile_layer.max_zoom),
        );

        let stored = storage.get(&self.storage_key);
        let viewport = Viewport::from_stored(stored.as_deref(), config.default_viewport)
            .clamped(self.zoom_range.0, self.zoom_range.1);
        self.current = viewport;

        let map = match provider.create_map(container, viewport).await {
            Ok(map) => map,
            Err(e) => {
                log::error!("{} failed to create the map: {}", provider.name(), e);
                self.state = SurfaceState::Unavailable(e.to_string());
                return;
            }
        };

        match provider.add_tile_layer(map, &config.tile_layer) {
            Ok(layer) => {
                self.map = Some(map);
                self.base_layer = Some(layer);
                self.state = SurfaceState::Ready;
                log::info!(
                    "Map {} ready on {} at {} zoom {}",
                    map,
                    provider.name(),
                    viewport.center,
                    viewport.zoom
                );
            }
            Err(e) => {
                log::error!("{} failed to add the base layer: {}", provider.name(), e);
                provider.destroy_map(map);
                self.state = SurfaceState::Unavailable(e.to_string());
            }
        }
    }

    pub fn state(&self) -> &SurfaceState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SurfaceState::Ready
    }

    /// The live map handle; fails unless the surface is ready
    pub fn map_id(&self) -> Result<MapId> {
        match (&self.state, self.map) {
            (SurfaceState::Ready, Some(map)) => Ok(map),
            (SurfaceState::Unavailable(reason), _) => Err(MapError::NotReady(reason.clone())),
            (state, _) => Err(MapError::NotReady(format!("map is {:?}", state))),
        }
    }

    pub fn zoom_range(&self) -> (u8, u8) {
        self.zoom_range
    }

    /// Current center and zoom; falls back to the last known value when the
    /// provider cannot be read
    pub fn viewport(&self, provider: &dyn MapProvider) -> Viewport {
        let Ok(map) = self.map_id() else {
            return self.current;
        };
        provider.viewport(map).unwrap_or_else(|e| {
            log::warn!("Reading viewport of {} failed: {}", map, e);
            self.current
        })
    }

    /// Authoritative set, e.g. a programmatic recentre
    pub fn set_viewport(&mut self, provider: &mut dyn MapProvider, viewport: Viewport) -> Result<()> {
        if !viewport.is_valid() {
            return Err(MapError::InvalidCoordinates(format!(
                "viewport center {}",
                viewport.center
            )));
        }
        let map = self.map_id()?;
        let viewport = viewport.clamped(self.zoom_range.0, self.zoom_range.1);
        provider.set_viewport(map, viewport)?;
        self.current = viewport;
        Ok(())
    }

    /// Records a pan/zoom reported by the provider
    pub fn on_view_changed(&mut self, map: MapId, viewport: Viewport) {
        if self.map == Some(map) && viewport.is_valid() {
            self.current = viewport;
        }
    }

    /// Writes the current viewport to storage unless it is unchanged since
    /// the last write. Returns whether a write happened.
    pub fn persist_viewport(
        &mut self,
        provider: &dyn MapProvider,
        storage: &mut dyn KeyValueStore,
    ) -> Result<bool> {
        if !self.is_ready() {
            return Ok(false);
        }
        let viewport = self.viewport(provider);
        if self.last_persisted == Some(viewport) {
            return Ok(false);
        }
        storage.set(&self.storage_key, &viewport.to_json()?)?;
        self.last_persisted = Some(viewport);
        log::debug!("Persisted viewport {} zoom {}", viewport.center, viewport.zoom);
        Ok(true)
    }

    /// Persists the viewport if the timer interval elapsed
    pub fn tick(
        &mut self,
        provider: &dyn MapProvider,
        storage: &mut dyn KeyValueStore,
        now: Instant,
    ) -> Result<bool> {
        if !self.timer.due(now) {
            return Ok(false);
        }
        self.persist_viewport(provider, storage)
    }

    pub fn persist_interval(&self) -> Duration {
        self.timer.interval()
    }

    /// Detaches the map from its render target. Safe to call repeatedly.
    pub fn teardown(&mut self, provider: &mut dyn MapProvider) {
        if let Some(layer) = self.base_layer.take() {
            provider.remove_feature(layer);
        }
        if let Some(map) = self.map.take() {
            provider.destroy_map(map);
            log::info!("Map {} torn down", map);
        }
        self.state = SurfaceState::Detached;
    }
}
