//! Exclusive interaction modes of the facility map.
//!
//! The map is always in exactly one [`Mode`]. Each non-idle mode carries a
//! session that owns the provider handles its entry acquired, and every
//! transition goes through [`ModeController::exit`], which hands the old
//! session back to the provider.

use crate::{
    core::{
        config::MapConfig,
        geo::LatLng,
        map::{MapSurface, SurfaceState},
        viewport::Viewport,
    },
    input::events::{GeolocationError, MapEvent, PositionSample},
    traits::{
        CircleOptions, FeatureId, ListenerId, MapProvider, MarkerIcon, MarkerOptions, PopupId,
        WatchId,
    },
    ui::{popup::placement_popup, status::StatusLine},
    Result,
};

/// Live position tracking.
///
/// Entered from placement, the placement session is kept suspended until the
/// first valid fix arrives, so a watch that fails before ever producing a
/// position hands the user back their pin and pending location.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingSession {
    watch: WatchId,
    position_feature: Option<FeatureId>,
    accuracy_feature: Option<FeatureId>,
    last_sample: Option<PositionSample>,
    suspended: Option<PlacementSession>,
}

impl TrackingSession {
    fn new(watch: WatchId, suspended: Option<PlacementSession>) -> Self {
        Self {
            watch,
            position_feature: None,
            accuracy_feature: None,
            last_sample: None,
            suspended,
        }
    }

    pub fn watch(&self) -> WatchId {
        self.watch
    }

    pub fn last_sample(&self) -> Option<&PositionSample> {
        self.last_sample.as_ref()
    }

    pub fn position_feature(&self) -> Option<FeatureId> {
        self.position_feature
    }

    pub fn accuracy_feature(&self) -> Option<FeatureId> {
        self.accuracy_feature
    }

    /// The placement waiting on the first fix, if tracking was entered from it
    pub fn suspended_placement(&self) -> Option<&PlacementSession> {
        self.suspended.as_ref()
    }

    fn release(mut self, provider: &mut dyn MapProvider) {
        if let Some(suspended) = self.suspended.take() {
            suspended.release(provider);
        }
        self.release_watch(provider);
    }

    /// Releases the watch and its features; a suspended placement must be taken first
    fn release_watch(self, provider: &mut dyn MapProvider) {
        provider.clear_watch(self.watch);
        if let Some(feature) = self.position_feature {
            provider.remove_feature(feature);
        }
        if let Some(feature) = self.accuracy_feature {
            provider.remove_feature(feature);
        }
        log::debug!("Released {}", self.watch);
    }
}

/// Choosing the location of a new facility
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementSession {
    listener: ListenerId,
    popup: Option<PopupId>,
    pending_pin: Option<FeatureId>,
    pending_location: Option<LatLng>,
}

impl PlacementSession {
    fn new(listener: ListenerId) -> Self {
        Self {
            listener,
            popup: None,
            pending_pin: None,
            pending_location: None,
        }
    }

    pub fn listener(&self) -> ListenerId {
        self.listener
    }

    pub fn popup(&self) -> Option<PopupId> {
        self.popup
    }

    pub fn pending_pin(&self) -> Option<FeatureId> {
        self.pending_pin
    }

    /// The last clicked location, if any
    pub fn pending_location(&self) -> Option<LatLng> {
        self.pending_location
    }

    fn release(self, provider: &mut dyn MapProvider) {
        provider.unlisten(self.listener);
        if let Some(popup) = self.popup {
            provider.close_popup(popup);
        }
        if let Some(pin) = self.pending_pin {
            provider.remove_feature(pin);
        }
        log::debug!("Released {}", self.listener);
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Mode {
    #[default]
    Idle,
    Tracking(TrackingSession),
    PlacingFacility(PlacementSession),
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Idle => "idle",
            Mode::Tracking(_) => "tracking",
            Mode::PlacingFacility(_) => "placing",
        }
    }
}

/// What the creation flow receives when the user confirms a location
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementHandOff {
    pub location: LatLng,
    pub href: String,
}

/// Runs the mode state machine against a provider and a surface
#[derive(Debug)]
pub struct ModeController {
    mode: Mode,
    last_error: Option<GeolocationError>,
    config: MapConfig,
}

impl ModeController {
    pub fn new(config: MapConfig) -> Self {
        Self {
            mode: Mode::Idle,
            last_error: None,
            config,
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.mode, Mode::Idle)
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self.mode, Mode::Tracking(_))
    }

    pub fn is_placing(&self) -> bool {
        matches!(self.mode, Mode::PlacingFacility(_))
    }

    pub fn last_error(&self) -> Option<GeolocationError> {
        self.last_error
    }

    /// Inline message for the last geolocation failure
    pub fn error_message(&self) -> Option<&'static str> {
        self.last_error.map(|error| error.message())
    }

    pub fn status(&self, surface: &SurfaceState) -> StatusLine {
        StatusLine::derive(surface, &self.mode)
    }

    /// Starts tracking the device position, or recentres on the last fix
    /// when already tracking.
    ///
    /// A subscription failure is recorded in [`ModeController::last_error`]
    /// and leaves the current mode untouched. An active placement is
    /// suspended rather than released until the first fix arrives.
    pub fn track_position(
        &mut self,
        provider: &mut dyn MapProvider,
        surface: &mut MapSurface,
    ) -> Result<()> {
        surface.map_id()?;

        if let Mode::Tracking(session) = &self.mode {
            if let Some(sample) = session.last_sample {
                let viewport = Viewport::new(sample.lat_lng, self.config.tracking_zoom);
                surface.set_viewport(provider, viewport)?;
            }
            return Ok(());
        }

        match provider.watch_position() {
            Ok(watch) => {
                let suspended = match std::mem::take(&mut self.mode) {
                    Mode::PlacingFacility(session) => Some(session),
                    Mode::Tracking(session) => {
                        session.release(provider);
                        None
                    }
                    Mode::Idle => None,
                };
                self.last_error = None;
                self.mode = Mode::Tracking(TrackingSession::new(watch, suspended));
                log::debug!("Tracking position with {}", watch);
            }
            Err(error) => {
                log::warn!("Position tracking unavailable: {:?}", error);
                self.last_error = Some(error);
            }
        }
        Ok(())
    }

    /// Enters placement mode. Does nothing when already placing.
    pub fn start_placing(
        &mut self,
        provider: &mut dyn MapProvider,
        surface: &MapSurface,
    ) -> Result<()> {
        if self.is_placing() {
            return Ok(());
        }
        let map = surface.map_id()?;
        let listener = provider.listen_clicks(map)?;

        self.exit(provider);
        self.mode = Mode::PlacingFacility(PlacementSession::new(listener));
        log::debug!("Placing a facility with {}", listener);
        Ok(())
    }

    pub fn cancel_placing(&mut self, provider: &mut dyn MapProvider) {
        if self.is_placing() {
            self.exit(provider);
        }
    }

    pub fn stop_tracking(&mut self, provider: &mut dyn MapProvider) {
        if self.is_tracking() {
            self.exit(provider);
            self.last_error = None;
        }
    }

    /// Leaves the current mode, releasing everything it acquired
    pub fn exit(&mut self, provider: &mut dyn MapProvider) {
        let previous = std::mem::replace(&mut self.mode, Mode::Idle);
        let name = previous.name();
        match previous {
            Mode::Idle => return,
            Mode::Tracking(session) => session.release(provider),
            Mode::PlacingFacility(session) => session.release(provider),
        }
        log::debug!("Left {} mode", name);
    }

    /// The chosen location and creation link. The mode stays active.
    pub fn confirm_placement(&self) -> Option<PlacementHandOff> {
        match &self.mode {
            Mode::PlacingFacility(session) => session.pending_location.map(|location| {
                PlacementHandOff {
                    location,
                    href: self.config.create_href(location),
                }
            }),
            _ => None,
        }
    }

    /// Applies a provider callback. Events addressed to a listener or watch
    /// that is no longer live are dropped.
    pub fn handle_event(
        &mut self,
        provider: &mut dyn MapProvider,
        surface: &mut MapSurface,
        event: &MapEvent,
    ) -> Result<()> {
        match event {
            MapEvent::ViewChanged { map, viewport } => {
                surface.on_view_changed(*map, *viewport);
                Ok(())
            }
            MapEvent::Click { listener, lat_lng } => {
                self.on_click(provider, surface, *listener, *lat_lng)
            }
            MapEvent::Position { watch, sample } => {
                self.on_position(provider, surface, *watch, sample)
            }
            MapEvent::PositionError { watch, error } => {
                self.on_position_error(provider, *watch, *error);
                Ok(())
            }
        }
    }

    fn on_click(
        &mut self,
        provider: &mut dyn MapProvider,
        surface: &MapSurface,
        listener: ListenerId,
        lat_lng: LatLng,
    ) -> Result<()> {
        let session = match &mut self.mode {
            Mode::PlacingFacility(session) if session.listener == listener => session,
            _ => {
                log::debug!("Ignoring click for stale {}", listener);
                return Ok(());
            }
        };

        let position = lat_lng.wrapped();
        if !position.is_valid() {
            log::warn!("Ignoring click outside the map at {:?}", lat_lng);
            return Ok(());
        }
        let map = surface.map_id()?;

        match session.pending_pin {
            Some(pin) => provider.move_feature(pin, position)?,
            None => {
                let options = MarkerOptions::new(position).with_icon(MarkerIcon::Pending);
                session.pending_pin = Some(provider.create_marker(map, options)?);
            }
        }

        let content = placement_popup(
            position,
            &self.config.labels,
            self.config.create_href(position),
        );
        match session.popup {
            Some(popup) => provider.update_popup(popup, position, content)?,
            None => session.popup = Some(provider.create_popup(map, position, content)?),
        }

        session.pending_location = Some(position);
        log::debug!("Pending facility at {}", position);
        Ok(())
    }

    fn on_position(
        &mut self,
        provider: &mut dyn MapProvider,
        surface: &mut MapSurface,
        watch: WatchId,
        sample: &PositionSample,
    ) -> Result<()> {
        let session = match &mut self.mode {
            Mode::Tracking(session) if session.watch == watch => session,
            _ => {
                log::debug!("Ignoring position for stale {}", watch);
                return Ok(());
            }
        };
        if !sample.lat_lng.is_valid() {
            log::warn!("Ignoring position sample {:?}", sample.lat_lng);
            return Ok(());
        }
        let map = surface.map_id()?;
        let first = session.last_sample.is_none();
        if let Some(suspended) = session.suspended.take() {
            suspended.release(provider);
        }

        match session.position_feature {
            Some(feature) => provider.move_feature(feature, sample.lat_lng)?,
            None => {
                let options = MarkerOptions::new(sample.lat_lng).with_icon(MarkerIcon::Position);
                session.position_feature = Some(provider.create_marker(map, options)?);
            }
        }
        match session.accuracy_feature {
            Some(feature) => {
                provider.move_feature(feature, sample.lat_lng)?;
                provider.set_circle_radius(feature, sample.accuracy_meters)?;
            }
            None => {
                let options = CircleOptions::accuracy(sample.lat_lng, sample.accuracy_meters);
                session.accuracy_feature = Some(provider.create_circle(map, options)?);
            }
        }
        session.last_sample = Some(*sample);
        self.last_error = None;

        if first {
            let viewport = Viewport::new(sample.lat_lng, self.config.tracking_zoom);
            surface.set_viewport(provider, viewport)?;
        }
        Ok(())
    }

    fn on_position_error(
        &mut self,
        provider: &mut dyn MapProvider,
        watch: WatchId,
        error: GeolocationError,
    ) {
        match &self.mode {
            Mode::Tracking(session) if session.watch == watch => {}
            _ => {
                log::debug!("Ignoring geolocation error for stale {}", watch);
                return;
            }
        }

        self.last_error = Some(error);
        if !error.is_fatal() {
            log::warn!("Position temporarily unavailable: {:?}", error);
            return;
        }

        log::warn!("Position tracking stopped: {:?}", error);
        if let Mode::Tracking(mut session) = std::mem::take(&mut self.mode) {
            let suspended = session.suspended.take();
            session.release_watch(provider);
            if let Some(placement) = suspended {
                log::debug!("Resuming placement with {}", placement.listener);
                self.mode = Mode::PlacingFacility(placement);
            }
        }
    }
}
