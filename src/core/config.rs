//! Configuration for the map surface and the services around it
//!
//! [`MapConfig`] covers everything the map itself needs (default view,
//! persistence, base layer, link targets and user-facing labels) and can be
//! deserialized from JSON with every field optional. [`AppConfig`] holds the
//! endpoints of the external Room/Review APIs, read from the environment.

use crate::{
    core::{constants::*, geo::LatLng, viewport::Viewport},
    layers::tile::TileLayerOptions,
    MapError, Result,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// View used when nothing usable was persisted
    pub default_viewport: Viewport,
    /// Zoom applied when the first position sample arrives
    pub tracking_zoom: u8,
    /// Storage key holding the last viewed viewport
    pub storage_key: String,
    /// Interval between viewport writes
    pub persist_interval_ms: u64,
    pub tile_layer: TileLayerOptions,
    /// Facility detail link, `{id}` is substituted
    pub detail_path: String,
    /// Creation hand-off target; `lat` and `lng` are appended as query parameters
    pub create_path: String,
    pub labels: MapLabels,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_viewport: Viewport::default(),
            tracking_zoom: TRACKING_ZOOM,
            storage_key: VIEWPORT_STORAGE_KEY.to_string(),
            persist_interval_ms: DEFAULT_PERSIST_INTERVAL_MS,
            tile_layer: TileLayerOptions::openstreetmap(),
            detail_path: DEFAULT_DETAIL_PATH.to_string(),
            create_path: DEFAULT_CREATE_PATH.to_string(),
            labels: MapLabels::default(),
        }
    }
}

impl MapConfig {
    /// Parses a JSON config, filling in defaults for missing fields
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: MapConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.default_viewport.is_valid() {
            return Err(MapError::Config(format!(
                "default viewport center {} is out of range",
                self.default_viewport.center
            )));
        }
        if self.persist_interval_ms == 0 {
            return Err(MapError::Config(
                "persist_interval_ms must be positive".to_string(),
            ));
        }
        if self.storage_key.is_empty() {
            return Err(MapError::Config("storage_key must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn with_persist_interval(mut self, interval: Duration) -> Self {
        self.persist_interval_ms = (interval.as_millis() as u64).max(1);
        self
    }

    pub fn with_tracking_zoom(mut self, zoom: u8) -> Self {
        self.tracking_zoom = zoom;
        self
    }

    pub fn with_default_viewport(mut self, viewport: Viewport) -> Self {
        self.default_viewport = viewport;
        self
    }

    pub fn with_labels(mut self, labels: MapLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn persist_interval(&self) -> Duration {
        Duration::from_millis(self.persist_interval_ms)
    }

    /// Link to the facility detail view
    pub fn detail_href(&self, facility_id: &str) -> String {
        self.detail_path.replace("{id}", &urlencoding::encode(facility_id))
    }

    /// Link to the creation flow carrying the chosen coordinates
    pub fn create_href(&self, position: LatLng) -> String {
        let separator = if self.create_path.contains('?') { '&' } else { '?' };
        format!(
            "{}{}lat={}&lng={}",
            self.create_path,
            separator,
            position.lat_param(),
            position.lng_param()
        )
    }
}

/// User-facing strings shown in popups and messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapLabels {
    pub unnamed_facility: String,
    pub no_reviews: String,
    pub availability: String,
    pub safety: String,
    pub cleanliness: String,
    pub open_facility: String,
    pub placement_title: String,
    pub placement_hint: String,
    pub confirm_placement: String,
}

impl Default for MapLabels {
    fn default() -> Self {
        Self {
            unnamed_facility: "Unnamed facility".to_string(),
            no_reviews: "No reviews yet.".to_string(),
            availability: "Availability".to_string(),
            safety: "Safety".to_string(),
            cleanliness: "Cleanliness".to_string(),
            open_facility: "Open facility".to_string(),
            placement_title: "Selected location".to_string(),
            placement_hint: "Click the map again to move the pin.".to_string(),
            confirm_placement: "Add facility here".to_string(),
        }
    }
}

/// Endpoints of the external services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub room_api: String,
    pub review_api: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            room_api: DEFAULT_ROOM_API.to_string(),
            review_api: DEFAULT_REVIEW_API.to_string(),
        }
    }
}

impl AppConfig {
    /// Reads `ROOM_API` and `REVIEW_API`, falling back to the dev endpoints
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an injectable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            room_api: lookup("ROOM_API").unwrap_or(defaults.room_api),
            review_api: lookup("REVIEW_API").unwrap_or(defaults.review_api),
        };

        for (key, url) in [("ROOM_API", &config.room_api), ("REVIEW_API", &config.review_api)] {
            reqwest::Url::parse(url)
                .map_err(|e| MapError::Config(format!("{} is not a valid url ({}): {}", key, url, e)))?;
        }
        Ok(config)
    }
}
