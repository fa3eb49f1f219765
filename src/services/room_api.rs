//! Read-only client for the Room API, the source of facility snapshots.

use crate::{
    core::config::AppConfig,
    data::{
        facility::Facility,
        geojson::{facilities_from_geojson, facilities_from_list, facility_from_record, ParsedFacilities},
    },
    MapError, Result,
};
use reqwest::StatusCode;

#[derive(Debug, Clone)]
pub struct RoomApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl RoomApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        reqwest::Url::parse(&base_url)
            .map_err(|e| MapError::Config(format!("invalid room api url {}: {}", base_url, e)))?;

        #[cfg(not(target_arch = "wasm32"))]
        let client = reqwest::Client::builder()
            .user_agent(concat!("stellerom-map/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        #[cfg(target_arch = "wasm32")]
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(config.room_api.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// All rooms as map features, from `GET /rooms-v2`
    pub async fn fetch_facilities(&self) -> Result<ParsedFacilities> {
        let (status, body) = self.get("/rooms-v2").await?;
        parse_response(status, body, facilities_from_geojson)
    }

    /// All rooms as a plain list, from `GET /rooms`
    pub async fn fetch_room_list(&self) -> Result<ParsedFacilities> {
        let (status, body) = self.get("/rooms").await?;
        parse_response(status, body, facilities_from_list)
    }

    /// A single room, from `GET /rooms/{id}`
    pub async fn fetch_room(&self, id: &str) -> Result<Facility> {
        let (status, body) = self.get(&Self::room_path(id)).await?;
        parse_response(status, body, |raw| {
            let facility = facility_from_record(serde_json::from_str(raw)?)?;
            facility.validate()?;
            Ok(facility)
        })
    }

    fn room_path(id: &str) -> String {
        format!("/rooms/{}", urlencoding::encode(id))
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Result<(StatusCode, String)> {
        let url = self.url_for(path);
        log::debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }
}

/// Maps non-success statuses to [`MapError::Api`] and parses the rest
fn parse_response<T, F>(status: StatusCode, body: String, parse: F) -> Result<T>
where
    F: FnOnce(&str) -> Result<T>,
{
    if !status.is_success() {
        log::warn!("Room API answered {}", status);
        return Err(MapError::Api {
            status: status.as_u16(),
            body,
        });
    }
    parse(&body)
}
