//! Conversion of Room API payloads into [`Facility`] snapshots.
//!
//! Both payload shapes are parsed record by record: a malformed record is
//! logged and skipped, it never aborts the rest of the collection.

use crate::{
    core::geo::LatLng,
    data::facility::{Facility, Ratings},
    MapError, Result,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value};

/// GeoJSON geometry types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJsonGeometry {
    Point {
        coordinates: [f64; 2],
    },
    MultiPoint {
        coordinates: Vec<[f64; 2]>,
    },
    LineString {
        coordinates: Vec<[f64; 2]>,
    },
    Polygon {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
}

impl GeoJsonGeometry {
    /// The location of a point geometry. A single-entry MultiPoint counts.
    pub fn point(&self) -> Option<LatLng> {
        match self {
            GeoJsonGeometry::Point { coordinates } => {
                Some(LatLng::from_geojson_position(*coordinates))
            }
            GeoJsonGeometry::MultiPoint { coordinates } if coordinates.len() == 1 => {
                Some(LatLng::from_geojson_position(coordinates[0]))
            }
            _ => None,
        }
    }
}

/// GeoJSON feature with geometry and properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoJsonFeature {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub geometry: Option<GeoJsonGeometry>,
    #[serde(default)]
    pub properties: Option<JsonMap<String, Value>>,
}

/// Top level of the `rooms-v2` payload. Features stay untyped until each is
/// converted on its own.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeoJson {
    FeatureCollection { features: Vec<Value> },
}

/// Facilities recovered from a payload and how many records were dropped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFacilities {
    pub facilities: Vec<Facility>,
    pub skipped: usize,
}

impl ParsedFacilities {
    fn push(&mut self, index: usize, result: Result<Facility>) {
        match result.and_then(|f| f.validate().map(|_| f)) {
            Ok(facility) => self.facilities.push(facility),
            Err(e) => {
                log::warn!("Skipping facility record {}: {}", index, e);
                self.skipped += 1;
            }
        }
    }
}

/// Parses a GeoJSON FeatureCollection of rooms
pub fn facilities_from_geojson(raw: &str) -> Result<ParsedFacilities> {
    let GeoJson::FeatureCollection { features } = serde_json::from_str::<GeoJson>(raw)?;

    let mut parsed = ParsedFacilities::default();
    for (index, value) in features.into_iter().enumerate() {
        let result = serde_json::from_value::<GeoJsonFeature>(value)
            .map_err(MapError::from)
            .and_then(facility_from_feature);
        parsed.push(index, result);
    }
    Ok(parsed)
}

/// Parses a plain JSON array of rooms as served by `GET /rooms`
pub fn facilities_from_list(raw: &str) -> Result<ParsedFacilities> {
    let records: Vec<Value> = serde_json::from_str(raw)?;

    let mut parsed = ParsedFacilities::default();
    for (index, value) in records.into_iter().enumerate() {
        parsed.push(index, facility_from_record(value));
    }
    Ok(parsed)
}

/// Converts a single room object, tolerating bad ratings
pub fn facility_from_record(value: Value) -> Result<Facility> {
    let Value::Object(mut record) = value else {
        return Err(MapError::Parse("room record is not an object".to_string()));
    };
    let ratings = record.remove("ratings").and_then(lenient_ratings);
    let mut facility: Facility = serde_json::from_value(Value::Object(record))?;
    facility.ratings = ratings;
    Ok(facility)
}

fn facility_from_feature(feature: GeoJsonFeature) -> Result<Facility> {
    let properties = feature.properties.unwrap_or_default();

    let id = feature
        .id
        .as_ref()
        .or_else(|| properties.get("id"))
        .and_then(id_string)
        .ok_or_else(|| MapError::Parse("feature has no id".to_string()))?;

    let location = match feature.geometry.as_ref().and_then(GeoJsonGeometry::point) {
        Some(point) => point,
        None => properties
            .get("location")
            .cloned()
            .map(serde_json::from_value::<LatLng>)
            .transpose()?
            .ok_or_else(|| MapError::InvalidCoordinates(format!("feature {} has no point", id)))?,
    };

    let name = properties
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string);

    let ratings = properties.get("ratings").cloned().and_then(lenient_ratings);

    Ok(Facility {
        id,
        name,
        location,
        ratings,
    })
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Ratings outside 1..=5 or with missing components are dropped rather than
/// failing the whole facility
fn lenient_ratings(value: Value) -> Option<Ratings> {
    if value.is_null() {
        return None;
    }
    match serde_json::from_value::<Ratings>(value) {
        Ok(ratings) => Some(ratings),
        Err(e) => {
            log::warn!("Ignoring malformed ratings: {}", e);
            None
        }
    }
}
