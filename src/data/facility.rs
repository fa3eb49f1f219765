use crate::{core::geo::LatLng, MapError, Result};
use bounded_integer::BoundedU8;
use serde::{Deserialize, Serialize};

/// A star rating from 1 to 5
pub type StarRating = BoundedU8<1, 5>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ratings {
    pub availability: StarRating,
    pub safety: StarRating,
    pub cleanliness: StarRating,
}

/// A changing room as published by the Room API.
///
/// The map only ever holds a read-only snapshot of these; identity is `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub location: LatLng,
    #[serde(default)]
    pub ratings: Option<Ratings>,
}

impl Facility {
    pub fn new(id: impl Into<String>, name: Option<String>, location: LatLng) -> Self {
        Self {
            id: id.into(),
            name,
            location,
            ratings: None,
        }
    }

    pub fn with_ratings(mut self, ratings: Ratings) -> Self {
        self.ratings = Some(ratings);
        self
    }

    /// The name to show, or `placeholder` when missing or blank
    pub fn display_name<'a>(&'a self, placeholder: &'a str) -> &'a str {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => placeholder,
        }
    }

    /// Checks the fields a marker cannot be drawn without
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(MapError::Parse(format!("facility at {} has no id", self.location)));
        }
        if !self.location.is_valid() {
            return Err(MapError::InvalidCoordinates(format!(
                "facility {} has location {:?}",
                self.id, self.location
            )));
        }
        Ok(())
    }
}
