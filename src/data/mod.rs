pub mod facility;
pub mod geojson;

pub use facility::{Facility, Ratings, StarRating};
pub use geojson::{facilities_from_geojson, facilities_from_list, ParsedFacilities};
