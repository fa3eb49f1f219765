//! Concrete [`MapProvider`](crate::traits::MapProvider) implementations

pub mod headless;
#[cfg(feature = "wasm")]
pub mod leaflet;

pub use headless::{HeadlessFeature, HeadlessPopup, HeadlessProvider};
#[cfg(feature = "wasm")]
pub use leaflet::LeafletProvider;
