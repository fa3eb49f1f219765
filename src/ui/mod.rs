//! Popup content and the derived status line

pub mod popup;
pub mod status;

pub use popup::{facility_popup, placement_popup, PopupContent, PopupLink};
pub use status::StatusLine;
