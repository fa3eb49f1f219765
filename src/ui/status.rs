use crate::{core::map::SurfaceState, input::modes::Mode};
use std::fmt;

/// The single status line shown above the map.
///
/// Always derived from the surface state and the active mode, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLine {
    Loading,
    Unavailable,
    Browsing,
    Placing,
}

impl StatusLine {
    pub fn derive(surface: &SurfaceState, mode: &Mode) -> Self {
        match (surface, mode) {
            (SurfaceState::Loading, _) => StatusLine::Loading,
            (SurfaceState::Unavailable(_) | SurfaceState::Detached, _) => StatusLine::Unavailable,
            (SurfaceState::Ready, Mode::PlacingFacility(_)) => StatusLine::Placing,
            (SurfaceState::Ready, Mode::Idle | Mode::Tracking(_)) => StatusLine::Browsing,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusLine::Loading => "loading",
            StatusLine::Unavailable => "map unavailable",
            StatusLine::Browsing => "find and review a facility",
            StatusLine::Placing => "placing a facility — click the map",
        }
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
