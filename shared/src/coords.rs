//! Coordinate spaces used by the overlay.
//!
//! Every point that crosses a boundary is tagged with the space it lives in.
//! Only [`DocPoint`] is ever persisted; viewport points come from pointer
//! events and surface points go to paint calls.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// A point relative to the top-left of the whole scrollable page.
#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, Default, PartialEq)]
pub struct DocPoint {
    pub x: f64,
    pub y: f64,
}

/// A point relative to the visible top-left of the window.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewportPoint {
    pub x: f64,
    pub y: f64,
}

/// A point relative to the drawing surface's own top-left.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SurfacePoint {
    pub x: f64,
    pub y: f64,
}

impl DocPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Difference `self - origin` as `(dx, dy)`.
    pub fn delta_from(self, origin: DocPoint) -> (f64, f64) {
        (self.x - origin.x, self.y - origin.y)
    }
}

impl ViewportPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl SurfacePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Converts between the three spaces given the current scroll offset and the
/// surface's offset inside the viewport.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CoordinateMapper {
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub surface_left: f64,
    pub surface_top: f64,
}

impl CoordinateMapper {
    pub fn new(scroll_x: f64, scroll_y: f64, surface_left: f64, surface_top: f64) -> Self {
        Self {
            scroll_x,
            scroll_y,
            surface_left,
            surface_top,
        }
    }

    pub fn set_scroll(&mut self, scroll_x: f64, scroll_y: f64) {
        self.scroll_x = scroll_x;
        self.scroll_y = scroll_y;
    }

    pub fn set_surface_offset(&mut self, left: f64, top: f64) {
        self.surface_left = left;
        self.surface_top = top;
    }

    pub fn to_document(&self, point: ViewportPoint) -> DocPoint {
        DocPoint {
            x: point.x + self.scroll_x,
            y: point.y + self.scroll_y,
        }
    }

    pub fn to_viewport(&self, point: DocPoint) -> ViewportPoint {
        ViewportPoint {
            x: point.x - self.scroll_x,
            y: point.y - self.scroll_y,
        }
    }

    pub fn to_surface(&self, point: DocPoint) -> SurfacePoint {
        let viewport = self.to_viewport(point);
        SurfacePoint {
            x: viewport.x - self.surface_left,
            y: viewport.y - self.surface_top,
        }
    }

    /// Shorthand for paint calls that want raw `(x, y)` surface coordinates.
    pub fn surface_xy(&self, x: f64, y: f64) -> (f64, f64) {
        let point = self.to_surface(DocPoint { x, y });
        (point.x, point.y)
    }
}
