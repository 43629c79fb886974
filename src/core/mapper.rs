//! Screen ↔ native map coordinate conversion.
//!
//! Every entity coordinate is stored in native map space. The viewport's
//! pan and scale only decide where the rendered layer lands on screen,
//! so the mapping here is a plain rectangle-to-rectangle ratio between the
//! layer's on-screen bounding box and the map's native resolution.

use crate::core::geo::{Point, ScreenRect, Size};
use crate::core::viewport::ViewState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    /// Bounding box of the rendered layer on screen
    element: ScreenRect,
    /// Native resolution of the map (or raster) behind the element
    native: Size,
}

impl CoordinateMapper {
    pub fn new(element: ScreenRect, native: Size) -> Self {
        Self { element, native }
    }

    /// Mapper for a layer rendered in `container` under `view`
    pub fn for_view(view: &ViewState, container: Size, native: Size) -> Self {
        Self::new(view.layer_rect(container, native), native)
    }

    pub fn element(&self) -> ScreenRect {
        self.element
    }

    pub fn native_size(&self) -> Size {
        self.native
    }

    fn ratio(&self) -> (f64, f64) {
        if self.element.size.is_empty() {
            return (1.0, 1.0);
        }
        (
            self.native.width / self.element.size.width,
            self.native.height / self.element.size.height,
        )
    }

    /// `(screen - elementOrigin) * (native / rendered)`
    pub fn screen_to_map(&self, screen: Point) -> Point {
        let (rx, ry) = self.ratio();
        let local = screen.subtract(&self.element.origin);
        Point::new(local.x * rx, local.y * ry)
    }

    pub fn map_to_screen(&self, map: Point) -> Point {
        let (rx, ry) = self.ratio();
        Point::new(map.x / rx, map.y / ry).add(&self.element.origin)
    }

    /// Convert a screen-space motion into a native-space motion
    pub fn screen_delta_to_map(&self, delta: Point) -> Point {
        let (rx, ry) = self.ratio();
        Point::new(delta.x * rx, delta.y * ry)
    }
}
