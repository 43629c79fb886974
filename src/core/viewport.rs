use crate::core::config::ViewportConfig;
use crate::core::geo::{Point, ScreenRect, Size};
use serde::{Deserialize, Serialize};

/// Pan and zoom applied to the rendered map layer.
///
/// Serialized as `{ scale, x, y }`, the `view` object of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub scale: f64,
    #[serde(rename = "x")]
    pub pan_x: f64,
    #[serde(rename = "y")]
    pub pan_y: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

impl ViewState {
    pub fn new(scale: f64, pan_x: f64, pan_y: f64) -> Self {
        Self {
            scale,
            pan_x,
            pan_y,
        }
    }

    pub fn pan(&self) -> Point {
        Point::new(self.pan_x, self.pan_y)
    }

    /// Screen rectangle occupied by the map layer.
    ///
    /// The layer is centered in the container, translated by the pan and
    /// scaled about its own center, so the pan is never multiplied by the
    /// scale here.
    pub fn layer_rect(&self, container: Size, native: Size) -> ScreenRect {
        let center = container.center().add(&self.pan());
        ScreenRect::centered_at(center, native.scale(self.scale))
    }

    /// CSS-equivalent transform string for hosts that render with CSS
    pub fn css_transform(&self) -> String {
        format!(
            "translate(-50%, -50%) translate({}px, {}px) scale({})",
            self.pan_x, self.pan_y, self.scale
        )
    }
}

/// Owns the view state and the pan gesture
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportController {
    state: ViewState,
    config: ViewportConfig,
    /// `pointer - pan` captured when a pan starts
    pan_anchor: Option<Point>,
    revision: u64,
}

impl ViewportController {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            state: ViewState::default(),
            config,
            pan_anchor: None,
            revision: 0,
        }
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn scale(&self) -> f64 {
        self.state.scale
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    /// Bumped whenever the view state changes
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// Replace the view, clamping the scale silently
    pub fn set_state(&mut self, state: ViewState) {
        let scale = if state.scale.is_finite() {
            state.scale.clamp(self.config.min_scale, self.config.max_scale)
        } else {
            1.0
        };
        let pan_x = if state.pan_x.is_finite() { state.pan_x } else { 0.0 };
        let pan_y = if state.pan_y.is_finite() { state.pan_y } else { 0.0 };
        self.state = ViewState::new(scale, pan_x, pan_y);
        self.touch();
    }

    pub fn reset(&mut self) {
        self.state = ViewState::default();
        self.pan_anchor = None;
        self.touch();
    }

    pub fn start_pan(&mut self, pointer: Point) {
        self.pan_anchor = Some(pointer.subtract(&self.state.pan()));
    }

    /// Move the pan with the pointer; returns false when no pan is active
    pub fn update_pan(&mut self, pointer: Point) -> bool {
        match self.pan_anchor {
            Some(anchor) => {
                let pan = pointer.subtract(&anchor);
                self.state.pan_x = pan.x;
                self.state.pan_y = pan.y;
                self.touch();
                true
            }
            None => false,
        }
    }

    pub fn end_pan(&mut self) {
        self.pan_anchor = None;
    }

    pub fn is_panning(&self) -> bool {
        self.pan_anchor.is_some()
    }

    /// Apply one wheel notch. Negative `wheel_delta` zooms in.
    ///
    /// The pan is scaled along with the layer so the zoom stays anchored on
    /// the viewport's visual center. Returns false when the step would leave
    /// the allowed scale range, in which case nothing changes.
    pub fn zoom(&mut self, wheel_delta: f64) -> bool {
        if wheel_delta == 0.0 {
            return false;
        }
        let direction = if wheel_delta < 0.0 { 1.0 } else { -1.0 };
        let factor = 1.0 + direction * self.config.zoom_intensity;
        let new_scale = self.state.scale * factor;

        if new_scale < self.config.min_scale || new_scale > self.config.max_scale {
            return false;
        }

        self.state.pan_x *= factor;
        self.state.pan_y *= factor;
        self.state.scale = new_scale;
        self.touch();
        true
    }
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(ViewportConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_in_three_times() {
        let mut viewport = ViewportController::default();
        for _ in 0..3 {
            assert!(viewport.zoom(-1.0));
        }
        assert!((viewport.scale() - 1.331).abs() < 1e-9);
    }

    #[test]
    fn test_css_transform() {
        let state = ViewState::new(1.5, 20.0, -4.5);
        assert_eq!(
            state.css_transform(),
            "translate(-50%, -50%) translate(20px, -4.5px) scale(1.5)"
        );
    }

    #[test]
    fn test_zoom_scales_pan() {
        let mut viewport = ViewportController::default();
        viewport.set_state(ViewState::new(1.0, 100.0, -50.0));
        viewport.zoom(-120.0);

        let state = viewport.state();
        assert!((state.pan_x - 110.0).abs() < 1e-9);
        assert!((state.pan_y + 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_limits() {
        let mut viewport = ViewportController::default();
        for _ in 0..500 {
            viewport.zoom(1.0);
            assert!(viewport.scale() >= 0.1);
        }
        let floor = viewport.scale();
        let revision = viewport.revision();
        assert!(!viewport.zoom(1.0));
        assert_eq!(viewport.revision(), revision);
        assert_eq!(viewport.scale(), floor);

        for _ in 0..500 {
            viewport.zoom(-1.0);
            assert!(viewport.scale() <= 20.0);
        }
        let ceiling = viewport.scale();
        assert!(!viewport.zoom(-1.0));
        assert_eq!(viewport.scale(), ceiling);
    }

    #[test]
    fn test_pan() {
        let mut viewport = ViewportController::default();
        viewport.set_state(ViewState::new(1.0, 10.0, 10.0));

        viewport.start_pan(Point::new(100.0, 100.0));
        assert!(viewport.update_pan(Point::new(130.0, 90.0)));
        assert_eq!(viewport.state().pan(), Point::new(40.0, 0.0));

        viewport.end_pan();
        assert!(!viewport.update_pan(Point::new(0.0, 0.0)));
    }

    #[test]
    fn test_set_state_clamps_scale() {
        let mut viewport = ViewportController::default();
        viewport.set_state(ViewState::new(50.0, 1.0, 2.0));
        assert_eq!(viewport.scale(), 20.0);

        viewport.reset();
        assert_eq!(viewport.state(), ViewState::default());
    }

    #[test]
    fn test_layer_rect_is_centered() {
        let view = ViewState::new(2.0, 10.0, 0.0);
        let rect = view.layer_rect(Size::new(800.0, 600.0), Size::new(100.0, 50.0));
        assert_eq!(rect.size, Size::new(200.0, 100.0));
        assert_eq!(rect.center(), Point::new(410.0, 300.0));
    }
}
