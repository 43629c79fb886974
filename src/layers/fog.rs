//! Fog-of-war raster.
//!
//! The buffer stores one opacity byte per native map pixel: 255 hides the
//! map, 0 reveals it. It only changes through circular compositing
//! operations, whole-buffer fills, or a decoded raster being drawn into it.

use crate::core::geo::Point;
use crate::layers::tokens::Token;
use image::{Rgba, RgbaImage};

const OPAQUE: u8 = u8::MAX;
const TRANSPARENT: u8 = 0;

/// Circular compositing operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FogOp {
    /// Erase to fully transparent
    Reveal,
    /// Paint fully opaque
    Hide,
}

/// Brush tool used while fog editing is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FogTool {
    #[default]
    Reveal,
    Hide,
}

impl From<FogTool> for FogOp {
    fn from(tool: FogTool) -> Self {
        match tool {
            FogTool::Reveal => FogOp::Reveal,
            FogTool::Hide => FogOp::Hide,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FogBuffer {
    width: u32,
    height: u32,
    alpha: Vec<u8>,
}

impl FogBuffer {
    /// Fully opaque buffer
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, OPAQUE)
    }

    /// Fully transparent buffer, like a freshly sized canvas
    pub fn transparent(width: u32, height: u32) -> Self {
        Self::filled(width, height, TRANSPARENT)
    }

    fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            alpha: vec![value; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Raw opacity bytes in row-major order
    pub fn as_bytes(&self) -> &[u8] {
        &self.alpha
    }

    pub fn alpha_at(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.alpha[self.index(x, y)])
    }

    pub fn is_revealed(&self, x: u32, y: u32) -> bool {
        self.alpha_at(x, y) == Some(TRANSPARENT)
    }

    pub fn is_opaque(&self, x: u32, y: u32) -> bool {
        self.alpha_at(x, y) == Some(OPAQUE)
    }

    pub fn revealed_pixel_count(&self) -> usize {
        self.alpha.iter().filter(|a| **a == TRANSPARENT).count()
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn fill(&mut self) {
        self.alpha.fill(OPAQUE);
    }

    pub fn clear(&mut self) {
        self.alpha.fill(TRANSPARENT);
    }

    /// Reallocate to new dimensions; the content is cleared
    pub fn resize(&mut self, width: u32, height: u32) {
        *self = Self::transparent(width, height);
    }

    /// Composite a circle into the buffer.
    ///
    /// A pixel is covered when its center lies within `radius` of `center`.
    pub fn apply(&mut self, op: FogOp, center: Point, radius: f64) {
        if self.width == 0 || self.height == 0 || !center.is_finite() || !(radius > 0.0) {
            return;
        }
        let value = match op {
            FogOp::Reveal => TRANSPARENT,
            FogOp::Hide => OPAQUE,
        };

        let max_x = f64::from(self.width - 1);
        let max_y = f64::from(self.height - 1);
        let x0 = (center.x - radius).floor().clamp(0.0, max_x) as u32;
        let x1 = (center.x + radius).ceil().clamp(0.0, max_x) as u32;
        let y0 = (center.y - radius).floor().clamp(0.0, max_y) as u32;
        let y1 = (center.y + radius).ceil().clamp(0.0, max_y) as u32;
        let r2 = radius * radius;

        for y in y0..=y1 {
            let dy = f64::from(y) + 0.5 - center.y;
            let row = y as usize * self.width as usize;
            for x in x0..=x1 {
                let dx = f64::from(x) + 0.5 - center.x;
                if dx * dx + dy * dy <= r2 {
                    self.alpha[row + x as usize] = value;
                }
            }
        }
    }

    /// Pure form of [`FogBuffer::apply`]
    #[must_use]
    pub fn applied(mut self, op: FogOp, center: Point, radius: f64) -> Self {
        self.apply(op, center, radius);
        self
    }

    /// Clear, then copy `other` in at the origin without scaling.
    /// Pixels outside `other` stay transparent.
    pub fn draw_from(&mut self, other: &FogBuffer) {
        self.clear();
        let w = self.width.min(other.width) as usize;
        let h = self.height.min(other.height);
        for y in 0..h {
            let dst = self.index(0, y);
            let src = other.index(0, y);
            self.alpha[dst..dst + w].copy_from_slice(&other.alpha[src..src + w]);
        }
    }

    /// Black RGBA image carrying the opacity in its alpha channel
    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            Rgba([0, 0, 0, self.alpha[self.index(x, y)]])
        })
    }

    pub fn from_rgba_image(image: &RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            alpha: image.pixels().map(|p| p.0[3]).collect(),
        }
    }
}

/// The fog layer of the active scene
#[derive(Debug, Clone)]
pub struct FogLayer {
    buffer: FogBuffer,
    visible: bool,
    editing: bool,
    tool: FogTool,
    brush_size: f64,
    revision: u64,
}

impl FogLayer {
    pub fn new(brush_size: f64) -> Self {
        Self {
            buffer: FogBuffer::new(0, 0),
            visible: true,
            editing: false,
            tool: FogTool::Reveal,
            brush_size,
            revision: 0,
        }
    }

    pub fn buffer(&self) -> &FogBuffer {
        &self.buffer
    }

    /// Bumped on every change to the buffer content
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// Size the buffer to a newly loaded map and fill it opaque
    pub fn reset_for_map(&mut self, width: u32, height: u32) {
        self.buffer = FogBuffer::new(width, height);
        self.touch();
    }

    /// Size the buffer to the map and draw a persisted raster into it
    pub fn restore(&mut self, width: u32, height: u32, raster: Option<&FogBuffer>) {
        match raster {
            Some(raster) => {
                self.buffer.resize(width, height);
                self.buffer.draw_from(raster);
            }
            None => self.buffer = FogBuffer::new(width, height),
        }
        self.touch();
    }

    pub fn apply(&mut self, op: FogOp, center: Point, radius: f64) {
        self.buffer.apply(op, center, radius);
        self.touch();
    }

    pub fn reveal(&mut self, center: Point, radius: f64) {
        self.apply(FogOp::Reveal, center, radius);
    }

    pub fn hide(&mut self, center: Point, radius: f64) {
        self.apply(FogOp::Hide, center, radius);
    }

    pub fn fill(&mut self) {
        self.buffer.fill();
        self.touch();
    }

    /// Reveal around every token so none is left fully fogged
    pub fn restore_around_tokens<'a>(
        &mut self,
        tokens: impl IntoIterator<Item = &'a Token>,
        multiplier: f64,
    ) {
        for token in tokens {
            if token.position.is_finite() {
                self.buffer
                    .apply(FogOp::Reveal, token.position, token.diameter * multiplier);
            }
        }
        self.touch();
    }

    /// One brush sample with the selected tool.
    ///
    /// Samples are not joined, so a fast stroke can leave gaps.
    pub fn brush(&mut self, at: Point) {
        let radius = self.brush_size;
        self.apply(self.tool.into(), at, radius);
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn toggle_visible(&mut self) -> bool {
        self.visible = !self.visible;
        self.visible
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// Entering edit mode always starts with the reveal tool
    pub fn set_editing(&mut self, editing: bool) {
        self.editing = editing;
        if editing {
            self.tool = FogTool::Reveal;
        }
    }

    pub fn tool(&self) -> FogTool {
        self.tool
    }

    pub fn set_tool(&mut self, tool: FogTool) {
        self.tool = tool;
    }

    pub fn brush_size(&self) -> f64 {
        self.brush_size
    }

    pub fn set_brush_size(&mut self, size: f64) {
        if size.is_finite() && size > 0.0 {
            self.brush_size = size;
        }
    }
}
