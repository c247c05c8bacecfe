//! Shared geometric and color primitives used across surface, editor and session modules.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterPoint {
    pub x: f32,
    pub y: f32,
}

impl RasterPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBounds {
    pub width: u32,
    pub height: u32,
}

impl ImageBounds {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Axis-aligned rectangle in raster pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn full(bounds: ImageBounds) -> Self {
        Self::new(0, 0, bounds.width, bounds.height)
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub const fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    pub const fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    pub const fn fits_within(&self, bounds: ImageBounds) -> bool {
        !self.is_empty()
            && self.right() <= bounds.width as u64
            && self.bottom() <= bounds.height as u64
    }

    /// Intersects the rectangle with `bounds`; `None` when nothing remains.
    pub fn clamp_to(&self, bounds: ImageBounds) -> Option<Self> {
        if bounds.is_empty() || self.x >= bounds.width || self.y >= bounds.height {
            return None;
        }

        let width = self.width.min(bounds.width - self.x);
        let height = self.height.min(bounds.height - self.y);
        let clamped = Self::new(self.x, self.y, width, height);
        (!clamped.is_empty()).then_some(clamped)
    }

    pub fn center(&self) -> (f64, f64) {
        (
            f64::from(self.x) + f64::from(self.width) / 2.0,
            f64::from(self.y) + f64::from(self.height) / 2.0,
        )
    }

    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Where the raster is currently rendered on screen, in client coordinates.
///
/// The rendered element may be scaled relative to the raster's native size;
/// pointer positions are mapped back through that scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayMapping {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl DisplayMapping {
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Mapping for a raster shown at native size with its origin at (0, 0).
    pub fn native(bounds: ImageBounds) -> Self {
        Self::new(0.0, 0.0, bounds.width as f32, bounds.height as f32)
    }

    pub fn to_raster(&self, client_x: f32, client_y: f32, bounds: ImageBounds) -> RasterPoint {
        let scale_x = axis_scale(bounds.width, self.width);
        let scale_y = axis_scale(bounds.height, self.height);
        RasterPoint::new(
            (client_x - self.left) * scale_x,
            (client_y - self.top) * scale_y,
        )
    }
}

fn axis_scale(native: u32, displayed: f32) -> f32 {
    if displayed.is_finite() && displayed > 0.0 {
        native as f32 / displayed
    } else {
        1.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Self = Self::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn rgb(self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }
}
