//! Plain geometry shared by the viewport, canvas and source coordinate spaces.
//!
//! Values carry no space tag; the owning component documents which space a
//! value lives in.

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_center(center: Point, width: f32, height: f32) -> Self {
        Self::new(
            center.x - width / 2.0,
            center.y - height / 2.0,
            width,
            height,
        )
    }

    /// Smallest rectangle containing both points.
    pub fn spanning(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self::new(x, y, (a.x - b.x).abs(), (a.y - b.y).abs())
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        Self::new(self.x * sx, self.y * sy, self.width * sx, self.height * sy)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }
}

/// Integer pixel dimensions of a raster buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Integer pixel rectangle inside a raster.
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

    pub const fn full(size: PixelSize) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    /// Clamp `rect` into `[0, width) x [0, height)`.
    ///
    /// Parts hanging over an edge are cut off rather than shifted, so the
    /// result shrinks in proportion to the overhang. A rectangle lying fully
    /// outside collapses onto the nearest edge pixel; the result is never
    /// empty. `None` only when `bounds` is empty or `rect` is not finite.
    pub fn clamp_within(rect: Rect, bounds: PixelSize) -> Option<Self> {
        if bounds.width == 0 || bounds.height == 0 || !rect.is_finite() {
            return None;
        }
        let (x, width) = clamp_span(rect.x, rect.width.max(0.0), bounds.width);
        let (y, height) = clamp_span(rect.y, rect.height.max(0.0), bounds.height);
        Some(Self::new(x, y, width, height))
    }

    pub fn size(&self) -> PixelSize {
        PixelSize::new(self.width, self.height)
    }

    pub fn fits_within(&self, bounds: PixelSize) -> bool {
        self.width > 0
            && self.height > 0
            && u64::from(self.x) + u64::from(self.width) <= u64::from(bounds.width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(bounds.height)
    }
}

fn clamp_span(start: f32, len: f32, limit: u32) -> (u32, u32) {
    let limit = limit as f32;
    let lo = start.floor().clamp(0.0, limit - 1.0);
    let hi = (start + len).ceil().clamp(lo + 1.0, limit);
    (lo as u32, (hi - lo) as u32)
}

/// Layout measurements of the visible page: CSS-pixel size plus device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportGeometry {
    pub width: f32,
    pub height: f32,
    pub device_pixel_ratio: f32,
}

impl ViewportGeometry {
    pub const fn new(width: f32, height: f32, device_pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.width.is_finite()
            && self.height.is_finite()
            && self.device_pixel_ratio.is_finite()
            && self.width > 0.0
            && self.height > 0.0
            && self.device_pixel_ratio > 0.0
    }
}

/// Pixel size for a `css_w x css_h` surface at `dpr`, uniformly downscaled so
/// neither side exceeds `max_dimension`.
pub fn device_size(css_w: f32, css_h: f32, dpr: f32, max_dimension: u32) -> PixelSize {
    let w = (css_w * dpr).round().max(1.0);
    let h = (css_h * dpr).round().max(1.0);
    let max = max_dimension.max(1) as f32;
    let longest = w.max(h);
    if longest <= max {
        return PixelSize::new(w as u32, h as u32);
    }
    let ratio = max / longest;
    let w = (w * ratio).round().clamp(1.0, max);
    let h = (h * ratio).round().clamp(1.0, max);
    PixelSize::new(w as u32, h as u32)
}
