//! Viewport -> canvas -> source coordinate conversion.

use crate::config::SourceFit;
use crate::geometry::{PixelSize, Point, Rect, ViewportGeometry};

/// Canvas-internal pixels per viewport pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    pub x: f32,
    pub y: f32,
}

impl ScaleFactors {
    pub fn between(canvas: PixelSize, viewport: ViewportGeometry) -> Option<Self> {
        if !viewport.is_valid() {
            return None;
        }
        Some(Self {
            x: canvas.width as f32 / viewport.width,
            y: canvas.height as f32 / viewport.height,
        })
    }
}

/// How a source of `source` pixels is laid out over a display surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceLayout {
    pub fit: SourceFit,
    pub source: PixelSize,
}

impl SourceLayout {
    pub const fn new(fit: SourceFit, source: PixelSize) -> Self {
        Self { fit, source }
    }

    /// Source pixels per display pixel on each axis, plus the display-space
    /// origin of the drawn source.
    fn transform(&self, display_w: f32, display_h: f32) -> (f32, f32, f32, f32) {
        let sw = self.source.width.max(1) as f32;
        let sh = self.source.height.max(1) as f32;
        let dw = display_w.max(1.0);
        let dh = display_h.max(1.0);
        match self.fit {
            SourceFit::Stretch => (sw / dw, sh / dh, 0.0, 0.0),
            SourceFit::Cover => {
                let scale = (dw / sw).max(dh / sh);
                let ox = (dw - sw * scale) / 2.0;
                let oy = (dh - sh * scale) / 2.0;
                (1.0 / scale, 1.0 / scale, ox, oy)
            }
        }
    }

    pub fn display_to_source(&self, display_w: f32, display_h: f32, point: Point) -> Point {
        let (sx, sy, ox, oy) = self.transform(display_w, display_h);
        Point::new((point.x - ox) * sx, (point.y - oy) * sy)
    }

    pub fn source_to_display(&self, display_w: f32, display_h: f32, point: Point) -> Point {
        let (sx, sy, ox, oy) = self.transform(display_w, display_h);
        Point::new(point.x / sx + ox, point.y / sy + oy)
    }

    /// Map a display-space rectangle into (unclamped) source space.
    pub fn display_rect_to_source(&self, display_w: f32, display_h: f32, rect: Rect) -> Rect {
        let (sx, sy, ox, oy) = self.transform(display_w, display_h);
        Rect::new(
            (rect.x - ox) * sx,
            (rect.y - oy) * sy,
            rect.width * sx,
            rect.height * sy,
        )
    }
}

/// A contact point resolved into canvas (and optionally source) space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappedPoint {
    pub canvas: Point,
    pub source: Option<Point>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Calibration {
    scale: ScaleFactors,
    canvas: PixelSize,
}

/// Converts viewport input into canvas and source coordinates.
///
/// Holds no state of its own beyond the calibration written by the canvas
/// lifecycle; until the first canvas size exists every conversion is `None`.
#[derive(Debug, Clone)]
pub struct SpaceMapper {
    calibration: Option<Calibration>,
    vertical_bias: f32,
    fit: SourceFit,
}

impl SpaceMapper {
    pub fn new(vertical_bias: f32, fit: SourceFit) -> Self {
        Self {
            calibration: None,
            vertical_bias: vertical_bias.max(0.0),
            fit,
        }
    }

    pub(crate) fn calibrate(&mut self, scale: ScaleFactors, canvas: PixelSize) {
        self.calibration = Some(Calibration { scale, canvas });
    }

    pub fn set_vertical_bias(&mut self, bias: f32) {
        self.vertical_bias = bias.max(0.0);
    }

    pub fn set_fit(&mut self, fit: SourceFit) {
        self.fit = fit;
    }

    pub fn scale(&self) -> Option<ScaleFactors> {
        self.calibration.map(|c| c.scale)
    }

    pub fn canvas_size(&self) -> Option<PixelSize> {
        self.calibration.map(|c| c.canvas)
    }

    pub fn vertical_bias(&self) -> f32 {
        self.vertical_bias
    }

    pub fn layout(&self, source: PixelSize) -> SourceLayout {
        SourceLayout::new(self.fit, source)
    }

    /// Lift a viewport y coordinate by the bias, never above the top edge.
    pub fn biased_y(&self, y: f32) -> f32 {
        (y - self.vertical_bias).max(0.0)
    }

    /// Biased viewport point scaled into canvas-internal space.
    pub fn to_canvas(&self, viewport_x: f32, viewport_y: f32) -> Option<Point> {
        let scale = self.scale()?;
        Some(Point::new(
            viewport_x * scale.x,
            self.biased_y(viewport_y) * scale.y,
        ))
    }

    /// Resolve a contact point into canvas space and, when a source size is
    /// known, into that source's pixel space.
    pub fn to_canvas_and_source(
        &self,
        viewport_x: f32,
        viewport_y: f32,
        source: Option<PixelSize>,
    ) -> Option<MappedPoint> {
        let calibration = self.calibration?;
        let canvas = self.to_canvas(viewport_x, viewport_y)?;
        let source = source.map(|size| {
            self.layout(size).display_to_source(
                calibration.canvas.width as f32,
                calibration.canvas.height as f32,
                canvas,
            )
        });
        Some(MappedPoint { canvas, source })
    }

    /// Source rectangle shown under a canvas-space rectangle.
    pub fn canvas_rect_to_source(&self, rect: Rect, source: PixelSize) -> Option<Rect> {
        let calibration = self.calibration?;
        Some(self.layout(source).display_rect_to_source(
            calibration.canvas.width as f32,
            calibration.canvas.height as f32,
            rect,
        ))
    }
}
