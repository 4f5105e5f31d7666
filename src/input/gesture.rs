//! Two-finger stamp resize with a live preview.

use image::Rgba;
use tracing::{debug, warn};

use crate::config::{GestureOptions, SourceFit};
use crate::geometry::{PixelRect, PixelSize, Point, Rect, ViewportGeometry, device_size};
use crate::mapper::{ScaleFactors, SourceLayout};
use crate::processing::surface::Surface;
use crate::source::FrameSource;

/// Geometry of an in-progress resize gesture, in viewport space except for
/// `current_width`/`current_height` (canvas-internal pixels).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeGestureState {
    pub point1: Point,
    pub point2: Point,
    pub rect: Rect,
    pub center: Point,
    pub current_width: f32,
    pub current_height: f32,
}

/// Footprint proposed by a cleanly released gesture, in canvas-internal pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureCommit {
    pub width: f32,
    pub height: f32,
}

/// Layout measured once when the gesture starts.
#[derive(Debug, Clone, Copy)]
struct GestureCache {
    viewport: ViewportGeometry,
    /// Preview pixels per viewport pixel.
    preview_scale: ScaleFactors,
}

#[derive(Debug)]
struct ActiveGesture {
    geometry: ResizeGestureState,
    cache: GestureCache,
}

pub struct ResizeGestureController {
    active: Option<ActiveGesture>,
    preview: Surface,
    options: GestureOptions,
    vertical_bias: f32,
    max_dimension: u32,
}

impl ResizeGestureController {
    pub fn new(options: GestureOptions, vertical_bias: f32, max_dimension: u32) -> Self {
        Self {
            active: None,
            preview: Surface::new(PixelSize::new(1, 1)),
            options,
            vertical_bias: vertical_bias.max(0.0),
            max_dimension,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn state(&self) -> Option<&ResizeGestureState> {
        self.active.as_ref().map(|g| &g.geometry)
    }

    /// The preview raster; a 1x1 placeholder while inactive.
    pub fn preview(&self) -> &Surface {
        &self.preview
    }

    pub fn set_options(&mut self, options: GestureOptions, vertical_bias: f32, max_dimension: u32) {
        self.options = options;
        self.vertical_bias = vertical_bias.max(0.0);
        self.max_dimension = max_dimension;
    }

    /// Enter the gesture with both contacts down.
    ///
    /// `viewport` is measured here once and trusted until the gesture ends.
    pub fn begin(
        &mut self,
        point1: Point,
        point2: Point,
        viewport: ViewportGeometry,
        canvas_scale: ScaleFactors,
    ) -> bool {
        if !viewport.is_valid() {
            warn!(?viewport, "cannot start resize gesture without a valid viewport");
            return false;
        }
        let size = device_size(
            viewport.width,
            viewport.height,
            viewport.device_pixel_ratio,
            self.max_dimension,
        );
        let Some(preview_scale) = ScaleFactors::between(size, viewport) else {
            return false;
        };
        self.preview.reset(size, Rgba([0, 0, 0, 0]));
        let cache = GestureCache {
            viewport,
            preview_scale,
        };
        let geometry = self.measure(point1, point2, canvas_scale);
        debug!(
            preview_width = size.width,
            preview_height = size.height,
            "resize gesture started"
        );
        self.active = Some(ActiveGesture { geometry, cache });
        true
    }

    /// Recompute the rectangle from the two current contact points.
    pub fn update(&mut self, point1: Point, point2: Point, canvas_scale: ScaleFactors) {
        if self.active.is_none() {
            return;
        }
        let geometry = self.measure(point1, point2, canvas_scale);
        if let Some(active) = self.active.as_mut() {
            active.geometry = geometry;
        }
    }

    fn measure(&self, point1: Point, point2: Point, scale: ScaleFactors) -> ResizeGestureState {
        let y1 = point1.y - self.vertical_bias;
        let y2 = point2.y - self.vertical_bias;
        let x = point1.x.min(point2.x);
        let y = y1.min(y2).max(0.0);
        let width = (point1.x - point2.x).abs();
        let height = (y1 - y2).abs().max(self.options.min_height);
        let rect = Rect::new(x, y, width, height);
        ResizeGestureState {
            point1,
            point2,
            rect,
            center: rect.center(),
            current_width: width * scale.x,
            current_height: height * scale.y,
        }
    }

    /// Redraw the preview: the source under the rectangle, a border and
    /// four corner markers.
    pub fn render_preview(&mut self, source: &dyn FrameSource, fit: SourceFit) {
        let Some(active) = self.active.as_ref() else {
            return;
        };
        let geometry = active.geometry;
        let scale = active.cache.preview_scale;
        self.preview.clear(Rgba([0, 0, 0, 0]));

        let dest = geometry.rect.scaled(scale.x, scale.y);
        if dest.is_empty() {
            return;
        }
        if source.is_ready() {
            let size = self.preview.size();
            if let Err(err) = self.draw_source(source, fit, dest, size) {
                warn!(error = %err, "preview draw failed");
            }
        }

        let border = Rgba(self.options.border_color);
        self.preview
            .stroke_rect(dest, self.options.border_width * scale.x, border);

        let arm = (self.options.corner_length * scale.x)
            .min(dest.width / 2.0)
            .min(dest.height / 2.0);
        let thickness = (self.options.corner_thickness * scale.x).min(arm);
        if arm > 0.0 && thickness > 0.0 {
            let color = Rgba(self.options.corner_color);
            for (x, y, right, bottom) in [
                (dest.x, dest.y, false, false),
                (dest.right(), dest.y, true, false),
                (dest.x, dest.bottom(), false, true),
                (dest.right(), dest.bottom(), true, true),
            ] {
                let hx = if right { x - arm } else { x };
                let vx = if right { x - thickness } else { x };
                let hy = if bottom { y - thickness } else { y };
                let vy = if bottom { y - arm } else { y };
                self.preview
                    .fill_rect(Rect::new(hx, hy, arm, thickness), color);
                self.preview
                    .fill_rect(Rect::new(vx, vy, thickness, arm), color);
            }
        }
    }

    fn draw_source(
        &mut self,
        source: &dyn FrameSource,
        fit: SourceFit,
        dest: Rect,
        preview: PixelSize,
    ) -> Result<(), crate::error::Error> {
        let frame = source.frame()?;
        let bounds = PixelSize::new(frame.width(), frame.height());
        let wanted = SourceLayout::new(fit, bounds).display_rect_to_source(
            preview.width as f32,
            preview.height as f32,
            dest,
        );
        let Some(region) = PixelRect::clamp_within(wanted, bounds) else {
            return Ok(());
        };
        self.preview.draw_image(frame, region, dest)
    }

    /// Clean release: hand back the size to commit and release the preview.
    pub fn end(&mut self) -> Option<GestureCommit> {
        let active = self.active.take()?;
        self.release();
        let commit = GestureCommit {
            width: active.geometry.current_width,
            height: active.geometry.current_height,
        };
        debug!(
            width = commit.width,
            height = commit.height,
            viewport_width = active.cache.viewport.width,
            "resize gesture released"
        );
        Some(commit)
    }

    /// Interrupted gesture: the in-progress size is discarded.
    pub fn cancel(&mut self) -> bool {
        if self.active.take().is_none() {
            return false;
        }
        self.release();
        debug!("resize gesture cancelled; size discarded");
        true
    }

    fn release(&mut self) {
        self.preview.reset(PixelSize::new(1, 1), Rgba([0, 0, 0, 0]));
    }
}
