//! Software drawing surface with a save/restore state stack.
//!
//! Models the small subset of a 2D canvas context the collage needs: an
//! affine transform, a drop shadow, image drawing through both, and
//! device-space rectangle fills for overlays.

use std::ops::{Deref, DerefMut};

use image::{Pixel, Rgba, RgbaImage, imageops};

use crate::error::Error;
use crate::geometry::{PixelRect, PixelSize, Point, Rect};
use crate::processing::resample::resample_region;

/// 2D affine transform `[a c e; b d f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Affine {
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub const fn translation(tx: f32, ty: f32) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    pub fn rotation(radians: f32) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        }
    }

    /// `self ∘ other`: applies `other` first.
    pub fn then_apply(&self, other: &Self) -> Self {
        Self {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
        )
    }

    pub fn invert(&self) -> Option<Self> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < f32::EPSILON || !det.is_finite() {
            return None;
        }
        Some(Self {
            a: self.d / det,
            b: -self.b / det,
            c: -self.c / det,
            d: self.a / det,
            e: (self.c * self.f - self.d * self.e) / det,
            f: (self.b * self.e - self.a * self.f) / det,
        })
    }

    pub fn is_translation(&self) -> bool {
        const EPS: f32 = 1e-6;
        (self.a - 1.0).abs() < EPS
            && (self.d - 1.0).abs() < EPS
            && self.b.abs() < EPS
            && self.c.abs() < EPS
    }
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub color: Rgba<u8>,
    pub blur: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Shadow {
    fn is_visible(&self) -> bool {
        self.color.0[3] > 0
            && (self.blur > 0.0 || self.offset_x != 0.0 || self.offset_y != 0.0)
    }

    /// Distance the shadow may reach beyond the drawn pixels.
    fn reach(&self) -> f32 {
        self.blur * 1.5 + self.offset_x.abs().max(self.offset_y.abs())
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct DrawState {
    transform: Affine,
    shadow: Option<Shadow>,
}

#[derive(Debug, Clone)]
pub struct Surface {
    image: RgbaImage,
    state: DrawState,
    saved: Vec<DrawState>,
    has_content: bool,
}

impl Surface {
    pub fn new(size: PixelSize) -> Self {
        Self::filled(size, Rgba([0, 0, 0, 0]))
    }

    pub fn filled(size: PixelSize, background: Rgba<u8>) -> Self {
        Self {
            image: RgbaImage::from_pixel(size.width.max(1), size.height.max(1), background),
            state: DrawState::default(),
            saved: Vec::new(),
            has_content: false,
        }
    }

    pub fn size(&self) -> PixelSize {
        PixelSize::new(self.image.width(), self.image.height())
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Whether anything was drawn since the last clear or reset.
    pub fn has_content(&self) -> bool {
        self.has_content
    }

    /// Reallocate at `size`; content and drawing state are discarded.
    pub fn reset(&mut self, size: PixelSize, background: Rgba<u8>) {
        *self = Self::filled(size, background);
    }

    /// Adopt a raster produced elsewhere (e.g. a resampled copy of this one).
    pub fn replace_image(&mut self, image: RgbaImage) {
        self.image = image;
        self.state = DrawState::default();
        self.saved.clear();
        self.has_content = true;
    }

    pub fn clear(&mut self, background: Rgba<u8>) {
        for px in self.image.pixels_mut() {
            *px = background;
        }
        self.has_content = false;
    }

    /// Push the drawing state; it is restored when the guard drops, whatever
    /// happens in between.
    pub fn save(&mut self) -> SurfaceGuard<'_> {
        self.saved.push(self.state);
        let depth = self.saved.len();
        SurfaceGuard {
            surface: self,
            depth,
        }
    }

    fn restore_to(&mut self, depth: usize) {
        while self.saved.len() >= depth {
            match self.saved.pop() {
                Some(state) => self.state = state,
                None => break,
            }
        }
    }

    pub fn transform(&self) -> Affine {
        self.state.transform
    }

    pub fn shadow(&self) -> Option<Shadow> {
        self.state.shadow
    }

    pub fn translate(&mut self, tx: f32, ty: f32) {
        self.state.transform = self
            .state
            .transform
            .then_apply(&Affine::translation(tx, ty));
    }

    pub fn rotate(&mut self, radians: f32) {
        self.state.transform = self.state.transform.then_apply(&Affine::rotation(radians));
    }

    pub fn set_shadow(&mut self, shadow: Shadow) {
        self.state.shadow = Some(shadow);
    }

    /// Blend `color` over a device-space rectangle (transform and shadow ignored).
    pub fn fill_rect(&mut self, rect: Rect, color: Rgba<u8>) {
        let Some(area) = self.device_area(rect) else {
            return;
        };
        for y in area.y..area.y + area.height {
            for x in area.x..area.x + area.width {
                self.image.get_pixel_mut(x, y).blend(&color);
            }
        }
        self.has_content = true;
    }

    /// Outline `rect` with a border of `width` drawn inside its edges.
    pub fn stroke_rect(&mut self, rect: Rect, width: f32, color: Rgba<u8>) {
        if rect.is_empty() || width <= 0.0 {
            return;
        }
        let w = width.min(rect.width / 2.0).max(1.0);
        let h = width.min(rect.height / 2.0).max(1.0);
        self.fill_rect(Rect::new(rect.x, rect.y, rect.width, h), color);
        self.fill_rect(Rect::new(rect.x, rect.bottom() - h, rect.width, h), color);
        self.fill_rect(Rect::new(rect.x, rect.y + h, w, rect.height - 2.0 * h), color);
        self.fill_rect(
            Rect::new(rect.right() - w, rect.y + h, w, rect.height - 2.0 * h),
            color,
        );
    }

    /// Draw `region` of `image` into `dest`, through the current transform and shadow.
    ///
    /// An empty or non-finite destination draws nothing. A region outside
    /// `image` is an error and leaves the surface untouched.
    pub fn draw_image(
        &mut self,
        image: &RgbaImage,
        region: PixelRect,
        dest: Rect,
    ) -> Result<(), Error> {
        if !region.fits_within(PixelSize::new(image.width(), image.height())) {
            return Err(Error::SourceDraw(format!(
                "region {region:?} outside {}x{} image",
                image.width(),
                image.height()
            )));
        }
        if dest.is_empty() || !dest.is_finite() {
            return Ok(());
        }

        let transform = self.state.transform;
        if transform.is_translation() {
            let origin = transform.apply(Point::new(dest.x, dest.y));
            let target = PixelSize::new(
                dest.width.round().max(1.0) as u32,
                dest.height.round().max(1.0) as u32,
            );
            let layer = resample_region(image, region, target)?;
            self.composite_layer(&layer, origin.x.round() as i64, origin.y.round() as i64);
            return Ok(());
        }

        let Some(inverse) = transform.invert() else {
            return Ok(());
        };
        let target = PixelSize::new(
            dest.width.ceil().max(1.0) as u32,
            dest.height.ceil().max(1.0) as u32,
        );
        let scaled = resample_region(image, region, target)?;
        if let Some((layer, x, y)) = self.transformed_layer(&scaled, dest, &transform, &inverse) {
            self.composite_layer(&layer, x, y);
        }
        Ok(())
    }

    /// Rasterize `scaled` (already at destination resolution) under `transform`
    /// into a layer covering the transformed bounds.
    fn transformed_layer(
        &self,
        scaled: &RgbaImage,
        dest: Rect,
        transform: &Affine,
        inverse: &Affine,
    ) -> Option<(RgbaImage, i64, i64)> {
        let corners = [
            Point::new(dest.x, dest.y),
            Point::new(dest.right(), dest.y),
            Point::new(dest.x, dest.bottom()),
            Point::new(dest.right(), dest.bottom()),
        ]
        .map(|p| transform.apply(p));
        let min_x = corners.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
        let max_x = corners.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max);
        let min_y = corners.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
        let max_y = corners.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max);

        let reach = self.state.shadow.map_or(0.0, |s| s.reach());
        let size = self.size();
        let x0 = min_x.floor().max(-reach.ceil()) as i64;
        let y0 = min_y.floor().max(-reach.ceil()) as i64;
        let x1 = max_x.ceil().min(size.width as f32 + reach.ceil()) as i64;
        let y1 = max_y.ceil().min(size.height as f32 + reach.ceil()) as i64;
        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        let sx = scaled.width() as f32 / dest.width;
        let sy = scaled.height() as f32 / dest.height;
        let layer = RgbaImage::from_fn((x1 - x0) as u32, (y1 - y0) as u32, |lx, ly| {
            let device = Point::new(
                (x0 + i64::from(lx)) as f32 + 0.5,
                (y0 + i64::from(ly)) as f32 + 0.5,
            );
            let local = inverse.apply(device);
            let qx = local.x - dest.x;
            let qy = local.y - dest.y;
            let coverage = edge_coverage(qx, dest.width) * edge_coverage(qy, dest.height);
            if coverage <= 0.0 {
                return Rgba([0, 0, 0, 0]);
            }
            let mut px = sample_bilinear(scaled, qx * sx - 0.5, qy * sy - 0.5);
            px.0[3] = (f32::from(px.0[3]) * coverage).round() as u8;
            px
        });
        Some((layer, x0, y0))
    }

    /// Blend a rendered layer (and its shadow, when set) onto the surface.
    fn composite_layer(&mut self, layer: &RgbaImage, x: i64, y: i64) {
        if let Some(shadow) = self.state.shadow.filter(Shadow::is_visible) {
            let pad = (shadow.blur * 1.5).ceil().max(0.0) as u32;
            let [r, g, b, a] = shadow.color.0;
            let mut mask = RgbaImage::from_pixel(
                layer.width() + 2 * pad,
                layer.height() + 2 * pad,
                Rgba([r, g, b, 0]),
            );
            for (lx, ly, px) in layer.enumerate_pixels() {
                let alpha = u16::from(px.0[3]) * u16::from(a) / 255;
                mask.get_pixel_mut(lx + pad, ly + pad).0[3] = alpha as u8;
            }
            let sigma = shadow.blur / 2.0;
            let mask = if sigma > 0.0 {
                imageops::blur(&mask, sigma)
            } else {
                mask
            };
            imageops::overlay(
                &mut self.image,
                &mask,
                x - i64::from(pad) + shadow.offset_x.round() as i64,
                y - i64::from(pad) + shadow.offset_y.round() as i64,
            );
        }
        imageops::overlay(&mut self.image, layer, x, y);
        self.has_content = true;
    }

    fn device_area(&self, rect: Rect) -> Option<PixelRect> {
        if rect.is_empty() || !rect.is_finite() {
            return None;
        }
        let size = self.size();
        let x0 = rect.x.round().max(0.0);
        let y0 = rect.y.round().max(0.0);
        let x1 = rect.right().round().min(size.width as f32);
        let y1 = rect.bottom().round().min(size.height as f32);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(PixelRect::new(
            x0 as u32,
            y0 as u32,
            (x1 - x0) as u32,
            (y1 - y0) as u32,
        ))
    }
}

/// Scoped drawing state; dropping it restores the state saved by [`Surface::save`].
pub struct SurfaceGuard<'a> {
    surface: &'a mut Surface,
    depth: usize,
}

impl Deref for SurfaceGuard<'_> {
    type Target = Surface;

    fn deref(&self) -> &Surface {
        self.surface
    }
}

impl DerefMut for SurfaceGuard<'_> {
    fn deref_mut(&mut self) -> &mut Surface {
        self.surface
    }
}

impl Drop for SurfaceGuard<'_> {
    fn drop(&mut self) {
        self.surface.restore_to(self.depth);
    }
}

/// Antialiased coverage of a sample at `q` along an edge span `[0, len]`.
fn edge_coverage(q: f32, len: f32) -> f32 {
    (q.min(len - q) + 0.5).clamp(0.0, 1.0)
}

/// Premultiplied bilinear sample with edge clamping.
fn sample_bilinear(img: &RgbaImage, x: f32, y: f32) -> Rgba<u8> {
    let max_x = img.width().saturating_sub(1) as f32;
    let max_y = img.height().saturating_sub(1) as f32;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);
    let x0 = x.floor();
    let y0 = y.floor();
    let tx = x - x0;
    let ty = y - y0;
    let x1 = (x0 + 1.0).min(max_x);
    let y1 = (y0 + 1.0).min(max_y);

    let mut acc = [0.0f32; 4];
    for (px, py, w) in [
        (x0, y0, (1.0 - tx) * (1.0 - ty)),
        (x1, y0, tx * (1.0 - ty)),
        (x0, y1, (1.0 - tx) * ty),
        (x1, y1, tx * ty),
    ] {
        if w <= 0.0 {
            continue;
        }
        let p = img.get_pixel(px as u32, py as u32).0;
        let alpha = f32::from(p[3]) * w;
        for c in 0..3 {
            acc[c] += f32::from(p[c]) * alpha;
        }
        acc[3] += alpha;
    }
    if acc[3] <= f32::EPSILON {
        return Rgba([0, 0, 0, 0]);
    }
    Rgba([
        (acc[0] / acc[3]).round().clamp(0.0, 255.0) as u8,
        (acc[1] / acc[3]).round().clamp(0.0, 255.0) as u8,
        (acc[2] / acc[3]).round().clamp(0.0, 255.0) as u8,
        acc[3].round().clamp(0.0, 255.0) as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn red_tile(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, RED)
    }

    #[test]
    fn affine_inverse_round_trips() {
        let m = Affine::translation(40.0, -12.0)
            .then_apply(&Affine::rotation(0.3))
            .then_apply(&Affine::translation(-40.0, 12.0));
        let inv = m.invert().unwrap();
        let p = Point::new(17.0, 93.0);
        let back = inv.apply(m.apply(p));
        assert!((back.x - p.x).abs() < 1e-3 && (back.y - p.y).abs() < 1e-3);
    }

    #[test]
    fn guard_restores_state_on_drop() {
        let mut surface = Surface::new(PixelSize::new(10, 10));
        {
            let mut ctx = surface.save();
            ctx.translate(5.0, 5.0);
            ctx.rotate(1.0);
            ctx.set_shadow(Shadow {
                color: RED,
                blur: 2.0,
                offset_x: 1.0,
                offset_y: 1.0,
            });
            assert!(!ctx.transform().is_translation());
        }
        assert_eq!(surface.transform(), Affine::IDENTITY);
        assert!(surface.shadow().is_none());
    }

    #[test]
    fn nested_guards_unwind_in_order() {
        let mut surface = Surface::new(PixelSize::new(4, 4));
        let mut outer = surface.save();
        outer.translate(1.0, 0.0);
        {
            let mut inner = outer.save();
            inner.translate(1.0, 0.0);
            assert_eq!(inner.transform().e, 2.0);
        }
        assert_eq!(outer.transform().e, 1.0);
        drop(outer);
        assert_eq!(surface.transform().e, 0.0);
    }

    #[test]
    fn untransformed_draw_lands_on_exact_pixels() {
        let mut surface = Surface::new(PixelSize::new(20, 20));
        let tile = red_tile(8, 8);
        surface
            .draw_image(&tile, PixelRect::new(0, 0, 8, 8), Rect::new(5.0, 6.0, 8.0, 8.0))
            .unwrap();
        assert_eq!(*surface.image().get_pixel(5, 6), RED);
        assert_eq!(*surface.image().get_pixel(12, 13), RED);
        assert_eq!(surface.image().get_pixel(4, 6).0[3], 0);
        assert_eq!(surface.image().get_pixel(13, 13).0[3], 0);
        assert!(surface.has_content());
    }

    #[test]
    fn rotated_draw_keeps_center_and_moves_corners() {
        let mut surface = Surface::new(PixelSize::new(60, 60));
        {
            let mut ctx = surface.save();
            ctx.translate(30.0, 30.0);
            ctx.rotate(std::f32::consts::FRAC_PI_4);
            ctx.translate(-30.0, -30.0);
            ctx.draw_image(
                &red_tile(20, 20),
                PixelRect::new(0, 0, 20, 20),
                Rect::new(20.0, 20.0, 20.0, 20.0),
            )
            .unwrap();
        }
        assert_eq!(*surface.image().get_pixel(30, 30), RED);
        // The unrotated top-left corner is outside a diamond.
        assert_eq!(surface.image().get_pixel(21, 21).0[3], 0);
        // The diamond's top tip reaches above the original top edge.
        assert!(surface.image().get_pixel(30, 17).0[3] > 0);
    }

    #[test]
    fn shadow_is_drawn_beneath_at_offset() {
        let mut surface = Surface::new(PixelSize::new(30, 30));
        {
            let mut ctx = surface.save();
            ctx.set_shadow(Shadow {
                color: Rgba([0, 0, 0, 255]),
                blur: 0.0,
                offset_x: 5.0,
                offset_y: 5.0,
            });
            ctx.draw_image(
                &red_tile(10, 10),
                PixelRect::new(0, 0, 10, 10),
                Rect::new(5.0, 5.0, 10.0, 10.0),
            )
            .unwrap();
        }
        assert_eq!(*surface.image().get_pixel(7, 7), RED);
        assert_eq!(surface.image().get_pixel(17, 17).0, [0, 0, 0, 255]);
        assert_eq!(surface.image().get_pixel(25, 25).0[3], 0);
    }

    #[test]
    fn out_of_range_region_is_rejected_without_drawing() {
        let mut surface = Surface::new(PixelSize::new(10, 10));
        let err = surface.draw_image(
            &red_tile(4, 4),
            PixelRect::new(2, 2, 4, 4),
            Rect::new(0.0, 0.0, 4.0, 4.0),
        );
        assert!(err.is_err());
        assert!(!surface.has_content());
    }

    #[test]
    fn stroke_leaves_interior_untouched() {
        let mut surface = Surface::new(PixelSize::new(20, 20));
        surface.stroke_rect(Rect::new(2.0, 2.0, 16.0, 16.0), 2.0, RED);
        assert_eq!(*surface.image().get_pixel(2, 2), RED);
        assert_eq!(*surface.image().get_pixel(17, 10), RED);
        assert_eq!(surface.image().get_pixel(10, 10).0[3], 0);
    }
}
