use image::RgbaImage;
use tracing::debug;

use crate::error::Error;
use crate::geometry::{PixelRect, PixelSize, Rect};
use crate::source::FrameSource;

/// Extra room allocated whenever the sample buffer has to grow: 6/5, i.e. 20%.
const GROWTH_NUM: u64 = 6;
const GROWTH_DEN: u64 = 5;

/// Copies source rectangles into a reusable offscreen buffer.
///
/// The buffer only ever grows, so steady-state stamping does not allocate.
#[derive(Debug)]
pub struct RegionSampler {
    buffer: RgbaImage,
}

/// A sample held in the sampler's buffer, valid until the next `sample` call.
#[derive(Debug, Clone, Copy)]
pub struct SampledRegion<'a> {
    buffer: &'a RgbaImage,
    /// Where the pixels came from, in source space.
    pub source_rect: PixelRect,
}

impl<'a> SampledRegion<'a> {
    pub fn image(&self) -> &'a RgbaImage {
        self.buffer
    }

    /// Sub-rectangle of [`SampledRegion::image`] holding the sample.
    pub fn region(&self) -> PixelRect {
        PixelRect::new(0, 0, self.source_rect.width, self.source_rect.height)
    }
}

impl Default for RegionSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionSampler {
    pub fn new() -> Self {
        Self {
            buffer: RgbaImage::new(1, 1),
        }
    }

    pub fn capacity(&self) -> PixelSize {
        PixelSize::new(self.buffer.width(), self.buffer.height())
    }

    /// Copy `requested` (source space, clamped to the frame) into the buffer.
    ///
    /// Fails without touching the buffer when the source is not ready or its
    /// frame cannot be read.
    pub fn sample(
        &mut self,
        source: &dyn FrameSource,
        requested: Rect,
    ) -> Result<SampledRegion<'_>, Error> {
        if !source.is_ready() {
            return Err(Error::SourceNotReady);
        }
        let frame = source.frame()?;
        let bounds = PixelSize::new(frame.width(), frame.height());
        let region = PixelRect::clamp_within(requested, bounds)
            .ok_or_else(|| Error::SourceDraw(format!("cannot sample {requested:?} from empty frame")))?;

        self.ensure_capacity(region.size());
        copy_rows(frame, region, &mut self.buffer);

        Ok(SampledRegion {
            buffer: &self.buffer,
            source_rect: region,
        })
    }

    fn ensure_capacity(&mut self, needed: PixelSize) {
        let current = self.capacity();
        if current.width >= needed.width && current.height >= needed.height {
            return;
        }
        let grow = |have: u32, want: u32| {
            if have >= want {
                have
            } else {
                let grown = (u64::from(want) * GROWTH_NUM).div_ceil(GROWTH_DEN);
                u32::try_from(grown).unwrap_or(u32::MAX).max(have)
            }
        };
        let width = grow(current.width, needed.width);
        let height = grow(current.height, needed.height);
        debug!(
            from_width = current.width,
            from_height = current.height,
            width,
            height,
            "growing sample buffer"
        );
        self.buffer = RgbaImage::new(width, height);
    }
}

/// Row-wise copy of `region` of `src` into the top-left corner of `dst`.
fn copy_rows(src: &RgbaImage, region: PixelRect, dst: &mut RgbaImage) {
    let src_stride = src.width() as usize * 4;
    let dst_stride = dst.width() as usize * 4;
    let row_len = region.width as usize * 4;
    let src_raw = src.as_raw();
    let dst_raw: &mut [u8] = dst;
    for row in 0..region.height as usize {
        let s = (region.y as usize + row) * src_stride + region.x as usize * 4;
        let d = row * dst_stride;
        dst_raw[d..d + row_len].copy_from_slice(&src_raw[s..s + row_len]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use image::Rgba;

    fn gradient(w: u32, h: u32) -> MemorySource {
        MemorySource::new(RgbaImage::from_fn(w, h, |x, y| {
            Rgba([x as u8, y as u8, 7, 255])
        }))
    }

    #[test]
    fn copies_requested_pixels() {
        let src = gradient(100, 80);
        let mut sampler = RegionSampler::new();
        let sample = sampler.sample(&src, Rect::new(10.0, 20.0, 30.0, 15.0)).unwrap();
        assert_eq!(sample.source_rect, PixelRect::new(10, 20, 30, 15));
        assert_eq!(sample.region().size(), PixelSize::new(30, 15));
        assert_eq!(sample.image().get_pixel(0, 0).0, [10, 20, 7, 255]);
        assert_eq!(sample.image().get_pixel(29, 14).0, [39, 34, 7, 255]);
    }

    #[test]
    fn grows_with_headroom_and_never_shrinks() {
        let src = gradient(200, 200);
        let mut sampler = RegionSampler::new();
        sampler.sample(&src, Rect::new(0.0, 0.0, 50.0, 40.0)).unwrap();
        assert_eq!(sampler.capacity(), PixelSize::new(60, 48));

        sampler.sample(&src, Rect::new(0.0, 0.0, 55.0, 10.0)).unwrap();
        assert_eq!(sampler.capacity(), PixelSize::new(60, 48));

        sampler.sample(&src, Rect::new(0.0, 0.0, 10.0, 100.0)).unwrap();
        assert_eq!(sampler.capacity(), PixelSize::new(60, 120));

        sampler.sample(&src, Rect::new(0.0, 0.0, 2.0, 2.0)).unwrap();
        assert_eq!(sampler.capacity(), PixelSize::new(60, 120));
    }

    #[test]
    fn headroom_rounds_up_exactly() {
        let src = gradient(200, 200);
        let mut sampler = RegionSampler::new();
        // 1.2 is not exact in binary floating point; 50 * 1.2 must still be 60.
        sampler.sample(&src, Rect::new(0.0, 0.0, 50.0, 51.0)).unwrap();
        assert_eq!(sampler.capacity(), PixelSize::new(60, 62));
    }

    #[test]
    fn out_of_bounds_requests_are_clamped_inside_the_frame() {
        let src = gradient(64, 48);
        let mut sampler = RegionSampler::new();
        let sample = sampler
            .sample(&src, Rect::new(-16.0, 40.0, 32.0, 32.0))
            .unwrap();
        assert_eq!(sample.source_rect, PixelRect::new(0, 40, 16, 8));
        assert!(sample.source_rect.fits_within(PixelSize::new(64, 48)));
    }

    #[test]
    fn not_ready_source_leaves_buffer_untouched() {
        let mut src = gradient(64, 48);
        let mut sampler = RegionSampler::new();
        sampler.sample(&src, Rect::new(0.0, 0.0, 10.0, 10.0)).unwrap();
        let before = sampler.capacity();

        src.set_ready(false);
        let err = sampler.sample(&src, Rect::new(0.0, 0.0, 40.0, 40.0));
        assert!(matches!(err, Err(Error::SourceNotReady)));
        assert_eq!(sampler.capacity(), before);
    }
}
