use fast_image_resize as fir;
use image::{RgbaImage, imageops};

use crate::error::Error;
use crate::geometry::{PixelRect, PixelSize};

/// Resample a whole raster to `target`, stretching when the aspect ratio differs.
///
/// Pure: the input is left untouched, so a failure leaves the caller with its
/// original pixels.
pub fn resample(source: &RgbaImage, target: PixelSize) -> Result<RgbaImage, Error> {
    let full = PixelRect::full(PixelSize::new(source.width(), source.height()));
    resample_region(source, full, target)
}

/// Resample the `region` of `source` to a fresh `target`-sized raster.
pub fn resample_region(
    source: &RgbaImage,
    region: PixelRect,
    target: PixelSize,
) -> Result<RgbaImage, Error> {
    if target.width == 0 || target.height == 0 {
        return Err(Error::Allocation {
            width: target.width,
            height: target.height,
        });
    }
    let bounds = PixelSize::new(source.width(), source.height());
    if !region.fits_within(bounds) {
        return Err(Error::Resample(format!(
            "region {region:?} outside {}x{} raster",
            bounds.width, bounds.height
        )));
    }
    if region.size() == target {
        return Ok(
            imageops::crop_imm(source, region.x, region.y, region.width, region.height).to_image(),
        );
    }

    let src_view = fir::images::ImageRef::new(
        source.width(),
        source.height(),
        source.as_raw(),
        fir::PixelType::U8x4,
    )
    .map_err(|err| Error::Resample(format!("source view: {err}")))?;
    let mut dst_image = fir::images::Image::new(target.width, target.height, fir::PixelType::U8x4);
    let options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::CatmullRom))
        .crop(
            f64::from(region.x),
            f64::from(region.y),
            f64::from(region.width),
            f64::from(region.height),
        );
    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_view, &mut dst_image, Some(&options))
        .map_err(|err| Error::Resample(err.to_string()))?;
    RgbaImage::from_raw(target.width, target.height, dst_image.into_vec()).ok_or(
        Error::Allocation {
            width: target.width,
            height: target.height,
        },
    )
}
