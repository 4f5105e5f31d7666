use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, RgbaImage};
use tracing::info;

use crate::error::Error;

/// Encode a finished collage as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, Error> {
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png)?;
    Ok(bytes.into_inner())
}

pub fn save_png(path: impl AsRef<Path>, image: &RgbaImage) -> Result<(), Error> {
    let path = path.as_ref();
    let bytes = encode_png(image)?;
    std::fs::write(path, &bytes)?;
    info!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        bytes = bytes.len(),
        "collage saved"
    );
    Ok(())
}
