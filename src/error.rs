use thiserror::Error;

/// Library error type for collage pipeline operations.
///
/// Most of these never escape the pipeline: the session logs them and skips
/// the one operation that failed.
#[derive(Debug, Error)]
pub enum Error {
    /// The frame source has not produced a drawable frame yet.
    #[error("frame source is not ready")]
    SourceNotReady,

    /// The frame source failed while its pixels were being read.
    #[error("frame source failed: {0}")]
    SourceDraw(String),

    /// A raster of the requested size could not be allocated.
    #[error("cannot allocate {width}x{height} raster")]
    Allocation { width: u32, height: u32 },

    /// Resampling between two raster sizes failed.
    #[error("resample failed: {0}")]
    Resample(String),

    /// Image decode/encode error.
    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
