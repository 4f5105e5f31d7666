//! Frame sources the collage samples from.
//!
//! Camera plumbing lives outside this crate; anything that can hand over a
//! decoded RGBA frame plus a readiness flag can drive the pipeline.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::Error;
use crate::geometry::PixelSize;

pub trait FrameSource: Send {
    /// Whether [`FrameSource::frame`] can currently produce pixels.
    fn is_ready(&self) -> bool;

    /// The current frame, drawable without further decoding.
    fn frame(&self) -> Result<&RgbaImage, Error>;

    /// Native pixel size of the current frame, if ready.
    fn size(&self) -> Option<PixelSize> {
        if !self.is_ready() {
            return None;
        }
        self.frame()
            .ok()
            .map(|img| PixelSize::new(img.width(), img.height()))
    }

    /// Move to the next frame for sources that hold several stills.
    /// Returns whether the source changed.
    fn advance(&mut self) -> bool {
        false
    }
}

/// In-memory frame, mostly useful for tests and embedding.
#[derive(Debug, Clone)]
pub struct MemorySource {
    image: RgbaImage,
    ready: bool,
}

impl MemorySource {
    pub fn new(image: RgbaImage) -> Self {
        let ready = image.width() > 0 && image.height() > 0;
        Self { image, ready }
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready && self.image.width() > 0 && self.image.height() > 0;
    }

    pub fn replace(&mut self, image: RgbaImage) {
        self.image = image;
        self.set_ready(true);
    }
}

impl FrameSource for MemorySource {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn frame(&self) -> Result<&RgbaImage, Error> {
        if self.ready {
            Ok(&self.image)
        } else {
            Err(Error::SourceNotReady)
        }
    }
}

/// A single decoded still image.
#[derive(Debug)]
pub struct StillImageSource {
    path: PathBuf,
    image: RgbaImage,
}

impl StillImageSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let image = image::open(&path)?.to_rgba8();
        info!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            "opened still image source"
        );
        Ok(Self { path, image })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSource for StillImageSource {
    fn is_ready(&self) -> bool {
        self.image.width() > 0 && self.image.height() > 0
    }

    fn frame(&self) -> Result<&RgbaImage, Error> {
        if self.is_ready() {
            Ok(&self.image)
        } else {
            Err(Error::SourceNotReady)
        }
    }
}

/// A directory of stills, decoded one at a time.
#[derive(Debug)]
pub struct AlbumSource {
    paths: Vec<PathBuf>,
    index: usize,
    current: Option<RgbaImage>,
}

impl AlbumSource {
    /// Recursively collect the supported images under `root` in path order and
    /// decode the first readable one.
    pub fn scan(root: impl AsRef<Path>) -> Result<Self, Error> {
        let root = root.as_ref();
        let mut paths: Vec<PathBuf> = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| is_image(p))
            .collect();
        paths.sort();
        info!(root = %root.display(), count = paths.len(), "scanned album");

        let mut album = Self {
            paths,
            index: 0,
            current: None,
        };
        album.load_from(0);
        Ok(album)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current
            .as_ref()
            .and_then(|_| self.paths.get(self.index))
            .map(PathBuf::as_path)
    }

    /// Decode the first readable image at or after `start`, wrapping once.
    fn load_from(&mut self, start: usize) -> bool {
        let len = self.paths.len();
        for step in 0..len {
            let idx = (start + step) % len;
            let path = &self.paths[idx];
            match image::open(path) {
                Ok(img) => {
                    let img = img.to_rgba8();
                    debug!(
                        path = %path.display(),
                        width = img.width(),
                        height = img.height(),
                        "album image decoded"
                    );
                    self.index = idx;
                    self.current = Some(img);
                    return true;
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable album image");
                }
            }
        }
        self.current = None;
        false
    }
}

impl FrameSource for AlbumSource {
    fn is_ready(&self) -> bool {
        self.current.is_some()
    }

    fn frame(&self) -> Result<&RgbaImage, Error> {
        self.current.as_ref().ok_or(Error::SourceNotReady)
    }

    fn advance(&mut self) -> bool {
        if self.paths.len() < 2 {
            return false;
        }
        let previous = self.index;
        self.load_from(self.index + 1) && self.index != previous
    }
}

fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(OsStr::to_str)
            .map(|s| s.to_ascii_lowercase()),
        Some(ref e) if ["jpg", "jpeg", "png", "gif", "webp"].contains(&e.as_str())
    )
}
