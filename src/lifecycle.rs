//! Persistent canvas sizing.
//!
//! The canvas follows the viewport at device resolution. A size change
//! resamples the existing collage into the new raster (stretching when the
//! aspect ratio changes) and re-derives every size-dependent setting.

use image::{Rgba, RgbaImage};
use tracing::{debug, info, warn};

use crate::config::Configuration;
use crate::error::Error;
use crate::geometry::{PixelSize, ViewportGeometry, device_size};
use crate::mapper::{ScaleFactors, SpaceMapper};
use crate::processing::resample::resample;
use crate::processing::surface::Surface;
use crate::settings::{ScaledSettings, StampSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeOutcome {
    pub size: PixelSize,
    /// The canvas raster was reallocated.
    pub changed: bool,
    /// Previous content was carried over by resampling.
    pub resampled: bool,
}

pub struct CanvasLifecycleManager {
    canvas: Surface,
    viewport: Option<ViewportGeometry>,
    scaled: ScaledSettings,
    max_dimension: u32,
    background: Rgba<u8>,
}

impl CanvasLifecycleManager {
    pub fn new(config: &Configuration) -> Self {
        let background = Rgba(config.canvas.background);
        Self {
            canvas: Surface::filled(PixelSize::new(1, 1), background),
            viewport: None,
            scaled: ScaledSettings::for_canvas_width(config, 1),
            max_dimension: config.canvas.max_dimension,
            background,
        }
    }

    pub fn canvas(&self) -> &Surface {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Surface {
        &mut self.canvas
    }

    pub fn into_canvas(self) -> RgbaImage {
        self.canvas.into_image()
    }

    /// `None` until the first valid resize.
    pub fn viewport(&self) -> Option<ViewportGeometry> {
        self.viewport
    }

    pub fn scaled(&self) -> &ScaledSettings {
        &self.scaled
    }

    pub fn background(&self) -> Rgba<u8> {
        self.background
    }

    /// Fit the canvas to `viewport`.
    ///
    /// Same target size: only the scale factors are refreshed, nothing is
    /// resampled. Otherwise content is resampled into the new size; if that
    /// fails the canvas starts over empty.
    pub fn resize(
        &mut self,
        viewport: ViewportGeometry,
        config: &Configuration,
        mapper: &mut SpaceMapper,
        stamp: &mut StampSettings,
    ) -> Option<ResizeOutcome> {
        self.resize_with(viewport, config, mapper, stamp, resample)
    }

    /// [`resize`](Self::resize) with the content carry-over step supplied by
    /// the caller.
    pub(crate) fn resize_with<F>(
        &mut self,
        viewport: ViewportGeometry,
        config: &Configuration,
        mapper: &mut SpaceMapper,
        stamp: &mut StampSettings,
        carry: F,
    ) -> Option<ResizeOutcome>
    where
        F: FnOnce(&RgbaImage, PixelSize) -> Result<RgbaImage, Error>,
    {
        if !viewport.is_valid() {
            warn!(?viewport, "ignoring resize to invalid viewport");
            return None;
        }
        let target = device_size(
            viewport.width,
            viewport.height,
            viewport.device_pixel_ratio,
            self.max_dimension,
        );
        let current = self.canvas.size();
        let first = self.viewport.is_none();
        self.viewport = Some(viewport);

        let mut outcome = ResizeOutcome {
            size: target,
            changed: false,
            resampled: false,
        };
        if first || target != current {
            outcome.changed = true;
            outcome.resampled = self.reallocate(target, carry);
        }

        let scale = ScaleFactors::between(target, viewport)?;
        mapper.calibrate(scale, target);

        if outcome.changed {
            self.scaled = ScaledSettings::for_canvas_width(config, target.width);
            stamp.rescale(self.scaled.factor);
            info!(
                width = target.width,
                height = target.height,
                scale_x = scale.x,
                scale_y = scale.y,
                stamp_width = stamp.width,
                stamp_height = stamp.height,
                resampled = outcome.resampled,
                "canvas resized"
            );
        }
        Some(outcome)
    }

    fn reallocate<F>(&mut self, target: PixelSize, carry: F) -> bool
    where
        F: FnOnce(&RgbaImage, PixelSize) -> Result<RgbaImage, Error>,
    {
        if !self.canvas.has_content() {
            self.canvas.reset(target, self.background);
            return false;
        }
        match carry(self.canvas.image(), target) {
            Ok(image) => {
                self.canvas.replace_image(image);
                true
            }
            Err(err) => {
                warn!(error = %err, "could not carry canvas content over; starting empty");
                self.canvas.reset(target, self.background);
                false
            }
        }
    }

    pub fn clear(&mut self) {
        self.canvas.clear(self.background);
        debug!("canvas cleared");
    }

    /// Pick up new canvas and perturbation settings, re-fitting to the last
    /// viewport when the maximum dimension changed.
    pub fn apply_settings(
        &mut self,
        config: &Configuration,
        mapper: &mut SpaceMapper,
        stamp: &mut StampSettings,
    ) {
        self.background = Rgba(config.canvas.background);
        let max_changed = self.max_dimension != config.canvas.max_dimension;
        self.max_dimension = config.canvas.max_dimension;
        let previous = self.scaled.factor;
        self.scaled = ScaledSettings::for_canvas_width(config, self.canvas.size().width);
        if self.scaled.factor != previous {
            stamp.rescale(self.scaled.factor);
        }
        if max_changed {
            if let Some(viewport) = self.viewport {
                self.resize(viewport, config, mapper, stamp);
            }
        }
    }
}
