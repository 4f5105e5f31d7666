//! Size-dependent settings derived from the canvas width.
//!
//! Every base value in [`Configuration`] is expressed at the configured
//! reference width; the live values are `base * canvas_width / reference_width`
//! so stamps keep their visual proportions on any pixel density.

use image::Rgba;

use crate::config::Configuration;

/// Destination footprint of each stamp, in canvas-internal pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StampSettings {
    pub width: u32,
    pub height: u32,
    reference_width: f32,
    reference_height: f32,
}

impl StampSettings {
    /// Footprint given at the reference width, resolved for `factor`.
    pub fn from_reference(reference_width: f32, reference_height: f32, factor: f32) -> Self {
        let mut settings = Self {
            width: 1,
            height: 1,
            reference_width,
            reference_height,
        };
        settings.rescale(factor);
        settings
    }

    /// Re-derive the canvas footprint after the canvas width changed.
    pub fn rescale(&mut self, factor: f32) {
        self.width = (self.reference_width * factor).round().max(1.0) as u32;
        self.height = (self.reference_height * factor).round().max(1.0) as u32;
    }

    /// Store a footprint measured in canvas pixels at the current `factor`.
    pub fn commit(&mut self, width: u32, height: u32, factor: f32) {
        self.width = width.max(1);
        self.height = height.max(1);
        if factor > 0.0 {
            self.reference_width = self.width as f32 / factor;
            self.reference_height = self.height as f32 / factor;
        }
    }
}

/// Random perturbation bounds for one stamp, in canvas-internal pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerturbationRanges {
    /// Zero disables rotation.
    pub max_angle_degrees: f32,
    /// `None` disables the planar offset.
    pub offset: Option<(f32, f32)>,
    pub shadow_blur: f32,
    pub shadow_offset: f32,
    pub shadow_jitter: f32,
    pub shadow_color: Rgba<u8>,
}

impl PerturbationRanges {
    /// No rotation, no offset, no shadow.
    pub fn none() -> Self {
        Self {
            max_angle_degrees: 0.0,
            offset: None,
            shadow_blur: 0.0,
            shadow_offset: 0.0,
            shadow_jitter: 0.0,
            shadow_color: Rgba([0, 0, 0, 0]),
        }
    }
}

/// Everything that scales with the canvas width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledSettings {
    /// `canvas_width / reference_width`.
    pub factor: f32,
    pub perturbation: PerturbationRanges,
    /// Committed footprints are clamped to this range (canvas pixels).
    pub min_footprint: f32,
    pub max_footprint: f32,
}

impl ScaledSettings {
    pub fn for_canvas_width(config: &Configuration, canvas_width: u32) -> Self {
        let factor = reference_factor(canvas_width, config.canvas.reference_width);
        let p = &config.perturbation;
        let perturbation = PerturbationRanges {
            max_angle_degrees: if p.rotation { p.max_angle_degrees } else { 0.0 },
            offset: p
                .offset
                .then_some((p.min_offset * factor, p.max_offset * factor)),
            shadow_blur: p.shadow_blur * factor,
            shadow_offset: p.shadow_offset * factor,
            shadow_jitter: p.shadow_jitter * factor,
            shadow_color: Rgba(p.shadow_color),
        };
        Self {
            factor,
            perturbation,
            min_footprint: (config.stamp.min_size * factor).max(1.0),
            max_footprint: (config.stamp.max_size * factor).max(1.0),
        }
    }

    pub fn clamp_footprint(&self, value: f32) -> u32 {
        let hi = self.max_footprint.max(self.min_footprint);
        value.clamp(self.min_footprint, hi).round().max(1.0) as u32
    }
}

pub fn reference_factor(canvas_width: u32, reference_width: f32) -> f32 {
    if reference_width > 0.0 {
        canvas_width as f32 / reference_width
    } else {
        1.0
    }
}
