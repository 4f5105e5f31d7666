use std::sync::Arc;

use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{debug, warn};

use crate::feedback::Feedback;
use crate::geometry::{Point, Rect};
use crate::processing::sampler::SampledRegion;
use crate::processing::surface::{Shadow, Surface};
use crate::settings::{PerturbationRanges, StampSettings};

/// Random variation applied to a single stamp; drawn once and discarded.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Perturbation {
    pub offset_x: f32,
    pub offset_y: f32,
    pub rotation_radians: f32,
    pub shadow_blur: f32,
    pub shadow_offset_x: f32,
    pub shadow_offset_y: f32,
}

impl Perturbation {
    pub fn draw<R: Rng + ?Sized>(ranges: &PerturbationRanges, rng: &mut R) -> Self {
        let (offset_x, offset_y) = match ranges.offset {
            Some((lo, hi)) => (uniform(rng, lo, hi), uniform(rng, lo, hi)),
            None => (0.0, 0.0),
        };
        let max_angle = ranges.max_angle_degrees.abs();
        let rotation_radians = uniform(rng, -max_angle, max_angle).to_radians();
        let jitter = ranges.shadow_jitter.abs();
        Self {
            offset_x,
            offset_y,
            rotation_radians,
            shadow_blur: (ranges.shadow_blur + uniform(rng, -jitter, jitter)).max(0.0),
            shadow_offset_x: ranges.shadow_offset + uniform(rng, -jitter, jitter),
            shadow_offset_y: ranges.shadow_offset + uniform(rng, -jitter, jitter),
        }
    }
}

fn uniform<R: Rng + ?Sized>(rng: &mut R, lo: f32, hi: f32) -> f32 {
    if hi > lo {
        rng.random_range(lo..=hi)
    } else {
        lo
    }
}

/// Where a stamp lands on the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StampPlacement {
    /// Destination rectangle before rotation, in canvas pixels.
    pub dest: Rect,
    /// Rotation pivot: the center of `dest`.
    pub pivot: Point,
    pub rotation_radians: f32,
}

impl StampPlacement {
    pub fn plan(center: Point, footprint: &StampSettings, perturbation: &Perturbation) -> Self {
        let pivot = Point::new(
            center.x + perturbation.offset_x,
            center.y + perturbation.offset_y,
        );
        Self {
            dest: Rect::from_center(pivot, footprint.width as f32, footprint.height as f32),
            pivot,
            rotation_radians: perturbation.rotation_radians,
        }
    }
}

/// Draws sampled regions onto the persistent canvas with random perturbation.
pub struct StampCompositor {
    rng: StdRng,
    feedback: Arc<dyn Feedback>,
    drawn: u64,
}

impl StampCompositor {
    pub fn new(seed: Option<u64>, feedback: Arc<dyn Feedback>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng,
            feedback,
            drawn: 0,
        }
    }

    /// Stamps successfully composited so far.
    pub fn drawn(&self) -> u64 {
        self.drawn
    }

    pub fn feedback(&self) -> &Arc<dyn Feedback> {
        &self.feedback
    }

    /// Composite `sample` centered on `center` at `footprint` size.
    ///
    /// Never fails: a draw error is logged and the canvas keeps its previous
    /// pixels and drawing state.
    pub fn stamp(
        &mut self,
        surface: &mut Surface,
        sample: &SampledRegion<'_>,
        center: Point,
        footprint: &StampSettings,
        ranges: &PerturbationRanges,
    ) {
        let perturbation = Perturbation::draw(ranges, &mut self.rng);
        let placement = StampPlacement::plan(center, footprint, &perturbation);

        self.feedback.cue();

        let mut ctx = surface.save();
        if placement.rotation_radians != 0.0 {
            ctx.translate(placement.pivot.x, placement.pivot.y);
            ctx.rotate(placement.rotation_radians);
            ctx.translate(-placement.pivot.x, -placement.pivot.y);
        }
        ctx.set_shadow(Shadow {
            color: ranges.shadow_color,
            blur: perturbation.shadow_blur,
            offset_x: perturbation.shadow_offset_x,
            offset_y: perturbation.shadow_offset_y,
        });
        match ctx.draw_image(sample.image(), sample.region(), placement.dest) {
            Ok(()) => {
                self.drawn += 1;
                debug!(
                    x = placement.dest.x,
                    y = placement.dest.y,
                    width = placement.dest.width,
                    height = placement.dest.height,
                    angle = placement.rotation_radians.to_degrees(),
                    "stamp composited"
                );
            }
            Err(err) => warn!(error = %err, "stamp draw failed; skipping"),
        }
    }
}
