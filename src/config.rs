use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

/// How the frame source is laid out behind the drawing canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceFit {
    /// Source is stretched to the canvas, ignoring aspect ratio.
    #[default]
    Stretch,
    /// Source is uniformly scaled to cover the canvas and center-cropped.
    Cover,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct CanvasOptions {
    /// Largest allowed canvas side in device pixels.
    pub max_dimension: u32,
    /// Canvas width at which every base size below is specified.
    pub reference_width: f32,
    /// RGBA fill of an empty or cleared canvas.
    pub background: [u8; 4],
}

impl CanvasOptions {
    const fn default_max_dimension() -> u32 {
        2160
    }

    const fn default_reference_width() -> f32 {
        3840.0
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.max_dimension > 0, "canvas.max-dimension must be positive");
        ensure!(
            self.reference_width.is_finite() && self.reference_width > 0.0,
            "canvas.reference-width must be positive"
        );
        Ok(())
    }
}

impl Default for CanvasOptions {
    fn default() -> Self {
        Self {
            max_dimension: Self::default_max_dimension(),
            reference_width: Self::default_reference_width(),
            background: [0, 0, 0, 0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct StampOptions {
    /// Initial stamp width at the reference width.
    pub width: f32,
    /// Initial stamp height at the reference width.
    pub height: f32,
    /// Smallest footprint side a resize gesture may commit, at the reference width.
    pub min_size: f32,
    /// Largest footprint side a resize gesture may commit, at the reference width.
    pub max_size: f32,
}

impl Default for StampOptions {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 600.0,
            min_size: 60.0,
            max_size: 3840.0,
        }
    }
}

impl StampOptions {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.min_size.is_finite() && self.min_size > 0.0,
            "stamp.min-size must be positive"
        );
        ensure!(
            self.max_size.is_finite() && self.max_size >= self.min_size,
            "stamp.max-size must be >= stamp.min-size"
        );
        ensure!(
            self.width.is_finite() && self.height.is_finite(),
            "stamp size must be finite"
        );
        ensure!(
            (self.min_size..=self.max_size).contains(&self.width)
                && (self.min_size..=self.max_size).contains(&self.height),
            "stamp.width and stamp.height must lie within [min-size, max-size]"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct PerturbationOptions {
    /// Whether each stamp is tilted by a random angle.
    pub rotation: bool,
    /// Largest tilt either way, in degrees.
    pub max_angle_degrees: f32,
    /// Whether each stamp is shifted by a random planar offset.
    pub offset: bool,
    /// Offset bounds per axis at the reference width.
    pub min_offset: f32,
    pub max_offset: f32,
    /// Drop shadow blur radius at the reference width.
    pub shadow_blur: f32,
    /// Drop shadow offset (both axes) at the reference width.
    pub shadow_offset: f32,
    /// Random +/- delta applied to the shadow blur and offset.
    pub shadow_jitter: f32,
    /// Shadow RGBA color.
    pub shadow_color: [u8; 4],
}

impl Default for PerturbationOptions {
    fn default() -> Self {
        Self {
            rotation: true,
            max_angle_degrees: 3.0,
            offset: true,
            min_offset: -80.0,
            max_offset: 80.0,
            shadow_blur: 24.0,
            shadow_offset: 10.0,
            shadow_jitter: 4.0,
            shadow_color: [0, 0, 0, 110],
        }
    }
}

impl PerturbationOptions {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.max_angle_degrees.is_finite() && self.max_angle_degrees >= 0.0,
            "perturbation.max-angle-degrees must be >= 0"
        );
        ensure!(
            self.min_offset.is_finite() && self.max_offset.is_finite(),
            "perturbation offsets must be finite"
        );
        ensure!(
            self.min_offset <= self.max_offset,
            "perturbation.min-offset must be <= perturbation.max-offset"
        );
        ensure!(
            self.shadow_blur.is_finite() && self.shadow_blur >= 0.0,
            "perturbation.shadow-blur must be >= 0"
        );
        ensure!(
            self.shadow_offset.is_finite(),
            "perturbation.shadow-offset must be finite"
        );
        ensure!(
            self.shadow_jitter.is_finite() && self.shadow_jitter >= 0.0,
            "perturbation.shadow-jitter must be >= 0"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct CaptureOptions {
    /// Minimum time between two stamps, shared by moves and the hold timer.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Keep stamping while a single finger rests without moving.
    pub continuous: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(120),
            continuous: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct GestureOptions {
    /// Floor for the height of the two-finger rectangle, in viewport pixels.
    pub min_height: f32,
    /// Corner marker arm length, in viewport pixels.
    pub corner_length: f32,
    /// Corner marker thickness, in viewport pixels.
    pub corner_thickness: f32,
    /// Border line width, in viewport pixels.
    pub border_width: f32,
    pub border_color: [u8; 4],
    pub corner_color: [u8; 4],
}

impl Default for GestureOptions {
    fn default() -> Self {
        Self {
            min_height: 20.0,
            corner_length: 30.0,
            corner_thickness: 4.0,
            border_width: 2.0,
            border_color: [255, 255, 255, 200],
            corner_color: [255, 255, 255, 255],
        }
    }
}

impl GestureOptions {
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("gesture.min-height", self.min_height),
            ("gesture.corner-length", self.corner_length),
            ("gesture.corner-thickness", self.corner_thickness),
            ("gesture.border-width", self.border_width),
        ] {
            ensure!(value.is_finite() && value >= 0.0, "{name} must be >= 0");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Canvas sizing and reference scale.
    pub canvas: CanvasOptions,
    /// Layout of the frame source behind the canvas.
    pub source_fit: SourceFit,
    /// Stamp footprint defaults and bounds.
    pub stamp: StampOptions,
    /// Random per-stamp rotation/offset/shadow.
    pub perturbation: PerturbationOptions,
    /// Single-finger capture pacing.
    pub capture: CaptureOptions,
    /// Two-finger resize preview styling.
    pub gesture: GestureOptions,
    /// Lift applied to contact points so the sample sits above the finger, in viewport pixels.
    pub vertical_bias: f32,
    /// Period of the frame callback that flushes scheduled drawing.
    #[serde(with = "humantime_serde")]
    pub frame_interval: Duration,
    /// Optional deterministic seed for stamp perturbation.
    pub seed: Option<u64>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            canvas: CanvasOptions::default(),
            source_fit: SourceFit::default(),
            stamp: StampOptions::default(),
            perturbation: PerturbationOptions::default(),
            capture: CaptureOptions::default(),
            gesture: GestureOptions::default(),
            vertical_bias: 30.0,
            frame_interval: Duration::from_millis(16),
            seed: None,
        }
    }
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        self.canvas.validate().context("invalid canvas configuration")?;
        self.stamp.validate().context("invalid stamp configuration")?;
        self.perturbation
            .validate()
            .context("invalid perturbation configuration")?;
        self.gesture
            .validate()
            .context("invalid gesture configuration")?;
        ensure!(
            self.capture.interval > Duration::ZERO,
            "capture.interval must be greater than zero"
        );
        ensure!(
            self.frame_interval > Duration::ZERO,
            "frame-interval must be greater than zero"
        );
        ensure!(
            self.vertical_bias.is_finite() && self.vertical_bias >= 0.0,
            "vertical-bias must be >= 0"
        );
        Ok(self)
    }
}
