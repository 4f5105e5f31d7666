//! One collage session: the canvas, the input controllers and the source.
//!
//! All state lives here and is driven from a single task, so nothing needs
//! locking. Stamps and preview redraws requested by input are queued and
//! flushed on the next frame callback.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::RgbaImage;
use tracing::{debug, info, warn};

use crate::config::Configuration;
use crate::error::Error;
use crate::events::{ContactEvent, SessionCommand};
use crate::export;
use crate::feedback::Feedback;
use crate::geometry::{Point, Rect, ViewportGeometry};
use crate::input::capture::{CaptureController, CaptureRequest, CaptureState};
use crate::input::gesture::ResizeGestureController;
use crate::input::router::{InputRouter, RouteAction};
use crate::lifecycle::{CanvasLifecycleManager, ResizeOutcome};
use crate::mapper::SpaceMapper;
use crate::processing::compositor::StampCompositor;
use crate::processing::sampler::RegionSampler;
use crate::processing::surface::Surface;
use crate::settings::StampSettings;
use crate::source::FrameSource;

pub struct CollageSession {
    config: Configuration,
    source: Box<dyn FrameSource>,
    mapper: SpaceMapper,
    lifecycle: CanvasLifecycleManager,
    sampler: RegionSampler,
    compositor: StampCompositor,
    capture: CaptureController,
    gesture: ResizeGestureController,
    router: InputRouter,
    stamp: StampSettings,
    pending: VecDeque<CaptureRequest>,
    preview_dirty: bool,
}

impl CollageSession {
    pub fn new(
        config: Configuration,
        source: Box<dyn FrameSource>,
        feedback: Arc<dyn Feedback>,
    ) -> Self {
        let lifecycle = CanvasLifecycleManager::new(&config);
        let stamp = StampSettings::from_reference(
            config.stamp.width,
            config.stamp.height,
            lifecycle.scaled().factor,
        );
        Self {
            mapper: SpaceMapper::new(config.vertical_bias, config.source_fit),
            sampler: RegionSampler::new(),
            compositor: StampCompositor::new(config.seed, feedback),
            capture: CaptureController::new(&config.capture),
            gesture: ResizeGestureController::new(
                config.gesture.clone(),
                config.vertical_bias,
                config.canvas.max_dimension,
            ),
            router: InputRouter::new(),
            pending: VecDeque::new(),
            preview_dirty: false,
            source,
            lifecycle,
            stamp,
            config,
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn canvas(&self) -> &Surface {
        self.lifecycle.canvas()
    }

    /// The resize preview while a gesture is running.
    pub fn preview(&self) -> Option<&Surface> {
        self.gesture.is_active().then(|| self.gesture.preview())
    }

    pub fn stamp_settings(&self) -> StampSettings {
        self.stamp
    }

    pub fn capture_state(&self) -> CaptureState {
        self.capture.state()
    }

    pub fn gesture_active(&self) -> bool {
        self.gesture.is_active()
    }

    pub fn hold_timer_armed(&self) -> bool {
        self.capture.hold_timer_armed()
    }

    pub fn capture_interval(&self) -> Duration {
        self.capture.interval()
    }

    pub fn frame_interval(&self) -> Duration {
        self.config.frame_interval
    }

    pub fn stamps_drawn(&self) -> u64 {
        self.compositor.drawn()
    }

    pub fn pending_stamps(&self) -> usize {
        self.pending.len()
    }

    pub fn mapper(&self) -> &SpaceMapper {
        &self.mapper
    }

    pub fn handle(&mut self, command: SessionCommand, now: Instant) {
        match command {
            SessionCommand::Contact(event) => self.handle_contact(event, now),
            SessionCommand::Resize(viewport) => {
                self.resize(viewport);
            }
            SessionCommand::Clear => self.clear(),
            SessionCommand::NextSource => {
                self.next_source();
            }
            SessionCommand::ApplySettings(config) => match (*config).validated() {
                Ok(config) => self.apply_settings(config),
                Err(err) => warn!("rejected settings: {err:#}"),
            },
        }
    }

    pub fn handle_contact(&mut self, event: ContactEvent, now: Instant) {
        match self.router.route(event) {
            RouteAction::CaptureDown(point) => {
                let ready = self.source.is_ready();
                let request = self.capture.on_down(point, ready, now);
                self.schedule(request);
            }
            RouteAction::CaptureMove(point) => {
                let request = self.capture.on_move(point, now);
                self.schedule(request);
            }
            RouteAction::CaptureUp => {
                self.capture.on_up();
            }
            RouteAction::GestureBegin(p1, p2) => {
                self.capture.cancel();
                self.begin_gesture(p1, p2);
            }
            RouteAction::GestureUpdate(p1, p2) => {
                if let Some(scale) = self.mapper.scale() {
                    self.gesture.update(p1, p2, scale);
                    self.preview_dirty = true;
                }
            }
            RouteAction::GestureEnd => self.commit_gesture(),
            RouteAction::CancelAll => {
                self.capture.cancel();
                self.gesture.cancel();
                self.preview_dirty = false;
                debug!("contacts cancelled");
            }
            RouteAction::Ignore => {}
        }
    }

    fn begin_gesture(&mut self, p1: Point, p2: Point) {
        let (Some(viewport), Some(scale)) = (self.lifecycle.viewport(), self.mapper.scale()) else {
            debug!("resize gesture before first canvas size; ignoring");
            return;
        };
        if self.gesture.begin(p1, p2, viewport, scale) {
            self.preview_dirty = true;
        }
    }

    fn commit_gesture(&mut self) {
        self.preview_dirty = false;
        let Some(commit) = self.gesture.end() else {
            return;
        };
        let scaled = self.lifecycle.scaled();
        let width = scaled.clamp_footprint(commit.width);
        let height = scaled.clamp_footprint(commit.height);
        self.stamp.commit(width, height, scaled.factor);
        info!(width, height, "stamp size committed");
    }

    fn schedule(&mut self, request: Option<CaptureRequest>) {
        if let Some(request) = request {
            self.pending.push_back(request);
        }
    }

    /// Hold-timer tick.
    pub fn tick(&mut self, now: Instant) {
        let request = self.capture.on_tick(now);
        self.schedule(request);
    }

    /// Frame callback: composite queued stamps and redraw the preview.
    pub fn on_frame(&mut self) {
        while let Some(request) = self.pending.pop_front() {
            self.stamp_at(request.viewport);
        }
        if self.preview_dirty {
            self.preview_dirty = false;
            self.gesture
                .render_preview(self.source.as_ref(), self.config.source_fit);
        }
    }

    fn stamp_at(&mut self, viewport: Point) {
        let size = self.source.size();
        let Some(mapped) = self.mapper.to_canvas_and_source(viewport.x, viewport.y, size) else {
            debug!("stamp requested before first canvas size; skipping");
            return;
        };
        let Some(size) = size else {
            debug!("source not ready; skipping stamp");
            return;
        };
        let footprint = Rect::from_center(
            mapped.canvas,
            self.stamp.width as f32,
            self.stamp.height as f32,
        );
        let Some(requested) = self.mapper.canvas_rect_to_source(footprint, size) else {
            return;
        };
        let ranges = self.lifecycle.scaled().perturbation;
        let sample = match self.sampler.sample(self.source.as_ref(), requested) {
            Ok(sample) => sample,
            Err(err) => {
                warn!(error = %err, "sampling failed; skipping stamp");
                return;
            }
        };
        self.compositor.stamp(
            self.lifecycle.canvas_mut(),
            &sample,
            mapped.canvas,
            &self.stamp,
            &ranges,
        );
    }

    pub fn resize(&mut self, viewport: ViewportGeometry) -> Option<ResizeOutcome> {
        self.lifecycle
            .resize(viewport, &self.config, &mut self.mapper, &mut self.stamp)
    }

    /// Erase the collage. Stamp size and scale factors are kept.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.lifecycle.clear();
        self.compositor.feedback().cue();
        info!("collage cleared");
    }

    pub fn next_source(&mut self) -> bool {
        let changed = self.source.advance();
        if changed {
            info!(size = ?self.source.size(), "switched to next source frame");
        } else {
            debug!("source has no next frame");
        }
        changed
    }

    /// Replace the runtime settings. Applies from the next stamp on and never
    /// touches what is already drawn. The stamp footprint only follows a
    /// changed reference width.
    pub fn apply_settings(&mut self, config: Configuration) {
        self.mapper.set_vertical_bias(config.vertical_bias);
        self.mapper.set_fit(config.source_fit);
        self.capture.set_options(&config.capture);
        self.gesture.set_options(
            config.gesture.clone(),
            config.vertical_bias,
            config.canvas.max_dimension,
        );
        self.lifecycle
            .apply_settings(&config, &mut self.mapper, &mut self.stamp);
        self.config = config;
        debug!("settings applied");
    }

    pub fn export_png(&self) -> Result<Vec<u8>, Error> {
        export::encode_png(self.canvas().image())
    }

    pub fn into_canvas(self) -> RgbaImage {
        self.lifecycle.into_canvas()
    }
}
