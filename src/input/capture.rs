use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::CaptureOptions;
use crate::geometry::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    /// One contact down, no repeating timer.
    SingleActive,
    /// One contact down with the hold timer armed.
    Holding,
}

/// Ask the session to stamp at a viewport-space contact point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureRequest {
    pub viewport: Point,
}

/// Single-finger capture: throttled stamps on down/move plus continuous
/// stamping while a finger rests.
///
/// Moves and hold-timer ticks share one "last capture" clock, so the stamp
/// rate never exceeds one per `interval` whatever drives it.
#[derive(Debug)]
pub struct CaptureController {
    state: CaptureState,
    interval: Duration,
    continuous: bool,
    position: Option<Point>,
    last_capture: Option<Instant>,
}

impl CaptureController {
    pub fn new(options: &CaptureOptions) -> Self {
        Self {
            state: CaptureState::Idle,
            interval: options.interval,
            continuous: options.continuous,
            position: None,
            last_capture: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != CaptureState::Idle
    }

    pub fn hold_timer_armed(&self) -> bool {
        self.state == CaptureState::Holding
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Last known contact point, in viewport space.
    pub fn position(&self) -> Option<Point> {
        self.position
    }

    /// Takes effect from the next down/move/tick.
    pub fn set_options(&mut self, options: &CaptureOptions) {
        self.interval = options.interval;
        self.continuous = options.continuous;
        match (self.state, self.continuous) {
            (CaptureState::Holding, false) => self.state = CaptureState::SingleActive,
            (CaptureState::SingleActive, true) => self.state = CaptureState::Holding,
            _ => {}
        }
    }

    /// First contact of a single-finger interaction. The caller has already
    /// checked that exactly one contact is down and no resize is running.
    pub fn on_down(
        &mut self,
        point: Point,
        source_ready: bool,
        now: Instant,
    ) -> Option<CaptureRequest> {
        if self.state != CaptureState::Idle {
            return self.on_move(point, now);
        }
        if !source_ready {
            debug!("source not ready; ignoring contact");
            return None;
        }
        self.position = Some(point);
        self.state = if self.continuous {
            CaptureState::Holding
        } else {
            CaptureState::SingleActive
        };
        debug!(state = ?self.state, "capture started");
        self.try_capture(now)
    }

    pub fn on_move(&mut self, point: Point, now: Instant) -> Option<CaptureRequest> {
        if self.state == CaptureState::Idle {
            return None;
        }
        self.position = Some(point);
        self.try_capture(now)
    }

    /// Hold-timer tick.
    pub fn on_tick(&mut self, now: Instant) -> Option<CaptureRequest> {
        if self.state != CaptureState::Holding {
            return None;
        }
        self.try_capture(now)
    }

    /// Last contact lifted.
    pub fn on_up(&mut self) -> bool {
        self.stop("released")
    }

    /// Contact cancelled or handed over to the resize gesture.
    pub fn cancel(&mut self) -> bool {
        self.stop("cancelled")
    }

    fn stop(&mut self, reason: &'static str) -> bool {
        if self.state == CaptureState::Idle {
            return false;
        }
        debug!(reason, "capture stopped");
        self.state = CaptureState::Idle;
        self.position = None;
        true
    }

    fn try_capture(&mut self, now: Instant) -> Option<CaptureRequest> {
        let due = self
            .last_capture
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval);
        if !due {
            return None;
        }
        let viewport = self.position?;
        self.last_capture = Some(now);
        Some(CaptureRequest { viewport })
    }
}
