use crate::config::Configuration;
use crate::geometry::{Point, ViewportGeometry};

/// Identifier of a single contact point (finger or pointer) for its lifetime.
pub type ContactId = u32;

/// Raw pointer/touch input, in viewport space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContactEvent {
    Down { id: ContactId, point: Point },
    Move { id: ContactId, point: Point },
    Up { id: ContactId },
    /// Every contact was interrupted at once (touch-cancel).
    Cancel,
}

/// Everything the session task reacts to besides its own timers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Contact(ContactEvent),
    Resize(ViewportGeometry),
    /// Shake-to-clear or explicit erase.
    Clear,
    /// Switch to the next still image when the source is an album.
    NextSource,
    /// Replace the runtime settings; validated before use.
    ApplySettings(Box<Configuration>),
}
