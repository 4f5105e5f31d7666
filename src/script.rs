//! Timed input scripts for driving a session without a touch screen.
//!
//! ```yaml
//! - at: 0ms
//!   kind: resize
//!   width: 390
//!   height: 844
//!   dpr: 3
//! - at: 50ms
//!   kind: down
//!   id: 1
//!   x: 120
//!   y: 400
//! - at: 600ms
//!   kind: up
//!   id: 1
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::events::{ContactEvent, ContactId, SessionCommand};
use crate::geometry::{Point, ViewportGeometry};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScriptEvent {
    /// Offset from the start of the replay.
    #[serde(with = "humantime_serde", default)]
    pub at: Duration,
    #[serde(flatten)]
    pub action: ScriptAction,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ScriptAction {
    Down { id: ContactId, x: f32, y: f32 },
    Move { id: ContactId, x: f32, y: f32 },
    Up { id: ContactId },
    Cancel,
    Resize {
        width: f32,
        height: f32,
        #[serde(default = "default_dpr")]
        dpr: f32,
    },
    Clear,
    NextSource,
}

fn default_dpr() -> f32 {
    1.0
}

impl ScriptAction {
    pub fn to_command(&self) -> SessionCommand {
        match *self {
            Self::Down { id, x, y } => SessionCommand::Contact(ContactEvent::Down {
                id,
                point: Point::new(x, y),
            }),
            Self::Move { id, x, y } => SessionCommand::Contact(ContactEvent::Move {
                id,
                point: Point::new(x, y),
            }),
            Self::Up { id } => SessionCommand::Contact(ContactEvent::Up { id }),
            Self::Cancel => SessionCommand::Contact(ContactEvent::Cancel),
            Self::Resize { width, height, dpr } => {
                SessionCommand::Resize(ViewportGeometry::new(width, height, dpr))
            }
            Self::Clear => SessionCommand::Clear,
            Self::NextSource => SessionCommand::NextSource,
        }
    }
}

/// Events ordered by their offset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    events: Vec<ScriptEvent>,
}

impl Script {
    pub fn new(mut events: Vec<ScriptEvent>) -> Self {
        events.sort_by_key(|e| e.at);
        Self { events }
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let events: Vec<ScriptEvent> = serde_yaml::from_str(s).context("malformed input script")?;
        for event in &events {
            if let ScriptAction::Resize { width, height, dpr } = event.action {
                ensure!(
                    width > 0.0 && height > 0.0 && dpr > 0.0,
                    "resize at {:?} needs positive width, height and dpr",
                    event.at
                );
            }
        }
        Ok(Self::new(events))
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml_str(&s).with_context(|| format!("in script {}", path.display()))
    }

    pub fn events(&self) -> &[ScriptEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Offset of the last event.
    pub fn duration(&self) -> Duration {
        self.events.last().map_or(Duration::ZERO, |e| e.at)
    }
}
