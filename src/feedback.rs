//! Fire-and-forget feedback cue (e.g. a shutter sound) played per stamp and per erase.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc::{Sender, error::TrySendError};
use tracing::debug;

/// A cue sink. Implementations must return immediately and swallow their own
/// failures; the caller never waits on or hears about a cue.
pub trait Feedback: Send + Sync {
    fn cue(&self);
}

/// Discards every cue.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFeedback;

impl Feedback for NullFeedback {
    fn cue(&self) {}
}

/// Unit message sent once per cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cue;

/// Forwards cues to an async consumer without ever blocking.
#[derive(Debug, Clone)]
pub struct ChannelFeedback {
    tx: Sender<Cue>,
}

impl ChannelFeedback {
    pub fn new(tx: Sender<Cue>) -> Self {
        Self { tx }
    }
}

impl Feedback for ChannelFeedback {
    fn cue(&self) {
        match self.tx.try_send(Cue) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => debug!("feedback consumer busy; dropping cue"),
            Err(TrySendError::Closed(_)) => debug!("feedback consumer gone; dropping cue"),
        }
    }
}

/// Counts cues; handy for tests and for a summary at exit.
#[derive(Debug, Default)]
pub struct CountingFeedback {
    count: AtomicUsize,
}

impl CountingFeedback {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

impl Feedback for CountingFeedback {
    fn cue(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn channel_feedback_never_blocks_when_full_or_closed() {
        let (tx, mut rx) = mpsc::channel(1);
        let feedback = ChannelFeedback::new(tx);
        feedback.cue();
        feedback.cue();
        assert_eq!(rx.try_recv(), Ok(Cue));
        assert!(rx.try_recv().is_err());

        drop(rx);
        feedback.cue();
    }

    #[test]
    fn counting_feedback_counts() {
        let feedback = CountingFeedback::default();
        feedback.cue();
        feedback.cue();
        assert_eq!(feedback.count(), 2);
    }
}
