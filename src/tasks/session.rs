use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::Receiver;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::events::SessionCommand;
use crate::session::CollageSession;

/// Drives a session from its command channel, the hold timer and the frame
/// clock. Returns the session once the channel closes or `cancel` fires,
/// after flushing any queued stamps.
pub async fn run(
    mut session: CollageSession,
    mut commands: Receiver<SessionCommand>,
    cancel: CancellationToken,
) -> Result<CollageSession> {
    let mut frame = ticker(session.frame_interval());
    let mut hold_period = session.capture_interval();
    let mut hold = ticker(hold_period);

    loop {
        select! {
            _ = cancel.cancelled() => {
                debug!("session cancelled");
                break;
            }

            maybe_cmd = commands.recv() => {
                let Some(cmd) = maybe_cmd else {
                    debug!("command channel closed");
                    break;
                };
                let was_armed = session.hold_timer_armed();
                session.handle(cmd, Instant::now().into_std());
                let period = session.capture_interval();
                if session.hold_timer_armed() && (!was_armed || period != hold_period) {
                    // First tick one full interval after arming or retiming.
                    hold = ticker(period);
                }
                hold_period = period;
            }

            _ = hold.tick(), if session.hold_timer_armed() => {
                session.tick(Instant::now().into_std());
            }

            _ = frame.tick() => {
                session.on_frame();
            }
        }
    }

    session.on_frame();
    info!(stamps = session.stamps_drawn(), "session finished");
    Ok(session)
}

fn ticker(period: std::time::Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;
    use crate::events::ContactEvent;
    use crate::feedback::NullFeedback;
    use crate::geometry::{Point, ViewportGeometry};
    use crate::source::MemorySource;
    use image::{Rgba, RgbaImage};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn session() -> CollageSession {
        let mut config = Configuration::default();
        config.seed = Some(1);
        let source = MemorySource::new(RgbaImage::from_pixel(200, 200, Rgba([1, 2, 3, 255])));
        CollageSession::new(config, Box::new(source), Arc::new(NullFeedback))
    }

    #[tokio::test(start_paused = true)]
    async fn hold_timer_keeps_stamping_until_release() {
        let (tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(session(), rx, cancel.clone()));

        tx.send(SessionCommand::Resize(ViewportGeometry::new(200.0, 200.0, 1.0)))
            .await
            .unwrap();
        tx.send(SessionCommand::Contact(ContactEvent::Down {
            id: 1,
            point: Point::new(100.0, 130.0),
        }))
        .await
        .unwrap();
        // Held still for ~500ms at a 120ms interval: the initial stamp plus four ticks.
        tokio::time::sleep(Duration::from_millis(500)).await;
        tx.send(SessionCommand::Contact(ContactEvent::Up { id: 1 }))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        drop(tx);

        let session = task.await.unwrap().unwrap();
        assert_eq!(session.stamps_drawn(), 5);
        assert!(!session.hold_timer_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn new_capture_interval_retimes_a_running_hold() {
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(run(session(), rx, CancellationToken::new()));

        tx.send(SessionCommand::Resize(ViewportGeometry::new(200.0, 200.0, 1.0)))
            .await
            .unwrap();
        tx.send(SessionCommand::Contact(ContactEvent::Down {
            id: 1,
            point: Point::new(100.0, 130.0),
        }))
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut slower = Configuration::default();
        slower.seed = Some(1);
        slower.capture.interval = Duration::from_millis(300);
        tx.send(SessionCommand::ApplySettings(Box::new(slower)))
            .await
            .unwrap();
        // Ticks now land at 350ms and 650ms; the old 120ms clock would only
        // have cleared the throttle once, at 360ms.
        tokio::time::sleep(Duration::from_millis(650)).await;
        tx.send(SessionCommand::Contact(ContactEvent::Up { id: 1 }))
            .await
            .unwrap();
        drop(tx);

        let session = task.await.unwrap().unwrap();
        assert_eq!(session.capture_interval(), Duration::from_millis(300));
        assert_eq!(session.stamps_drawn(), 3);
    }

    #[tokio::test]
    async fn invalid_settings_are_rejected() {
        let (tx, rx) = mpsc::channel(2);
        let task = tokio::spawn(run(session(), rx, CancellationToken::new()));
        let mut broken = Configuration::default();
        broken.capture.interval = Duration::ZERO;
        tx.send(SessionCommand::ApplySettings(Box::new(broken)))
            .await
            .unwrap();
        drop(tx);
        let session = task.await.unwrap().unwrap();
        assert_eq!(session.capture_interval(), Duration::from_millis(120));
    }

    #[tokio::test]
    async fn cancellation_returns_the_session() {
        let (_tx, rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let session = run(session(), rx, cancel).await.unwrap();
        assert_eq!(session.stamps_drawn(), 0);
    }
}
