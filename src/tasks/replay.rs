use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::Sender;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::events::SessionCommand;
use crate::script::Script;

/// Feed `script` to the session at its recorded offsets.
///
/// Returns how many events were delivered. Dropping `to_session` on return
/// closes the session's command channel.
pub async fn run(
    script: Script,
    to_session: Sender<SessionCommand>,
    cancel: CancellationToken,
) -> Result<usize> {
    let start = Instant::now();
    let mut sent = 0;
    for event in script.events() {
        select! {
            _ = cancel.cancelled() => {
                debug!(sent, "replay cancelled");
                return Ok(sent);
            }
            _ = sleep_until(start + event.at) => {}
        }
        if to_session.send(event.action.to_command()).await.is_err() {
            warn!(sent, "session channel closed; stopping replay");
            return Ok(sent);
        }
        sent += 1;
    }
    info!(
        events = sent,
        duration = %humantime::format_duration(script.duration()),
        "replay finished"
    );
    Ok(sent)
}
