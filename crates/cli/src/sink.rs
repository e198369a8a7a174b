use async_trait::async_trait;
use engine::{Event, EventSink};
use std::io::Write;
use tracing::{error, warn};

/// Writes every event as one JSON line to stdout.
#[derive(Debug, Default)]
pub struct StdoutSink;

#[async_trait]
impl EventSink for StdoutSink {
    async fn push(&self, event: Event) {
        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(err) => {
                error!(%err, ?event, "failed to encode event");
                return;
            }
        };
        let mut stdout = std::io::stdout().lock();
        if let Err(err) = writeln!(stdout, "{line}").and_then(|()| stdout.flush()) {
            warn!(%err, "failed to write event");
        }
    }
}
