use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    /// SIGHUP: reload the configuration and rebuild the checks.
    Reload,
    /// SIGINT or SIGTERM.
    Shutdown,
}

/// Translate process signals into [`SignalEvent`]s until the receiver goes
/// away.
pub async fn wait_for_signal(tx: UnboundedSender<SignalEvent>) -> std::io::Result<()> {
    let mut hangup = signal(SignalKind::hangup())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    loop {
        let event = tokio::select! {
            _ = hangup.recv() => SignalEvent::Reload,
            _ = interrupt.recv() => SignalEvent::Shutdown,
            _ = terminate.recv() => SignalEvent::Shutdown,
        };
        if tx.send(event).is_err() {
            return Ok(());
        }
    }
}
