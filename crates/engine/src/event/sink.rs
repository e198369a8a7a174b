#![forbid(unsafe_code)]

use crate::event::{Event, Severity};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[async_trait]
pub trait EventSink: Send + Sync {
    /// Hand over one event. Delivery problems are the sink's own business.
    async fn push(&self, event: Event);
}

/// Forwards events into a tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn push(&self, event: Event) {
        if let Err(err) = self.tx.send(event) {
            warn!(event = ?err.0, "event receiver dropped, discarding event");
        }
    }
}

/// Logs events instead of delivering them.
#[derive(Debug, Default)]
pub struct TracingSink;

#[async_trait]
impl EventSink for TracingSink {
    async fn push(&self, event: Event) {
        let target = event.labels.get("target").map(String::as_str).unwrap_or("");
        match event.event_status {
            Severity::Ok | Severity::Info => {
                info!(status = ?event.event_status, check_target = target, labels = ?event.labels, "{}", event.description)
            }
            Severity::Warning | Severity::Critical => {
                warn!(status = ?event.event_status, check_target = target, labels = ?event.labels, "{}", event.description)
            }
        }
    }
}
