#![forbid(unsafe_code)]

mod formatter;
mod sink;

pub use formatter::{DEFAULT_TITLE_RULE, EventFormatter};
pub use sink::{ChannelSink, EventSink, TracingSink};

use serde::Serialize;
use std::collections::BTreeMap;

/// Alert level shared with the rest of the alerting pipeline. `Info` exists
/// in the vocabulary but is never produced by this check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Ok,
    Info,
    Warning,
    Critical,
}

/// One alert record handed to an [`EventSink`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// Unix time in seconds.
    pub event_time: u64,
    pub event_status: Severity,
    pub labels: BTreeMap<String, String>,
    pub title_rule: String,
    pub description: String,
}
