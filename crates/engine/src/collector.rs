#![forbid(unsafe_code)]

use crate::domain::ProbeOutcome;
use crate::probe::{LimitProbe, ProbeError};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::{debug, trace};

/// Probe every PID with at most `concurrency` probes in flight and return
/// one outcome per PID, in input order.
///
/// Each probe runs on the blocking pool. A probe that panics is reported as
/// [`ProbeOutcome::Failed`] for its own PID only.
pub async fn collect(
    probe: Arc<dyn LimitProbe>,
    pids: &[i32],
    concurrency: usize,
) -> Vec<ProbeOutcome> {
    let concurrency = concurrency.max(1);
    let mut slots: Vec<Option<ProbeOutcome>> = vec![None; pids.len()];

    let mut stream = stream::iter(pids.iter().copied().enumerate())
        .map(|(index, pid)| {
            let probe = Arc::clone(&probe);
            async move {
                let join = tokio::task::spawn_blocking(move || probe.probe(pid)).await;
                let outcome = match join {
                    Ok(outcome) => outcome,
                    Err(err) => ProbeError::Task {
                        pid,
                        reason: describe(err),
                    }
                    .into(),
                };
                (index, outcome)
            }
        })
        .buffer_unordered(concurrency);

    while let Some((index, outcome)) = stream.next().await {
        trace!(pid = outcome.pid(), ?outcome, "probe finished");
        slots[index] = Some(outcome);
    }

    debug!(probed = pids.len(), concurrency, "collection finished");
    slots
        .into_iter()
        .zip(pids)
        .map(|(slot, &pid)| {
            slot.unwrap_or_else(|| ProbeOutcome::Failed {
                pid,
                cause: "probe produced no outcome".into(),
            })
        })
        .collect()
}

fn describe(err: JoinError) -> String {
    if err.is_cancelled() {
        return "was cancelled".into();
    }
    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned());
    match message {
        Some(message) => format!("panicked: {message}"),
        None => "panicked".into(),
    }
}
