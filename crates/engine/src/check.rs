#![forbid(unsafe_code)]

use crate::collector::collect;
use crate::discovery::{ProcessTable, discover};
use crate::domain::SelectionCriterion;
use crate::error::Error;
use crate::event::{EventFormatter, EventSink, Severity};
use crate::probe::LimitProbe;
use crate::reduce::{Verdict, reduce};
use crate::threshold::evaluate_ge_threshold;
use config::{Instance, Thresholds};
use std::sync::Arc;
use tokio::task;
use tracing::{debug, warn};

pub const CHECK_ID: &str = "procfd::open_files";

/// Summary of one probe cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub matched: usize,
    pub checked: usize,
    pub errors: usize,
    /// Severity of the event pushed to the sink, if any.
    pub emitted: Option<Severity>,
}

/// Open-files check for one configured instance.
pub struct NofileCheck {
    criterion: SelectionCriterion,
    thresholds: Thresholds,
    concurrency: usize,
    formatter: EventFormatter,
    table: Arc<dyn ProcessTable>,
    probe: Arc<dyn LimitProbe>,
}

impl NofileCheck {
    pub fn new(
        instance: &Instance,
        table: Arc<dyn ProcessTable>,
        probe: Arc<dyn LimitProbe>,
    ) -> Result<Self, Error> {
        let criterion = SelectionCriterion::from_instance(instance)?;
        let formatter = EventFormatter::new(
            CHECK_ID,
            criterion.target_label(),
            &instance.title_rule,
            instance.labels.clone(),
        );
        Ok(Self {
            criterion,
            thresholds: instance.open_files,
            concurrency: instance.concurrency,
            formatter,
            table,
            probe,
        })
    }

    pub fn target(&self) -> &str {
        self.formatter.target()
    }

    /// Run one discovery, probe, reduce and evaluate pass, pushing at most one
    /// event.
    pub async fn gather(&self, sink: &dyn EventSink) -> CycleReport {
        let target = self.formatter.target();

        let table = Arc::clone(&self.table);
        let criterion = self.criterion.clone();
        let discovered = task::spawn_blocking(move || discover(table.as_ref(), &criterion))
            .await
            .unwrap_or_else(|err| {
                Err(Error::Enumeration {
                    reason: format!("discovery task failed: {err}"),
                })
            });

        let pids = match discovered {
            Ok(pids) => pids,
            Err(err) => {
                warn!(check_target = target, %err, "process discovery failed");
                sink.push(self.formatter.failure(format!("failed to discover processes: {err}")))
                    .await;
                return CycleReport {
                    emitted: Some(Severity::Critical),
                    ..Default::default()
                };
            }
        };

        if pids.is_empty() {
            debug!(check_target = target, "no process matched");
        }

        let outcomes = collect(Arc::clone(&self.probe), &pids, self.concurrency).await;
        let reduced = reduce(outcomes);
        debug!(
            check_target = target,
            matched = reduced.matched,
            checked = reduced.checked,
            errors = reduced.errors,
            "probe cycle reduced"
        );

        let mut report = CycleReport {
            matched: reduced.matched,
            checked: reduced.checked,
            errors: reduced.errors,
            emitted: None,
        };

        let event = match reduced.verdict() {
            Verdict::Suppress => return report,
            Verdict::AllErrored => self.formatter.failure(format!(
                "all {} matched processes errored, first error: {}",
                reduced.errors,
                reduced.first_error.as_deref().unwrap_or("unknown")
            )),
            Verdict::Evaluate(worst) => {
                let severity = evaluate_ge_threshold(
                    worst.usage_percent,
                    self.thresholds.warn_ge,
                    self.thresholds.critical_ge,
                );
                self.formatter
                    .measured(worst, &reduced, &self.thresholds, severity)
            }
        };

        report.emitted = Some(event.event_status);
        sink.push(event).await;
        report
    }
}
