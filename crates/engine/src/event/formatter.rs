#![forbid(unsafe_code)]

use crate::domain::Measurement;
use crate::event::{Event, Severity};
use crate::reduce::ReducedResult;
use config::Thresholds;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

pub const DEFAULT_TITLE_RULE: &str = "[check] [target]";

/// Builds events for one check instance.
#[derive(Debug, Clone)]
pub struct EventFormatter {
    check: String,
    target: String,
    title_rule: String,
    extra_labels: BTreeMap<String, String>,
}

impl EventFormatter {
    pub fn new(
        check: impl Into<String>,
        target: impl Into<String>,
        title_rule: &str,
        extra_labels: BTreeMap<String, String>,
    ) -> Self {
        let title_rule = if title_rule.is_empty() {
            DEFAULT_TITLE_RULE.to_owned()
        } else {
            title_rule.to_owned()
        };
        Self {
            check: check.into(),
            target: target.into(),
            title_rule,
            extra_labels,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Event for the worst measurement of a cycle.
    pub fn measured(
        &self,
        worst: &Measurement,
        reduced: &ReducedResult,
        thresholds: &Thresholds,
        severity: Severity,
    ) -> Event {
        let usage = format!("{:.1}%", worst.usage_percent);
        let mut labels = self.base_labels();
        labels.insert("pid".into(), worst.pid.to_string());
        labels.insert("open_fds".into(), worst.open_fds.to_string());
        labels.insert("soft_limit".into(), worst.soft_limit.to_string());
        labels.insert("hard_limit".into(), render_limit(worst.hard_limit));
        labels.insert("usage".into(), usage.clone());
        labels.insert("matched".into(), reduced.matched.to_string());
        labels.insert("checked".into(), reduced.checked.to_string());
        if let Some(exec_name) = &worst.exec_name {
            labels.insert("exec".into(), exec_name.clone());
        }

        let process = match &worst.exec_name {
            Some(exec_name) => format!("process {} ({exec_name})", worst.pid),
            None => format!("process {}", worst.pid),
        };
        let details = format!(
            "{} of {} open files in use, {} of {} matched processes checked",
            worst.open_fds, worst.soft_limit, reduced.checked, reduced.matched
        );
        let description = match severity {
            Severity::Critical => format!(
                "{process} open files usage {usage} >= critical threshold {}%: {details}",
                thresholds.critical_ge
            ),
            Severity::Warning => format!(
                "{process} open files usage {usage} >= warning threshold {}%: {details}",
                thresholds.warn_ge
            ),
            Severity::Ok | Severity::Info => {
                format!("{process} open files usage {usage} is within thresholds: {details}")
            }
        };

        self.finish(labels, severity, description)
    }

    /// Critical event standing in for a cycle that could not be evaluated.
    pub fn failure(&self, description: impl Into<String>) -> Event {
        self.finish(self.base_labels(), Severity::Critical, description.into())
    }

    fn base_labels(&self) -> BTreeMap<String, String> {
        let mut labels = self.extra_labels.clone();
        labels.insert("check".into(), self.check.clone());
        labels.insert("target".into(), self.target.clone());
        labels
    }

    fn finish(
        &self,
        labels: BTreeMap<String, String>,
        severity: Severity,
        description: String,
    ) -> Event {
        Event {
            event_time: unix_now(),
            event_status: severity,
            labels,
            title_rule: self.title_rule.clone(),
            description,
        }
    }
}

fn render_limit(limit: u64) -> String {
    if limit == 0 {
        "unlimited".into()
    } else {
        limit.to_string()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}
